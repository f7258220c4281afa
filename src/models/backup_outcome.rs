use std::path::PathBuf;

/// What caused a backup attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Save,
    Open,
}

impl Trigger {
    pub fn is_open(&self) -> bool {
        matches!(self, Trigger::Open)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    Saved(PathBuf),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Not a regular file on disk (unsaved buffer, deleted, directory)
    Missing,
    ReadOnly,
    /// No size limit configured
    SizeUnknown,
    TooLarge(u64),
    /// The file lives inside the backup root
    IsBackup,
    NoTarget,
    /// The derived target is outside the backup root or is the file itself
    UnsafeTarget,
    /// Identical to the last backup taken this session
    Unchanged,
    /// Open trigger and the target is already there
    Exists,
}
