/// Defines the dry-run behavior mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DryRunMode {
    /// Normal operation - actually copy backups and delete expired folders
    None,

    /// Preview - compute targets and expired folders but never touch the disk
    Preview,
}

impl DryRunMode {
    pub fn from_flag(dry_run: bool) -> Self {
        if dry_run {
            DryRunMode::Preview
        } else {
            DryRunMode::None
        }
    }

    /// Returns true if this is any dry-run mode
    pub fn is_dry_run(&self) -> bool {
        matches!(self, DryRunMode::Preview)
    }

    /// Returns true if files should actually be copied
    pub fn should_copy_files(&self) -> bool {
        matches!(self, DryRunMode::None)
    }

    /// Returns true if expired folders should actually be removed
    pub fn should_delete(&self) -> bool {
        matches!(self, DryRunMode::None)
    }

    /// Get display string for log lines and progress bars
    pub fn progress_prefix(&self) -> &'static str {
        match self {
            DryRunMode::None => "",
            DryRunMode::Preview => "[DRY RUN] ",
        }
    }
}
