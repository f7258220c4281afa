use std::path::PathBuf;

/// One row of a backup listing: a human label and the path it points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub label: String,
    pub detail: Option<String>,
    pub path: PathBuf,
}
