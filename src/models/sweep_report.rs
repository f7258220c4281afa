use chrono::NaiveDate;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: Vec<PathBuf>,
    pub failed: usize,
    pub bytes_freed: u64,
    /// Backups dated before this day are gone
    pub cutoff: Option<NaiveDate>,
}

impl SweepReport {
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }
}
