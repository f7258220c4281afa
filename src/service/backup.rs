use crate::models::backup_outcome::{BackupOutcome, SkipReason, Trigger};
use crate::models::dry_run_mode::DryRunMode;
use crate::models::error::{BackupError, Result};
use crate::service::paths::BackupPaths;
use crate::utils::compare::files_equal;
use chrono::NaiveDateTime;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Copies saved files into the backup tree. Remembers the last backup of
/// every file for the lifetime of the writer so unchanged saves are skipped.
pub struct BackupWriter {
    paths: BackupPaths,
    max_file_size: Option<u64>,
    dry_run_mode: DryRunMode,
    last_backups: HashMap<PathBuf, PathBuf>,
}

impl BackupWriter {
    pub fn new(paths: BackupPaths, max_file_size: Option<u64>, dry_run_mode: DryRunMode) -> Self {
        BackupWriter {
            paths,
            max_file_size,
            dry_run_mode,
            last_backups: HashMap::new(),
        }
    }

    pub fn paths(&self) -> &BackupPaths {
        &self.paths
    }

    #[cfg(test)]
    pub fn last_backup(&self, file: &Path) -> Option<&PathBuf> {
        self.last_backups.get(&self.paths.resolve_source(file))
    }

    pub fn save_backup(&mut self, file: &Path, trigger: Trigger, now: NaiveDateTime) -> Result<BackupOutcome> {
        let source = self.paths.resolve_source(file);
        let file = source.as_path();

        let metadata = match fs::metadata(file) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Ok(self.skip(file, SkipReason::Missing)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(self.skip(file, SkipReason::Missing));
            }
            Err(cause) => {
                return Err(BackupError::MetadataError {
                    path: file.to_path_buf(),
                    cause,
                })
            }
        };

        if metadata.permissions().readonly() {
            return Ok(self.skip(file, SkipReason::ReadOnly));
        }

        let Some(max_file_size) = self.max_file_size else {
            warn!("Max allowed size from config not available");
            return Ok(BackupOutcome::Skipped(SkipReason::SizeUnknown));
        };

        let size = metadata.len();
        if size > max_file_size {
            warn!("Backup not saved, file too large ({} bytes)", size);
            return Ok(BackupOutcome::Skipped(SkipReason::TooLarge(size)));
        }

        if trigger.is_open() && self.paths.is_backup_file(file) {
            return Ok(self.skip(file, SkipReason::IsBackup));
        }

        let Some(target) = self.paths.backup_filepath(file, now, trigger) else {
            return Ok(self.skip(file, SkipReason::NoTarget));
        };

        if !self.is_safe_target(file, &target) {
            warn!(
                "Backup not saved, target {} is not a separate file under the backup root",
                display_path(&target)
            );
            return Ok(BackupOutcome::Skipped(SkipReason::UnsafeTarget));
        }

        if let Some(last_backup) = self.last_backups.get(file) {
            match files_equal(file, last_backup) {
                Ok(true) => return Ok(self.skip(file, SkipReason::Unchanged)),
                Ok(false) => {}
                // The previous backup may have been swept or removed by hand
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(cause) => {
                    return Err(BackupError::Compare {
                        path: file.to_path_buf(),
                        cause,
                    })
                }
            }
        }

        if trigger.is_open() && target.is_file() {
            return Ok(self.skip(file, SkipReason::Exists));
        }

        if !self.dry_run_mode.should_copy_files() {
            info!(
                "{}Backup would be saved to: {}",
                self.dry_run_mode.progress_prefix(),
                display_path(&target)
            );
            return Ok(BackupOutcome::Saved(target));
        }

        if let Some(backup_dir) = target.parent() {
            fs::create_dir_all(backup_dir).map_err(|cause| BackupError::CreateDirectory {
                path: backup_dir.to_path_buf(),
                cause,
            })?;
        }

        fs::copy(file, &target).map_err(|cause| BackupError::FileCopy {
            from: file.to_path_buf(),
            to: target.clone(),
            cause,
        })?;

        self.last_backups.insert(file.to_path_buf(), target.clone());
        info!("Backup saved to: {}", display_path(&target));
        Ok(BackupOutcome::Saved(target))
    }

    /// The target has to sit under the root and must not be `file` itself,
    /// also when a symlink in the backup tree leads back to it
    fn is_safe_target(&self, file: &Path, target: &Path) -> bool {
        let Some(root) = self.paths.root() else {
            return false;
        };
        if !target.starts_with(&root) || target == file {
            return false;
        }
        match (fs::canonicalize(file), fs::canonicalize(target)) {
            (Ok(file), Ok(target)) => file != target,
            _ => true,
        }
    }

    fn skip(&self, file: &Path, reason: SkipReason) -> BackupOutcome {
        debug!("Skipping backup of {}: {:?}", file.display(), reason);
        BackupOutcome::Skipped(reason)
    }
}

/// Backup paths are logged with forward slashes on every platform
fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
