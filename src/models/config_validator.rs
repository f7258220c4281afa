use crate::models::config::{BackupPerTime, Config};
use crate::models::error::{BackupError, Result};
use crate::utils::directory::resolve_path;
use log::{info, warn};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Validates the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    info!("Validating configuration...");

    validate_numeric_values(config)?;

    validate_backup_dir(&config.backup_dir)?;

    validate_schedule(config)?;

    check_conflicting_flags(config);

    info!("Configuration validation passed");
    Ok(())
}

/// Validate numeric configuration values
fn validate_numeric_values(config: &Config) -> Result<()> {
    if config.max_backup_file_size_bytes == Some(0) {
        return Err(BackupError::ConfigInvalid(
            "max_backup_file_size_bytes must be greater than 0".to_string(),
        ));
    }

    if config.max_backup_file_size_bytes.is_none() {
        warn!("max_backup_file_size_bytes is not set - saves will not be backed up");
    }

    Ok(())
}

/// Validate the backup root, which may not exist yet
fn validate_backup_dir(backup_dir: &str) -> Result<()> {
    if backup_dir.trim().is_empty() {
        return Err(BackupError::ConfigInvalid(
            "backup_dir must not be empty".to_string(),
        ));
    }

    let path = resolve_path(backup_dir);

    if path.exists() {
        if !path.is_dir() {
            return Err(BackupError::ConfigInvalid(format!(
                "backup_dir exists but is not a directory: {}",
                path.display()
            )));
        }

        if let Err(e) = check_writable(&path) {
            return Err(BackupError::ConfigInvalid(format!(
                "backup_dir is not writable: {}\nError: {}",
                path.display(),
                e
            )));
        }
        return Ok(());
    }

    // Created on first backup, so the nearest existing ancestor has to be writable
    let ancestor = path
        .ancestors()
        .skip(1)
        .find(|p| p.exists());

    match ancestor {
        Some(parent) => {
            if let Err(e) = check_writable(parent) {
                return Err(BackupError::ConfigInvalid(format!(
                    "backup_dir cannot be created under {}: {}",
                    parent.display(),
                    e
                )));
            }
            warn!(
                "backup_dir does not exist but will be created: {}",
                path.display()
            );
            Ok(())
        }
        None => Err(BackupError::ConfigInvalid(format!(
            "backup_dir has no existing parent directory: {}",
            path.display()
        ))),
    }
}

/// Validate the retention schedule if present
fn validate_schedule(config: &Config) -> Result<()> {
    if let Some(schedule_str) = &config.gc_schedule {
        match cron::Schedule::from_str(schedule_str) {
            Ok(_) => {
                info!("Retention schedule validated: {}", schedule_str);
            }
            Err(e) => {
                return Err(BackupError::ConfigInvalid(format!(
                    "Invalid cron expression in gc_schedule: {}\nError: {}\nExample: '0 0 3 * * *' for daily at 3am",
                    schedule_str, e
                )));
            }
        }
    }
    Ok(())
}

/// Flags that are legal but have no effect
fn check_conflicting_flags(config: &Config) {
    if !config.backup_per_day && config.backup_per_time != BackupPerTime::None {
        warn!("backup_per_time only applies when backup_per_day is enabled - it has no effect");
    }

    if config.gc_schedule.is_some() && config.delete_old_backups == 0 {
        warn!("gc_schedule is set but delete_old_backups is 0 - no backups will be deleted");
    }

    if !config.backup_per_day && config.delete_old_backups > 0 {
        warn!("delete_old_backups only removes date folders, which are not created without backup_per_day");
    }
}

/// Check if a directory is writable by attempting to create a temporary file
fn check_writable(path: &Path) -> std::io::Result<()> {
    let test_file = path.join(".autobackups_write_test");

    fs::write(&test_file, b"test")?;

    fs::remove_file(&test_file)?;

    Ok(())
}
