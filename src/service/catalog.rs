use crate::models::backup_entry::BackupEntry;
use crate::models::backup_outcome::Trigger;
use crate::models::config::BackupPerTime;
use crate::models::error::{BackupError, Result};
use crate::service::paths::{
    format_time_label, is_time_stamp, parse_date_folder, split_extension, BackupPaths,
};
use crate::utils::directory::{child_dir_names, child_file_names};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

/// Lists the backups that exist for one source file. Without a `day` the
/// result is one entry per backup day (or per backup when days are not
/// split further); with a `day` it is every backup taken that day.
/// Newest entries come first.
pub fn list_backups(
    paths: &BackupPaths,
    source: &Path,
    day: Option<&str>,
    now: NaiveDateTime,
) -> Result<Vec<BackupEntry>> {
    if !paths.per_day() {
        return single_backup(paths, source, now);
    }

    let root = paths
        .base_dir(now, true)
        .ok_or_else(|| BackupError::NotFound("No backup directory configured".to_string()))?;
    let relative = paths.relative_source(source);
    let file_name = file_name_of(source);

    if let Some(day) = day {
        if parse_date_folder(day).is_none() {
            return Err(BackupError::NotFound(format!("Folder {} not found!", day)));
        }
    }

    let mut entries = match (paths.per_time(), day) {
        (BackupPerTime::None, _) => daily_copies(&root, &relative, &file_name)?,
        (BackupPerTime::Folder, None) => folder_days(&root, &relative)?,
        (BackupPerTime::Folder, Some(day)) => folder_backups(&root.join(day), &relative, &file_name)?,
        (BackupPerTime::File, None) => file_days(&root, &relative, &file_name)?,
        (BackupPerTime::File, Some(day)) => file_backups(&root.join(day), &relative, &file_name)?,
    };

    if entries.is_empty() {
        return Err(BackupError::NotFound(
            "Backups for this file not exists!".to_string(),
        ));
    }
    entries.reverse();
    Ok(entries)
}

fn single_backup(paths: &BackupPaths, source: &Path, now: NaiveDateTime) -> Result<Vec<BackupEntry>> {
    match paths.backup_filepath(source, now, Trigger::Save) {
        Some(target) if target.is_file() => Ok(vec![BackupEntry {
            label: file_name_of(source),
            detail: None,
            path: target,
        }]),
        _ => Err(BackupError::NotFound(format!(
            "Backup for {} not exists!",
            source.display()
        ))),
    }
}

/// `<root>/<day>/<relative>` for every day
fn daily_copies(root: &Path, relative: &Path, file_name: &str) -> Result<Vec<BackupEntry>> {
    let mut entries = Vec::new();
    for day in backup_days(root)? {
        let candidate = root.join(&day).join(relative);
        if candidate.is_file() {
            entries.push(BackupEntry {
                label: format!("{} - {}", day, file_name),
                detail: None,
                path: candidate,
            });
        }
    }
    Ok(entries)
}

/// One summary per day that has `<root>/<day>/<HHMMSS>/<relative>` copies
fn folder_days(root: &Path, relative: &Path) -> Result<Vec<BackupEntry>> {
    let mut entries = Vec::new();
    for day in backup_days(root)? {
        let day_dir = root.join(&day);
        let stamps: Vec<String> = time_folders(&day_dir)?
            .into_iter()
            .filter(|stamp| day_dir.join(stamp).join(relative).is_file())
            .collect();
        if let Some(entry) = day_summary(&day, &day_dir, &stamps) {
            entries.push(entry);
        }
    }
    Ok(entries)
}

fn folder_backups(day_dir: &Path, relative: &Path, file_name: &str) -> Result<Vec<BackupEntry>> {
    ensure_folder(day_dir)?;
    let mut entries = Vec::new();
    for stamp in time_folders(day_dir)? {
        let candidate = day_dir.join(&stamp).join(relative);
        if candidate.is_file() {
            entries.push(BackupEntry {
                label: format!("{} - {}", format_time_label(&stamp), file_name),
                detail: None,
                path: candidate,
            });
        }
    }
    Ok(entries)
}

/// One summary per day that has `<stem>_<HHMMSS><ext>` copies
fn file_days(root: &Path, relative: &Path, file_name: &str) -> Result<Vec<BackupEntry>> {
    let relative_dir = relative.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut entries = Vec::new();
    for day in backup_days(root)? {
        let day_dir = root.join(&day);
        let backup_dir = day_dir.join(&relative_dir);
        if !backup_dir.is_dir() {
            continue;
        }
        let stamps: Vec<String> = timestamped_copies(&backup_dir, file_name)?
            .into_iter()
            .map(|(stamp, _)| stamp)
            .collect();
        if let Some(entry) = day_summary(&day, &day_dir, &stamps) {
            entries.push(entry);
        }
    }
    Ok(entries)
}

fn file_backups(day_dir: &Path, relative: &Path, file_name: &str) -> Result<Vec<BackupEntry>> {
    let relative_dir = relative.parent().map(Path::to_path_buf).unwrap_or_default();
    let backup_dir = day_dir.join(relative_dir);
    ensure_folder(&backup_dir)?;

    Ok(timestamped_copies(&backup_dir, file_name)?
        .into_iter()
        .map(|(stamp, path)| BackupEntry {
            label: format!("{} - {}", format_time_label(&stamp), file_name),
            detail: None,
            path,
        })
        .collect())
}

fn day_summary(day: &str, day_dir: &Path, stamps: &[String]) -> Option<BackupEntry> {
    let last = stamps.iter().max()?;
    Some(BackupEntry {
        label: day.to_string(),
        detail: Some(format!(
            "Backups: {}, Last edit: {}",
            stamps.len(),
            format_time_label(last)
        )),
        path: day_dir.to_path_buf(),
    })
}

/// `(HHMMSS, path)` of every `<stem>_<HHMMSS><ext>` file in `dir`
fn timestamped_copies(dir: &Path, file_name: &str) -> Result<Vec<(String, PathBuf)>> {
    let (stem, extension) = split_extension(file_name);
    Ok(child_file_names(dir)?
        .into_iter()
        .filter_map(|name| {
            let stamp = timestamp_of(&name, stem, extension)?.to_string();
            Some((stamp, dir.join(&name)))
        })
        .collect())
}

/// The `HHMMSS` part of `name` when it is `<stem>_<HHMMSS><extension>`
fn timestamp_of<'a>(name: &'a str, stem: &str, extension: &str) -> Option<&'a str> {
    let stamp = name
        .strip_prefix(stem)?
        .strip_prefix('_')?
        .strip_suffix(extension)?;
    is_time_stamp(stamp).then_some(stamp)
}

fn backup_days(root: &Path) -> Result<Vec<String>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    Ok(child_dir_names(root)?
        .into_iter()
        .filter(|name| parse_date_folder(name).is_some())
        .collect())
}

fn time_folders(day_dir: &Path) -> Result<Vec<String>> {
    Ok(child_dir_names(day_dir)?
        .into_iter()
        .filter(|name| is_time_stamp(name))
        .collect())
}

fn ensure_folder(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(BackupError::NotFound(format!(
            "Folder {} not found!",
            dir.display()
        )))
    }
}

fn file_name_of(source: &Path) -> String {
    source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
