use crate::models::error::{BackupError, Result};
use log::debug;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Drop `.` segments and fold `..` into the segment before it without
/// touching the filesystem. A `..` with nothing left to remove is dropped,
/// so the result never climbs above its first segment.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(cleaned.components().next_back(), Some(Component::Normal(_))) {
                    cleaned.pop();
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

/// `~` expanded, made absolute against the working directory and cleaned
pub fn resolve_path(path: &str) -> PathBuf {
    let expanded = expand_home(path);
    let absolute = match std::path::absolute(&expanded) {
        Ok(absolute) => absolute,
        Err(e) => {
            debug!("Could not make {} absolute: {}", expanded.display(), e);
            expanded
        }
    };
    clean_path(&absolute)
}

/// Names of the direct children of `dir` that are directories
pub fn child_dir_names(dir: &Path) -> Result<Vec<String>> {
    child_names(dir, true)
}

/// Names of the direct children of `dir` that are regular files
pub fn child_file_names(dir: &Path) -> Result<Vec<String>> {
    child_names(dir, false)
}

fn child_names(dir: &Path, want_dirs: bool) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|cause| BackupError::DirectoryRead {
        path: dir.to_path_buf(),
        cause,
    })?;

    let mut names = Vec::new();
    for entry in entries.filter_map(std::result::Result::ok) {
        let wanted = entry
            .file_type()
            .map(|t| if want_dirs { t.is_dir() } else { t.is_file() })
            .unwrap_or(false);
        if !wanted {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Total size in bytes of every file below `dir`
pub fn dir_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}

/// Remove `dir` and everything below it, making read-only entries
/// writable when the first removal attempt is refused.
pub fn remove_dir_forced(dir: &Path) -> Result<()> {
    for entry in WalkDir::new(dir).contents_first(true) {
        let entry = entry.map_err(|e| BackupError::Remove {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf()),
            cause: e.into(),
        })?;
        let path = entry.path();
        let is_dir = entry.file_type().is_dir();

        if let Err(cause) = remove_entry(path, is_dir) {
            if cause.kind() != io::ErrorKind::PermissionDenied {
                return Err(BackupError::Remove {
                    path: path.to_path_buf(),
                    cause,
                });
            }

            debug!("Forcing write permission on {}", path.display());
            if let Err(e) = make_writable(path) {
                debug!("Could not make {} writable: {}", path.display(), e);
            }
            if let Some(parent) = path.parent() {
                if let Err(e) = make_writable(parent) {
                    debug!("Could not make {} writable: {}", parent.display(), e);
                }
            }
            remove_entry(path, is_dir).map_err(|cause| BackupError::Remove {
                path: path.to_path_buf(),
                cause,
            })?;
        }
    }
    Ok(())
}

fn remove_entry(path: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(unix)]
fn make_writable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::symlink_metadata(path)?;
    if metadata.file_type().is_symlink() {
        return Ok(());
    }
    let mut permissions = metadata.permissions();
    permissions.set_mode(permissions.mode() | 0o200);
    fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn make_writable(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    let mut permissions = metadata.permissions();
    if permissions.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions)?;
    }
    Ok(())
}
