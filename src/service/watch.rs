//! Watches directories for saved files and hands each save to the backup writer

use crate::models::backup_outcome::Trigger;
use crate::models::error::Result;
use crate::service::backup::BackupWriter;
use crate::service::paths::BackupPaths;
use chrono::Local;
use log::{debug, error, info};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

pub struct SaveWatcher {
    watcher: RecommendedWatcher,
    events: Receiver<notify::Result<Event>>,
    watched: Vec<PathBuf>,
}

impl SaveWatcher {
    pub fn new() -> Result<Self> {
        let (tx, events) = mpsc::channel();
        let watcher = notify::recommended_watcher(tx)?;
        Ok(SaveWatcher {
            watcher,
            events,
            watched: Vec::new(),
        })
    }

    pub fn watch(&mut self, dir: &Path) -> Result<()> {
        self.watcher.watch(dir, RecursiveMode::Recursive)?;
        self.watched.push(dir.to_path_buf());
        info!("Started watching path: {}", dir.display());
        Ok(())
    }

    pub fn watched_count(&self) -> usize {
        self.watched.len()
    }

    /// Back up every saved file until `running` is cleared
    pub fn run(&self, writer: &mut BackupWriter, running: Arc<AtomicBool>) {
        while running.load(Ordering::SeqCst) {
            match self.events.recv_timeout(Duration::from_millis(500)) {
                Ok(Ok(event)) => {
                    for path in saved_paths(&event, writer.paths()) {
                        if let Err(e) = writer.save_backup(&path, Trigger::Save, Local::now().naive_local()) {
                            error!("{}", e);
                        }
                    }
                }
                Ok(Err(e)) => error!("File watcher error: {}", e),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    error!("File watcher channel closed");
                    break;
                }
            }
        }
        info!("File watcher stopped");
    }
}

/// Files an event reports as written, minus temp files and anything in the
/// backup tree itself
pub fn saved_paths(event: &Event, paths: &BackupPaths) -> Vec<PathBuf> {
    let is_save = match &event.kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    };
    if !is_save {
        return Vec::new();
    }

    let mut saved: Vec<PathBuf> = Vec::new();
    for path in &event.paths {
        if saved.contains(path) || !should_watch_file(path) || paths.is_backup_file(path) {
            continue;
        }
        if !path.is_file() {
            continue;
        }
        debug!("Save detected: {}", path.display());
        saved.push(path.clone());
    }
    saved
}

/// Editor swap files, temp files and OS metadata files are never backed up
pub fn should_watch_file(path: &Path) -> bool {
    let file_name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return false,
    };

    if file_name.starts_with('.') {
        return false;
    }

    if file_name.ends_with('~')
        || file_name.ends_with(".tmp")
        || file_name.ends_with(".temp")
        || file_name.ends_with(".swp")
        || file_name.ends_with(".bak")
    {
        return false;
    }

    let lower_name = file_name.to_lowercase();
    !(lower_name == "thumbs.db" || lower_name == "desktop.ini")
}
