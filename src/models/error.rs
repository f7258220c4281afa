use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Failed to read config file '{path}': {cause}")]
    ConfigRead { path: PathBuf, cause: io::Error },

    #[error("Failed to parse config file '{path}': {cause}")]
    ConfigParse {
        path: PathBuf,
        cause: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Failed to read directory '{path}': {cause}")]
    DirectoryRead { path: PathBuf, cause: io::Error },

    #[error("Failed to create backup directory '{path}': {cause}")]
    CreateDirectory { path: PathBuf, cause: io::Error },

    #[error("Failed to get metadata for '{path}': {cause}")]
    MetadataError { path: PathBuf, cause: io::Error },

    #[error("Failed to compare '{path}' with its last backup: {cause}")]
    Compare { path: PathBuf, cause: io::Error },

    #[error("Failed to copy file from '{from}' to '{to}': {cause}")]
    FileCopy {
        from: PathBuf,
        to: PathBuf,
        cause: io::Error,
    },

    #[error("Failed to remove '{path}': {cause}")]
    Remove { path: PathBuf, cause: io::Error },

    #[error("{0}")]
    NotFound(String),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, BackupError>;
