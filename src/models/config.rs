use crate::models::config_validator::validate_config;
use crate::models::error::{BackupError, Result};
use log::info;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub backup_dir: String,
    #[serde(default = "bool_true")]
    pub backup_per_day: bool,
    #[serde(default, deserialize_with = "deserialize_per_time")]
    pub backup_per_time: BackupPerTime,
    #[serde(default)]
    pub max_backup_file_size_bytes: Option<u64>,
    #[serde(default)]
    pub delete_old_backups: u32,
    #[serde(default = "default_gc_delay_secs")]
    pub gc_delay_secs: u64,
    #[serde(default)]
    pub gc_schedule: Option<String>,
    #[serde(default = "vec_default")]
    pub watch_paths: Vec<String>,
}

/// Time-of-day granularity inside a per-day folder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackupPerTime {
    #[default]
    None,
    /// One `HHMMSS` folder per save
    Folder,
    /// `HHMMSS` suffix on the backed up file name
    File,
}

/// Accepts `false`, `null`, `"folder"` and `"file"`.
fn deserialize_per_time<'de, D>(deserializer: D) -> std::result::Result<BackupPerTime, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null | serde_json::Value::Bool(false) => Ok(BackupPerTime::None),
        serde_json::Value::String(s) => match s.to_lowercase().as_str() {
            "" | "none" => Ok(BackupPerTime::None),
            "folder" => Ok(BackupPerTime::Folder),
            "file" => Ok(BackupPerTime::File),
            other => Err(serde::de::Error::custom(format!(
                "backup_per_time must be false, \"folder\" or \"file\", got \"{}\"",
                other
            ))),
        },
        other => Err(serde::de::Error::custom(format!(
            "backup_per_time must be false, \"folder\" or \"file\", got {}",
            other
        ))),
    }
}

const fn vec_default() -> Vec<String> { Vec::new() }
const fn bool_true() -> bool { true }
const fn default_gc_delay_secs() -> u64 { 10 }

pub fn setup_config(config_file: String) -> Result<Config> {
    let config_path = PathBuf::from(config_file);
    info!("Loading config from: {}", config_path.display());

    let config_str = fs::read_to_string(&config_path).map_err(|cause| {
        BackupError::ConfigRead {
            path: config_path.clone(),
            cause,
        }
    })?;

    let config: Config = serde_json::from_str(&config_str).map_err(|cause| {
        BackupError::ConfigParse {
            path: config_path,
            cause,
        }
    })?;

    validate_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    fn json_path(dir: &TempDir) -> String {
        dir.path().to_str().unwrap().replace("\\", "\\\\")
    }

    #[test]
    fn test_load_valid_config_with_all_fields() {
        let backup_root = TempDir::new().unwrap();
        let watched = TempDir::new().unwrap();

        let config_content = format!(r#"{{
            "backup_dir": "{}",
            "backup_per_day": true,
            "backup_per_time": "file",
            "max_backup_file_size_bytes": 262144,
            "delete_old_backups": 30,
            "gc_delay_secs": 3,
            "gc_schedule": "0 0 3 * * *",
            "watch_paths": ["{}"]
        }}"#,
            json_path(&backup_root),
            json_path(&watched)
        );
        let temp_file = write_config(&config_content);

        let config = setup_config(temp_file.path().to_str().unwrap().to_string()).unwrap();

        assert!(config.backup_per_day);
        assert_eq!(config.backup_per_time, BackupPerTime::File);
        assert_eq!(config.max_backup_file_size_bytes, Some(262144));
        assert_eq!(config.delete_old_backups, 30);
        assert_eq!(config.gc_delay_secs, 3);
        assert_eq!(config.gc_schedule.as_deref(), Some("0 0 3 * * *"));
        assert_eq!(config.watch_paths.len(), 1);
    }

    #[test]
    fn test_load_config_with_defaults() {
        let backup_root = TempDir::new().unwrap();
        let config_content = format!(r#"{{ "backup_dir": "{}" }}"#, json_path(&backup_root));
        let temp_file = write_config(&config_content);

        let config = setup_config(temp_file.path().to_str().unwrap().to_string()).unwrap();

        assert!(config.backup_per_day); // default
        assert_eq!(config.backup_per_time, BackupPerTime::None); // default
        assert_eq!(config.max_backup_file_size_bytes, None);
        assert_eq!(config.delete_old_backups, 0);
        assert_eq!(config.gc_delay_secs, 10);
        assert!(config.gc_schedule.is_none());
        assert!(config.watch_paths.is_empty());
    }

    #[test]
    fn test_per_time_accepts_false_and_folder() {
        let backup_root = TempDir::new().unwrap();

        let disabled = write_config(&format!(
            r#"{{ "backup_dir": "{}", "backup_per_time": false }}"#,
            json_path(&backup_root)
        ));
        let config = setup_config(disabled.path().to_str().unwrap().to_string()).unwrap();
        assert_eq!(config.backup_per_time, BackupPerTime::None);

        let folder = write_config(&format!(
            r#"{{ "backup_dir": "{}", "backup_per_time": "Folder" }}"#,
            json_path(&backup_root)
        ));
        let config = setup_config(folder.path().to_str().unwrap().to_string()).unwrap();
        assert_eq!(config.backup_per_time, BackupPerTime::Folder);
    }

    #[test]
    fn test_per_time_rejects_unknown_value() {
        let backup_root = TempDir::new().unwrap();
        let temp_file = write_config(&format!(
            r#"{{ "backup_dir": "{}", "backup_per_time": "hourly" }}"#,
            json_path(&backup_root)
        ));

        match setup_config(temp_file.path().to_str().unwrap().to_string()) {
            Err(BackupError::ConfigParse { cause, .. }) => {
                assert!(cause.to_string().contains("backup_per_time"));
            }
            other => panic!("Expected ConfigParse error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_error_on_missing_config_file() {
        let result = setup_config("/this/does/not/exist/autobackups.json".to_string());

        match result {
            Err(BackupError::ConfigRead { .. }) => {}
            _ => panic!("Expected ConfigRead error"),
        }
    }

    #[test]
    fn test_error_on_invalid_json() {
        let temp_file = write_config(r#"{ "backup_dir": "/tmp/backups", "#);

        match setup_config(temp_file.path().to_str().unwrap().to_string()) {
            Err(BackupError::ConfigParse { .. }) => {}
            _ => panic!("Expected ConfigParse error"),
        }
    }

    #[test]
    fn test_error_on_missing_backup_dir() {
        let temp_file = write_config(r#"{ "backup_per_day": true }"#);

        match setup_config(temp_file.path().to_str().unwrap().to_string()) {
            Err(BackupError::ConfigParse { .. }) => {}
            _ => panic!("Expected ConfigParse error for missing backup_dir"),
        }
    }
}
