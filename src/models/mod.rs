pub mod backup_entry;
pub mod backup_outcome;
pub mod config;
pub mod config_validator;
pub mod dry_run_mode;
pub mod error;
pub mod sweep_report;
