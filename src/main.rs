mod models;
mod service;
mod utils;

use crate::models::backup_outcome::{BackupOutcome, Trigger};
use crate::models::config::{setup_config, Config};
use crate::models::dry_run_mode::DryRunMode;
use crate::service::backup::BackupWriter;
use crate::service::catalog::list_backups;
use crate::service::paths::{BackupPaths, DATE_FORMAT};
use crate::service::retention::{spawn_retention_worker, RetentionSweep};
use crate::service::watch::SaveWatcher;
use crate::utils::directory::expand_home;
use crate::utils::progress::{create_spinner, format_bytes};
use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use cron::Schedule;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "autobackups")]
#[command(about = "Keeps a timestamped backup of every file you save", long_about = None)]
struct Cli {
    #[arg(
        short = 'c',
        long = "config",
        default_value = "autobackups.json",
        env = "AUTOBACKUPS_CONFIG"
    )]
    config_file: String,

    #[arg(
        short = 'l',
        long = "log-level",
        default_value = "info",
        env = "LOG_LEVEL"
    )]
    log_level: String,

    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    #[arg(short = 'v', long = "validate-only")]
    validate_only: bool,

    #[arg(short = 'd', long = "dry-run")]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Back up one file, as an editor hook does after a save
    Backup {
        file: PathBuf,

        /// The file was opened rather than saved
        #[arg(long = "on-open")]
        on_open: bool,
    },
    /// Watch directories and back up every file saved in them
    Watch {
        /// Defaults to watch_paths from the config
        dirs: Vec<PathBuf>,
    },
    /// Delete backup folders older than the retention window
    Gc {
        /// Override delete_old_backups
        #[arg(long = "days")]
        days: Option<u32>,
    },
    /// List the backups that exist for a file
    List {
        file: PathBuf,

        /// Show the individual backups of one day (YYYY-MM-DD)
        #[arg(long = "day")]
        day: Option<String>,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_secs()
        .init();

    // Strip any surrounding quotes from config file path
    let config_file_path = args
        .config_file
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();

    let config: Config = setup_config(config_file_path).context("Failed to load configuration")?;
    debug!("Loaded config: {:?}", &config);

    if args.validate_only {
        info!("Configuration is valid. Exiting (--validate-only mode).");
        return Ok(());
    }

    let dry_run_mode = DryRunMode::from_flag(args.dry_run);
    if dry_run_mode.is_dry_run() {
        info!("Running in DRY RUN mode - nothing will be copied or deleted");
    }

    match args.command {
        Some(Command::Backup { file, on_open }) => run_backup(&config, &file, on_open, dry_run_mode),
        Some(Command::Watch { dirs }) => run_watch(&config, dirs, dry_run_mode),
        Some(Command::Gc { days }) => run_gc(&config, days, dry_run_mode, args.quiet),
        Some(Command::List { file, day }) => run_list(&config, &file, day.as_deref()),
        None => bail!("No command given. Use --help to see the available commands."),
    }
}

fn run_backup(config: &Config, file: &Path, on_open: bool, dry_run_mode: DryRunMode) -> Result<()> {
    let file = std::path::absolute(file)
        .with_context(|| format!("Failed to resolve path: {}", file.display()))?;
    let trigger = if on_open { Trigger::Open } else { Trigger::Save };

    let mut writer = BackupWriter::new(
        BackupPaths::from_config(config),
        config.max_backup_file_size_bytes,
        dry_run_mode,
    );

    match writer
        .save_backup(&file, trigger, Local::now().naive_local())
        .context("Backup operation failed")?
    {
        BackupOutcome::Saved(_) => {}
        BackupOutcome::Skipped(reason) => debug!("No backup written: {:?}", reason),
    }
    Ok(())
}

fn run_watch(config: &Config, dirs: Vec<PathBuf>, dry_run_mode: DryRunMode) -> Result<()> {
    let dirs: Vec<PathBuf> = if dirs.is_empty() {
        config.watch_paths.iter().map(|p| expand_home(p)).collect()
    } else {
        dirs
    };
    if dirs.is_empty() {
        bail!("No directories to watch. Pass them on the command line or set watch_paths in the config.");
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping watcher...");
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let paths = BackupPaths::from_config(config);
    let sweep = RetentionSweep::new(paths.clone(), config.delete_old_backups, dry_run_mode);
    let worker = if sweep.is_enabled() {
        let schedule = config
            .gc_schedule
            .as_deref()
            .map(Schedule::from_str)
            .transpose()
            .context("Invalid cron expression")?;
        Some(spawn_retention_worker(
            sweep,
            std::time::Duration::from_secs(config.gc_delay_secs),
            schedule,
            running.clone(),
        ))
    } else {
        None
    };

    let mut watcher = SaveWatcher::new().context("Failed to start file watcher")?;
    for dir in &dirs {
        let dir = std::path::absolute(dir)
            .with_context(|| format!("Failed to resolve path: {}", dir.display()))?;
        watcher
            .watch(&dir)
            .with_context(|| format!("Failed to watch directory: {}", dir.display()))?;
    }
    info!("AutoBackups initialized, watching {} directories", watcher.watched_count());

    let mut writer = BackupWriter::new(paths, config.max_backup_file_size_bytes, dry_run_mode);
    watcher.run(&mut writer, running.clone());

    running.store(false, Ordering::SeqCst);
    if let Some(handle) = worker {
        if handle.join().is_err() {
            warn!("Retention worker panicked");
        }
    }
    Ok(())
}

fn run_gc(config: &Config, days: Option<u32>, dry_run_mode: DryRunMode, quiet: bool) -> Result<()> {
    let days = days.unwrap_or(config.delete_old_backups);
    if days == 0 {
        info!("Retention is disabled (delete_old_backups is 0), nothing to delete");
        return Ok(());
    }

    let spinner = if !quiet {
        Some(create_spinner(&format!(
            "{}Scanning backup folders...",
            dry_run_mode.progress_prefix()
        )))
    } else {
        None
    };

    let sweep = RetentionSweep::new(BackupPaths::from_config(config), days, dry_run_mode);
    let report = sweep
        .run(Local::now().naive_local(), spinner.as_ref())
        .context("Retention sweep failed")?;

    let cutoff = report
        .cutoff
        .map(|date| format!(" older than {}", date.format(DATE_FORMAT)))
        .unwrap_or_default();
    let summary = format!(
        "{}Deleted {} backup folders{}, freed {}",
        dry_run_mode.progress_prefix(),
        report.deleted_count(),
        cutoff,
        format_bytes(report.bytes_freed)
    );
    match spinner {
        Some(spinner) => spinner.finish_with_message(summary),
        None => info!("{}", summary),
    }

    if report.failed > 0 {
        bail!("{} backup folders could not be deleted", report.failed);
    }
    Ok(())
}

fn run_list(config: &Config, file: &Path, day: Option<&str>) -> Result<()> {
    let file = std::path::absolute(file)
        .with_context(|| format!("Failed to resolve path: {}", file.display()))?;
    let paths = BackupPaths::from_config(config);

    let entries = list_backups(&paths, &file, day, Local::now().naive_local())?;
    for entry in entries {
        match entry.detail {
            Some(detail) => println!("{}\t{}\t{}", entry.label, detail, entry.path.display()),
            None => println!("{}\t{}", entry.label, entry.path.display()),
        }
    }
    Ok(())
}
