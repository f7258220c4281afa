use crate::models::dry_run_mode::DryRunMode;
use crate::models::error::Result;
use crate::models::sweep_report::SweepReport;
use crate::service::paths::{parse_date_folder, BackupPaths, DATE_FORMAT};
use crate::utils::directory::{child_dir_names, dir_size, remove_dir_forced};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use cron::Schedule;
use indicatif::ProgressBar;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Deletes date folders older than the retention window from the backup root
#[derive(Debug, Clone)]
pub struct RetentionSweep {
    paths: BackupPaths,
    retention_days: u32,
    dry_run_mode: DryRunMode,
}

/// A folder dated `folder_date` is expired once more than
/// `retention_days + 1` days have passed since its midnight.
pub fn is_expired(folder_date: NaiveDate, now: NaiveDateTime, retention_days: u32) -> bool {
    let folder_time = folder_date.and_time(NaiveTime::MIN);
    now - folder_time > Duration::days(i64::from(retention_days) + 1)
}

impl RetentionSweep {
    pub fn new(paths: BackupPaths, retention_days: u32, dry_run_mode: DryRunMode) -> Self {
        RetentionSweep {
            paths,
            retention_days,
            dry_run_mode,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.retention_days > 0
    }

    pub fn run(&self, now: NaiveDateTime, progress: Option<&ProgressBar>) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        if !self.is_enabled() {
            return Ok(report);
        }

        let Some(root) = self.paths.base_dir(now, true) else {
            return Ok(report);
        };
        if !root.is_dir() {
            debug!("Backup root {} does not exist, nothing to sweep", root.display());
            return Ok(report);
        }

        let cutoff = (now - Duration::days(i64::from(self.retention_days))).date();
        report.cutoff = Some(cutoff);

        for name in child_dir_names(&root)? {
            let Some(folder_date) = parse_date_folder(&name) else {
                continue;
            };
            if !is_expired(folder_date, now, self.retention_days) {
                continue;
            }

            let folder = root.join(&name);
            if let Some(pb) = progress {
                pb.set_message(format!("{}Removing {}", self.dry_run_mode.progress_prefix(), name));
            }
            let size = dir_size(&folder);

            if !self.dry_run_mode.should_delete() {
                info!(
                    "{}Would delete {}",
                    self.dry_run_mode.progress_prefix(),
                    folder.display()
                );
                report.bytes_freed += size;
                report.deleted.push(folder);
                continue;
            }

            match remove_dir_forced(&folder) {
                Ok(()) => {
                    debug!("Deleted {}", folder.display());
                    report.bytes_freed += size;
                    report.deleted.push(folder);
                }
                Err(e) => {
                    error!("{}", e);
                    report.failed += 1;
                }
            }
        }

        if report.deleted_count() > 0 {
            info!(
                "{}Deleted {} backup folders older than {}",
                self.dry_run_mode.progress_prefix(),
                report.deleted_count(),
                cutoff.format(DATE_FORMAT)
            );
        }
        if report.failed > 0 {
            warn!("{} backup folders could not be deleted", report.failed);
        }

        Ok(report)
    }
}

/// Run the sweep once after `delay`, then on every tick of `schedule`
/// until `running` is cleared.
pub fn spawn_retention_worker(
    sweep: RetentionSweep,
    delay: std::time::Duration,
    schedule: Option<Schedule>,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        if !sleep_while_running(delay, &running) {
            return;
        }
        run_logged(&sweep);

        let Some(schedule) = schedule else {
            return;
        };

        while running.load(Ordering::SeqCst) {
            let now = Local::now();
            let Some(next) = schedule.upcoming(Local).take(1).next() else {
                warn!("No upcoming retention sweep found in schedule");
                break;
            };
            let duration_until_next = (next - now)
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(0));

            info!(
                "Next retention sweep scheduled for: {} (in {} seconds)",
                next.format("%Y-%m-%d %H:%M:%S"),
                duration_until_next.as_secs()
            );

            if !sleep_while_running(duration_until_next, &running) {
                break;
            }
            run_logged(&sweep);
        }
        debug!("Retention worker stopped");
    })
}

fn run_logged(sweep: &RetentionSweep) {
    if let Err(e) = sweep.run(Local::now().naive_local(), None) {
        error!("Retention sweep failed: {}", e);
    }
}

/// Sleep in short slices so a shutdown is noticed quickly. Returns false
/// when interrupted.
fn sleep_while_running(duration: std::time::Duration, running: &AtomicBool) -> bool {
    let step = std::time::Duration::from_millis(250);
    let mut remaining = duration;
    while !remaining.is_zero() {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let slice = remaining.min(step);
        thread::sleep(slice);
        remaining -= slice;
    }
    running.load(Ordering::SeqCst)
}
