//! The `add` subcommand: record an entry from the command line.

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{info, warn};

use crate::config::Config;
use crate::scheduler::{self, Registry, SchedulerError, timing};
use crate::storage::{FileStorage, Storage, WorkEntry};
use crate::tasks::REMINDER_TASK_ID;

/// Save an entry and push the next reminder out by one interval.
pub async fn run_add(config: Config, content: String) -> Result<()> {
    let now = Local::now();
    let storage = FileStorage::new(&config.data_dir(), &config.summary_dir());
    storage
        .save_entry(WorkEntry {
            timestamp: now,
            content: content.clone(),
        })
        .await
        .context("save entry")?;
    println!("Recorded: {} ({})", content, now.format("%H:%M"));

    // An explicit entry satisfies the reminder's purpose, so the next
    // prompt moves one interval from now. Failure here is cosmetic.
    if let Err(e) = push_reminder_schedule(&config).await {
        warn!(error = %e, "Could not update reminder schedule");
    }
    Ok(())
}

/// Re-anchor the reminder's `next_run` and nudge a running daemon to
/// pick the change up.
pub(super) async fn push_reminder_schedule(config: &Config) -> Result<()> {
    let run_dir = config.run_dir();
    let registry = Registry::new(&run_dir);
    registry.load().await?;

    let now = Local::now();
    match registry
        .patch_task(REMINDER_TASK_ID, |task| {
            let interval = task.interval_minutes.unwrap_or(60).max(1);
            task.next_run = Some(timing::next_interval_run(now, interval));
        })
        .await
    {
        Ok(()) => {
            scheduler::write_reset_signal(&run_dir).await?;
            info!("Reminder schedule updated");
            Ok(())
        }
        // No registry or no reminder task yet means the daemon has never
        // run; nothing to update.
        Err(SchedulerError::NotFound(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
