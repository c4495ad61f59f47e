//! The `serve` subcommand: run the daemon.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::config::Config;
use crate::dialog::OsaScriptDialog;
use crate::lock::ProcessLock;
use crate::scheduler::{Registry, SchedulerService, TaskBootstrap, WeeklyBootstrap};
use crate::storage::FileStorage;
use crate::summary::{CommandClient, Generator};
use crate::tasks::{DailySummaryTask, LogRotateTask, ReminderTask, WeeklySummaryTask};

/// Run the daemon until a shutdown signal arrives.
pub async fn run_serve(config: Config) -> Result<()> {
    let run_dir = config.run_dir();
    let _lock = ProcessLock::acquire(&run_dir).context("acquire process lock")?;

    let storage = Arc::new(FileStorage::new(&config.data_dir(), &config.summary_dir()));
    let dialog = Arc::new(OsaScriptDialog::new(Duration::from_secs(
        config.dialog.timeout_seconds,
    )));
    let Some(client) = CommandClient::new(&config.summary.command) else {
        bail!("summary.command must not be empty");
    };
    let generator = Arc::new(Generator::new(
        storage.clone(),
        Arc::new(client),
        Some(dialog.clone()),
    ));

    let registry = Registry::new(&run_dir);
    // A corrupt registry aborts startup rather than silently wiping the
    // persisted schedules.
    registry.load().await.context("load task registry")?;

    let mut service = SchedulerService::new(registry, &run_dir);
    service
        .init_tasks(&TaskBootstrap {
            reminder_interval_minutes: config.reminder_interval_minutes(),
            summary_time: config.summary.time.clone(),
            weekly_summary: config.summary.weekly.enabled.then(|| WeeklyBootstrap {
                weekday: config.summary.weekly.weekday,
                time: config.summary.weekly.time.clone(),
            }),
        })
        .await
        .context("initialize tasks")?;

    service.register_task(Arc::new(ReminderTask::new(dialog.clone(), storage.clone())));
    service.register_task(Arc::new(DailySummaryTask::new(
        storage.clone(),
        generator.clone(),
        &config.summary.time,
    )));
    service.register_task(Arc::new(LogRotateTask::new(
        config.log_files(),
        config.logging.max_log_size_mb,
    )));
    if config.summary.weekly.enabled {
        service.register_task(Arc::new(WeeklySummaryTask::new(
            generator,
            config.summary.weekly.weekday,
            &config.summary.weekly.time,
        )));
    }

    let handle = service.start().await.context("start scheduler")?;
    info!("Daemon running");

    shutdown_signal().await;
    info!("Shutdown signal received");
    handle.shutdown().await;
    Ok(())
}

/// Completes on ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
