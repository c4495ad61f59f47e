//! Daily summary generation with backlog catch-up.
//!
//! The task does not just summarize yesterday: any past day with entries
//! but no summary (accumulated while the machine was off) is generated in
//! one batch, oldest first. Today is never summarized while still in
//! progress.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::scheduler::{Decision, Task, TaskConfig, timing};
use crate::storage::Storage;
use crate::summary::Generator;

use super::DAILY_SUMMARY_TASK_ID;

/// Generates daily summaries for every pending past day.
pub struct DailySummaryTask {
    storage: Arc<dyn Storage>,
    generator: Arc<Generator>,
    anchor: String,
    /// Dates found due by `should_run`, consumed by `execute`.
    pending: Mutex<Vec<NaiveDate>>,
}

impl DailySummaryTask {
    /// `anchor` is the daily "HH:MM" generation time.
    pub fn new(storage: Arc<dyn Storage>, generator: Arc<Generator>, anchor: &str) -> Self {
        Self {
            storage,
            generator,
            anchor: anchor.to_string(),
            pending: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl Task for DailySummaryTask {
    fn id(&self) -> &str {
        DAILY_SUMMARY_TASK_ID
    }

    fn name(&self) -> &str {
        "Daily summary"
    }

    async fn should_run(&self, now: DateTime<Local>, _config: &TaskConfig) -> Decision {
        let today = now.date_naive();
        let dates = match self.storage.ungenerated_dates(today).await {
            Ok(dates) => dates,
            Err(e) => {
                warn!(error = %e, "Could not determine pending summary dates");
                return Decision::Skip;
            }
        };

        if dates.is_empty() {
            // Nothing to catch up on; come back at tomorrow's anchor.
            return Decision::Reschedule(timing::next_daily_run(now, &self.anchor));
        }

        info!(pending = dates.len(), "Found days awaiting a summary");
        *self.pending.lock().await = dates;
        Decision::Run
    }

    async fn execute(&self) -> anyhow::Result<()> {
        let dates = std::mem::take(&mut *self.pending.lock().await);
        if dates.is_empty() {
            return Ok(());
        }

        let total = dates.len();
        let mut generated = 0usize;
        let mut last_error = None;

        for date in dates {
            if let Err(e) = self.generator.generate_daily(date).await {
                error!(date = %date, error = %e, "Summary generation failed");
                last_error = Some(e);
                continue;
            }
            // The summary exists even if marking fails; do not fail the run.
            if let Err(e) = self.storage.mark_summary_generated(date).await {
                warn!(date = %date, error = %e, "Failed to mark summary as generated");
            }
            generated += 1;
            info!(date = %date, generated, total, "Summary generated");
        }

        match (generated, last_error) {
            (0, Some(e)) => Err(anyhow::Error::new(e).context("no summaries generated")),
            (_, Some(_)) => {
                warn!(generated, total, "Some summaries failed to generate");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn on_executed(
        &self,
        now: DateTime<Local>,
        config: &mut TaskConfig,
        error: Option<&anyhow::Error>,
    ) {
        config.record_outcome(now, error);
        config.next_run = Some(timing::next_daily_run(now, &self.anchor));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, WorkEntry};
    use crate::summary::{Result as SummaryResult, SummaryClient};
    use chrono::TimeZone;
    use tempfile::TempDir;

    struct CannedClient;

    #[async_trait::async_trait]
    impl SummaryClient for CannedClient {
        async fn generate(&self, _prompt: &str) -> SummaryResult<String> {
            Ok("summary text".to_string())
        }
    }

    fn setup(temp_dir: &TempDir) -> (Arc<FileStorage>, DailySummaryTask) {
        let storage = Arc::new(FileStorage::new(
            &temp_dir.path().join("data"),
            &temp_dir.path().join("summaries"),
        ));
        let generator = Arc::new(Generator::new(
            storage.clone(),
            Arc::new(CannedClient),
            None,
        ));
        let task = DailySummaryTask::new(storage.clone(), generator, "00:05");
        (storage, task)
    }

    async fn add_entry(storage: &FileStorage, y: i32, mo: u32, d: u32) {
        storage
            .save_entry(WorkEntry {
                timestamp: Local.with_ymd_and_hms(y, mo, d, 10, 0, 0).unwrap(),
                content: "worked".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn no_backlog_delays_to_next_anchor() {
        let temp_dir = TempDir::new().unwrap();
        let (_, task) = setup(&temp_dir);

        let now = Local.with_ymd_and_hms(2026, 6, 2, 0, 10, 0).unwrap();
        let config = TaskConfig::daily(DAILY_SUMMARY_TASK_ID, "Daily summary", "00:05");
        match task.should_run(now, &config).await {
            Decision::Reschedule(next) => {
                assert_eq!(next, Local.with_ymd_and_hms(2026, 6, 3, 0, 5, 0).unwrap());
            }
            other => panic!("expected reschedule, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn backlog_is_generated_oldest_first() {
        let temp_dir = TempDir::new().unwrap();
        let (storage, task) = setup(&temp_dir);

        // Two past days and today; today must be left alone.
        add_entry(&storage, 2026, 6, 1).await;
        add_entry(&storage, 2026, 6, 2).await;
        add_entry(&storage, 2026, 6, 3).await;

        let now = Local.with_ymd_and_hms(2026, 6, 3, 0, 10, 0).unwrap();
        let config = TaskConfig::daily(DAILY_SUMMARY_TASK_ID, "Daily summary", "00:05");
        assert_eq!(task.should_run(now, &config).await, Decision::Run);

        task.execute().await.unwrap();

        let d1 = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 6, 2).unwrap();
        let d3 = NaiveDate::from_ymd_opt(2026, 6, 3).unwrap();
        assert!(storage.summary(d1).await.unwrap().is_some());
        assert!(storage.summary(d2).await.unwrap().is_some());
        assert!(storage.summary(d3).await.unwrap().is_none());
        assert!(storage.daily_data(d1).await.unwrap().summary_generated);
        assert!(storage.daily_data(d2).await.unwrap().summary_generated);

        // Once generated the backlog is empty again.
        match task.should_run(now, &config).await {
            Decision::Reschedule(_) => {}
            other => panic!("expected reschedule, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn partial_failure_still_succeeds() {
        struct FlakyClient {
            calls: std::sync::Mutex<usize>,
        }

        #[async_trait::async_trait]
        impl SummaryClient for FlakyClient {
            async fn generate(&self, _prompt: &str) -> SummaryResult<String> {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                if *calls == 1 {
                    Err(crate::summary::SummaryError::Command("flaky".to_string()))
                } else {
                    Ok("summary".to_string())
                }
            }
        }

        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(FileStorage::new(
            &temp_dir.path().join("data"),
            &temp_dir.path().join("summaries"),
        ));
        let generator = Arc::new(Generator::new(
            storage.clone(),
            Arc::new(FlakyClient {
                calls: std::sync::Mutex::new(0),
            }),
            None,
        ));
        let task = DailySummaryTask::new(storage.clone(), generator, "00:05");

        add_entry(&storage, 2026, 6, 1).await;
        add_entry(&storage, 2026, 6, 2).await;

        let now = Local.with_ymd_and_hms(2026, 6, 3, 0, 10, 0).unwrap();
        let config = TaskConfig::daily(DAILY_SUMMARY_TASK_ID, "Daily summary", "00:05");
        assert_eq!(task.should_run(now, &config).await, Decision::Run);

        // One of two days failed; the run as a whole still counts.
        task.execute().await.unwrap();

        let d2 = NaiveDate::from_ymd_opt(2026, 6, 2).unwrap();
        assert!(storage.summary(d2).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn on_executed_schedules_tomorrow() {
        let temp_dir = TempDir::new().unwrap();
        let (_, task) = setup(&temp_dir);

        let mut config = TaskConfig::daily(DAILY_SUMMARY_TASK_ID, "Daily summary", "00:05");
        let now = Local.with_ymd_and_hms(2026, 6, 3, 0, 10, 0).unwrap();
        task.on_executed(now, &mut config, None);

        assert_eq!(
            config.next_run,
            Some(Local.with_ymd_and_hms(2026, 6, 4, 0, 5, 0).unwrap())
        );
    }
}
