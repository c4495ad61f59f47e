//! Weekly summary generation.
//!
//! Runs on a configured weekday after an anchor time and summarizes the
//! week that ended on the most recent Sunday. The ISO week key of the
//! last generated report is persisted in the task's data so a restart on
//! the same day cannot produce a duplicate.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Local, Weekday};
use tracing::info;

use crate::scheduler::{Decision, Task, TaskConfig, TaskData, timing};
use crate::summary::Generator;

use super::WEEKLY_SUMMARY_TASK_ID;

/// Generates one report per ISO week.
pub struct WeeklySummaryTask {
    generator: Arc<Generator>,
    weekday: Weekday,
    anchor: String,
}

impl WeeklySummaryTask {
    /// `weekday` is 1=Monday .. 7=Sunday; `anchor` is "HH:MM".
    pub fn new(generator: Arc<Generator>, weekday: u8, anchor: &str) -> Self {
        Self {
            generator,
            weekday: timing::weekday_from_number(weekday),
            anchor: anchor.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Task for WeeklySummaryTask {
    fn id(&self) -> &str {
        WEEKLY_SUMMARY_TASK_ID
    }

    fn name(&self) -> &str {
        "Weekly summary"
    }

    async fn should_run(&self, now: DateTime<Local>, config: &TaskConfig) -> Decision {
        if now.weekday() != self.weekday {
            return Decision::Skip;
        }

        // Already generated for this ISO week.
        let current_week = timing::iso_week_key(now);
        if let Some(TaskData::Weekly {
            last_generated_week,
        }) = &config.data
        {
            if *last_generated_week == current_week {
                return Decision::Skip;
            }
        }

        let (hour, minute) = timing::parse_hhmm(&self.anchor).unwrap_or((9, 0));
        match timing::local_at(now.date_naive(), hour, minute) {
            Some(anchor) if now > anchor => Decision::Run,
            _ => Decision::Skip,
        }
    }

    async fn execute(&self) -> anyhow::Result<()> {
        let now = Local::now();
        // The report covers the week ending on the most recent Sunday.
        // Sunday itself reports on the week before.
        let mut days_back = i64::from(now.weekday().num_days_from_sunday());
        if days_back == 0 {
            days_back = 7;
        }
        let week_end = now.date_naive() - Duration::days(days_back);

        info!(week_end = %week_end, "Generating weekly summary");
        self.generator.generate_weekly(week_end).await?;
        Ok(())
    }

    fn on_executed(
        &self,
        now: DateTime<Local>,
        config: &mut TaskConfig,
        error: Option<&anyhow::Error>,
    ) {
        config.record_outcome(now, error);
        if error.is_none() {
            config.data = Some(TaskData::Weekly {
                last_generated_week: timing::iso_week_key(now),
            });
        }
        config.next_run = Some(timing::next_weekly_run(now, self.weekday, &self.anchor));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FileStorage;
    use crate::summary::{Result as SummaryResult, SummaryClient};
    use chrono::TimeZone;
    use tempfile::TempDir;

    struct CannedClient;

    #[async_trait::async_trait]
    impl SummaryClient for CannedClient {
        async fn generate(&self, _prompt: &str) -> SummaryResult<String> {
            Ok("weekly report".to_string())
        }
    }

    fn task(temp_dir: &TempDir, weekday: u8, anchor: &str) -> WeeklySummaryTask {
        let storage = Arc::new(FileStorage::new(
            &temp_dir.path().join("data"),
            &temp_dir.path().join("summaries"),
        ));
        let generator = Arc::new(Generator::new(storage, Arc::new(CannedClient), None));
        WeeklySummaryTask::new(generator, weekday, anchor)
    }

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn config() -> TaskConfig {
        TaskConfig::daily(WEEKLY_SUMMARY_TASK_ID, "Weekly summary", "09:00")
    }

    // 2026-06-01 is a Monday in ISO week 2026-W23.

    #[tokio::test]
    async fn wrong_weekday_skips() {
        let temp_dir = TempDir::new().unwrap();
        let task = task(&temp_dir, 1, "09:00");

        // Tuesday.
        let decision = task.should_run(local(2026, 6, 2, 10, 0), &config()).await;
        assert_eq!(decision, Decision::Skip);
    }

    #[tokio::test]
    async fn before_anchor_skips() {
        let temp_dir = TempDir::new().unwrap();
        let task = task(&temp_dir, 1, "09:00");

        let decision = task.should_run(local(2026, 6, 1, 8, 30), &config()).await;
        assert_eq!(decision, Decision::Skip);
    }

    #[tokio::test]
    async fn right_day_after_anchor_runs() {
        let temp_dir = TempDir::new().unwrap();
        let task = task(&temp_dir, 1, "09:00");

        let decision = task.should_run(local(2026, 6, 1, 9, 30), &config()).await;
        assert_eq!(decision, Decision::Run);
    }

    #[tokio::test]
    async fn same_week_never_generates_twice() {
        let temp_dir = TempDir::new().unwrap();
        let task = task(&temp_dir, 1, "09:00");

        let mut config = config();
        config.data = Some(TaskData::Weekly {
            last_generated_week: "2026-W23".to_string(),
        });

        let decision = task.should_run(local(2026, 6, 1, 9, 30), &config).await;
        assert_eq!(decision, Decision::Skip);

        // Next week's Monday is a different key and runs again.
        let decision = task.should_run(local(2026, 6, 8, 9, 30), &config).await;
        assert_eq!(decision, Decision::Run);
    }

    #[tokio::test]
    async fn success_stamps_the_week_and_schedules_next() {
        let temp_dir = TempDir::new().unwrap();
        let task = task(&temp_dir, 1, "09:00");

        let mut config = config();
        let now = local(2026, 6, 1, 9, 30);
        task.on_executed(now, &mut config, None);

        assert_eq!(
            config.data,
            Some(TaskData::Weekly {
                last_generated_week: "2026-W23".to_string()
            })
        );
        assert_eq!(config.next_run, Some(local(2026, 6, 8, 9, 0)));
    }

    #[tokio::test]
    async fn failure_leaves_week_unstamped() {
        let temp_dir = TempDir::new().unwrap();
        let task = task(&temp_dir, 1, "09:00");

        let mut config = config();
        let now = local(2026, 6, 1, 9, 30);
        let err = anyhow::anyhow!("generation failed");
        task.on_executed(now, &mut config, Some(&err));

        // No stamp, so the next dispatch on the same day retries.
        assert!(config.data.is_none());
        assert_eq!(config.last_error.as_deref(), Some("generation failed"));
    }
}
