//! Periodic work journal reminder.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Duration, Local};
use tracing::{info, warn};

use crate::dialog::Dialog;
use crate::scheduler::{Decision, Task, TaskConfig, timing};
use crate::storage::{DailyData, Storage, WorkEntry};

use super::REMINDER_TASK_ID;

/// Prompts the user for what they worked on since the last entry.
pub struct ReminderTask {
    dialog: Arc<dyn Dialog>,
    storage: Arc<dyn Storage>,
}

impl ReminderTask {
    pub fn new(dialog: Arc<dyn Dialog>, storage: Arc<dyn Storage>) -> Self {
        Self { dialog, storage }
    }

    fn interval_minutes(config: &TaskConfig) -> u32 {
        config.interval_minutes.unwrap_or(60).max(1)
    }
}

#[async_trait::async_trait]
impl Task for ReminderTask {
    fn id(&self) -> &str {
        REMINDER_TASK_ID
    }

    fn name(&self) -> &str {
        "Work journal reminder"
    }

    async fn should_run(&self, now: DateTime<Local>, config: &TaskConfig) -> Decision {
        let interval = Self::interval_minutes(config);

        // After a long gap (system sleep, downtime) the missed prompt is
        // stale; asking "what did you just do" hours later only annoys.
        // Skip it and realign to the next slot instead.
        if let Some(next_run) = config.next_run {
            let delay = now - next_run;
            let max_delay = Duration::minutes(i64::from(interval / 2));
            if delay > max_delay {
                warn!(
                    task_id = %config.id,
                    delay_minutes = delay.num_minutes(),
                    "Reminder overdue past tolerance, realigning"
                );
                return Decision::Reschedule(timing::next_interval_run(now, interval));
            }
        }
        Decision::Run
    }

    async fn execute(&self) -> anyhow::Result<()> {
        let now = Local::now();
        let message = match self.storage.daily_data(now.date_naive()).await {
            Ok(day) => build_prompt_message(now, &day),
            Err(e) => {
                warn!(error = %e, "Could not load today's entries for the prompt");
                format!("What are you working on? (current time: {})", now.format("%H:%M"))
            }
        };

        let Some(content) = self.dialog.show_input("Work journal", &message).await? else {
            info!("Reminder dismissed");
            return Ok(());
        };
        if content.is_empty() {
            info!("Empty reminder input, nothing recorded");
            return Ok(());
        }

        self.storage
            .save_entry(WorkEntry {
                timestamp: now,
                content: content.clone(),
            })
            .await?;
        info!(content = %content, "Work entry recorded");
        Ok(())
    }

    fn on_executed(
        &self,
        now: DateTime<Local>,
        config: &mut TaskConfig,
        error: Option<&anyhow::Error>,
    ) {
        config.record_outcome(now, error);
        config.next_run = Some(timing::next_interval_run(now, Self::interval_minutes(config)));
    }
}

/// Dialog body: current time plus today's entries so far.
fn build_prompt_message(now: DateTime<Local>, day: &DailyData) -> String {
    let mut message = format!("Current time: {}\n\n", now.format("%H:%M"));
    if day.entries.is_empty() {
        message.push_str("No entries recorded today yet.\n\n");
    } else {
        message.push_str("Recorded today:\n\n");
        for entry in &day.entries {
            let _ = writeln!(
                message,
                "  {}  {}",
                entry.timestamp.format("%H:%M"),
                entry.content
            );
        }
        message.push('\n');
    }
    message.push_str("What have you been working on?");
    message
}
