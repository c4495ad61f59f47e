//! Prompt assembly and summary orchestration.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tracing::{info, warn};

use crate::dialog::Dialog;
use crate::storage::Storage;

use super::{Result, SummaryClient, SummaryError};

/// Generates daily and weekly summaries from journal data.
pub struct Generator {
    storage: Arc<dyn Storage>,
    client: Arc<dyn SummaryClient>,
    notifier: Option<Arc<dyn Dialog>>,
}

impl Generator {
    pub fn new(
        storage: Arc<dyn Storage>,
        client: Arc<dyn SummaryClient>,
        notifier: Option<Arc<dyn Dialog>>,
    ) -> Self {
        Self {
            storage,
            client,
            notifier,
        }
    }

    /// Generate and store the summary for one day.
    ///
    /// A day with no entries is an error; callers decide whether that is
    /// worth surfacing.
    pub async fn generate_daily(&self, date: NaiveDate) -> Result<()> {
        let day = self.storage.daily_data(date).await?;
        if day.entries.is_empty() {
            return Err(SummaryError::NoEntries(date));
        }

        let prompt = build_daily_prompt(&day);
        let summary = self.client.generate(&prompt).await?;
        self.storage.save_summary(date, &summary).await?;

        info!(date = %date, entries = day.entries.len(), "Daily summary generated");
        self.notify(
            "Daily summary ready",
            &format!("Work summary for {} has been generated", date),
        )
        .await;
        Ok(())
    }

    /// Generate and store the summary for the week ending on `week_end`.
    pub async fn generate_weekly(&self, week_end: NaiveDate) -> Result<()> {
        let week_start = week_end - chrono::Duration::days(6);
        let summaries = self
            .storage
            .daily_summaries_in_range(week_start, week_end)
            .await?;
        if summaries.is_empty() {
            return Err(SummaryError::EmptyWeek {
                start: week_start,
                end: week_end,
            });
        }

        let prompt = build_weekly_prompt(week_start, week_end, &summaries);
        let summary = self.client.generate(&prompt).await?;
        self.storage.save_weekly_summary(week_end, &summary).await?;

        info!(week_end = %week_end, days = summaries.len(), "Weekly summary generated");
        self.notify(
            "Weekly summary ready",
            &format!("Summary for {} to {} has been generated", week_start, week_end),
        )
        .await;
        Ok(())
    }

    /// Best effort: a failed notification never fails the generation.
    async fn notify(&self, title: &str, message: &str) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        if let Err(e) = notifier.show_notification(title, message).await {
            warn!(error = %e, "Failed to send notification");
        }
    }
}

fn build_daily_prompt(day: &crate::storage::DailyData) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Write a structured work summary for the following journal entries ({}).\n",
        day.date
    );
    let _ = writeln!(
        prompt,
        "Entries (each one covers the time window since the previous entry):\n"
    );
    for entry in &day.entries {
        let _ = writeln!(
            prompt,
            "- **{}**: {}",
            entry.timestamp.format("%H:%M"),
            entry.content
        );
    }
    prompt.push_str(
        "\nUse this structure:\n\
         ## Completed tasks\n\
         (group by project or module, with rough time spent)\n\n\
         ## Key progress\n\
         (highlight important results)\n\n\
         ## Problems encountered\n\
         (only if the entries mention any)\n\n\
         ## Plan for tomorrow\n\
         (only if the entries mention one)\n",
    );
    prompt
}

fn build_weekly_prompt(
    week_start: NaiveDate,
    week_end: NaiveDate,
    summaries: &[(NaiveDate, String)],
) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Write a weekly report based on these daily summaries ({} to {}).\n",
        week_start, week_end
    );
    prompt.push_str("## Daily summaries\n\n");

    let mut date = week_start;
    while date <= week_end {
        let _ = writeln!(prompt, "### {} ({})\n", date, date.weekday());
        match summaries.iter().find(|(d, _)| *d == date) {
            Some((_, summary)) => {
                prompt.push_str(summary);
                prompt.push_str("\n\n");
            }
            None => prompt.push_str("*(no journal entries that day)*\n\n"),
        }
        match date.succ_opt() {
            Some(d) => date = d,
            None => break,
        }
    }

    prompt.push_str(
        "---\n\n\
         Produce a structured weekly report with these sections:\n\n\
         ## Completed this week\n\
         (grouped by project or module)\n\n\
         ## Key progress and results\n\
         (milestones and highlights)\n\n\
         ## Problems and resolutions\n\n\
         ## Plan for next week\n",
    );
    prompt
}
