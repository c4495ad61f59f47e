//! The `popup` subcommand: prompt once via dialog and record the answer.

use std::fmt::Write as _;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::warn;

use crate::config::Config;
use crate::dialog::{Dialog, OsaScriptDialog};
use crate::storage::{FileStorage, Storage, WorkEntry};

use super::add::push_reminder_schedule;

pub async fn run_popup(config: Config) -> Result<()> {
    let storage = FileStorage::new(&config.data_dir(), &config.summary_dir());
    let dialog = OsaScriptDialog::new(Duration::from_secs(config.dialog.timeout_seconds));

    let now = Local::now();
    let day = storage
        .daily_data(now.date_naive())
        .await
        .context("load today's data")?;

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

    let Some(content) = dialog
        .show_input("Work journal", &message)
        .await
        .context("show dialog")?
    else {
        println!("Cancelled, nothing recorded.");
        return Ok(());
    };
    if content.is_empty() {
        println!("Empty input, nothing recorded.");
        return Ok(());
    }

    storage
        .save_entry(WorkEntry {
            timestamp: now,
            content: content.clone(),
        })
        .await
        .context("save entry")?;
    println!("Recorded: {} ({})", content, now.format("%H:%M"));

    if let Err(e) = push_reminder_schedule(&config).await {
        warn!(error = %e, "Could not update reminder schedule");
    }
    Ok(())
}
