//! The `list` subcommand: print today's entries.

use anyhow::{Context, Result};
use chrono::Local;

use crate::config::Config;
use crate::storage::{FileStorage, Storage};

pub async fn run_list(config: Config) -> Result<()> {
    let storage = FileStorage::new(&config.data_dir(), &config.summary_dir());
    let today = Local::now().date_naive();
    let day = storage.daily_data(today).await.context("load today's data")?;

    if day.entries.is_empty() {
        println!("No entries recorded today.");
        return Ok(());
    }

    println!("Work journal for {}:\n", today);
    for entry in &day.entries {
        println!("  {}  {}", entry.timestamp.format("%H:%M"), entry.content);
    }
    println!("\n{} entries", day.entries.len());
    Ok(())
}
