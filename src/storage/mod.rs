//! Work journal storage.
//!
//! Entries are grouped by local calendar day; each day is one JSON
//! document. Generated summaries are plain markdown files kept next to
//! the data so the user can read them directly.

mod file;

pub use file::FileStorage;

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the journal storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A day document could not be parsed.
    #[error("corrupt day file {0}: {1}")]
    CorruptDay(NaiveDate, String),

    /// Serialization failure.
    #[error("serialize: {0}")]
    Serialize(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// One journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkEntry {
    /// When the entry was recorded.
    pub timestamp: DateTime<Local>,
    /// What the user wrote.
    pub content: String,
}

/// All journal data for one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyData {
    /// The day this document covers.
    pub date: NaiveDate,
    /// Entries in recording order.
    #[serde(default)]
    pub entries: Vec<WorkEntry>,
    /// Whether a daily summary has been generated for this day.
    #[serde(default)]
    pub summary_generated: bool,
}

impl DailyData {
    /// Empty document for a day.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            entries: Vec::new(),
            summary_generated: false,
        }
    }
}

/// Durable journal storage.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// Append an entry to its day's document.
    async fn save_entry(&self, entry: WorkEntry) -> Result<()>;

    /// All data for one day. A missing day yields an empty document.
    async fn daily_data(&self, date: NaiveDate) -> Result<DailyData>;

    /// The most recently recorded entry across all days, if any.
    async fn last_entry(&self) -> Result<Option<WorkEntry>>;

    /// Days strictly before `before` that have entries but no generated
    /// summary yet, in ascending date order.
    async fn ungenerated_dates(&self, before: NaiveDate) -> Result<Vec<NaiveDate>>;

    /// Mark a day's summary as generated.
    async fn mark_summary_generated(&self, date: NaiveDate) -> Result<()>;

    /// Write the markdown summary for a day.
    async fn save_summary(&self, date: NaiveDate, content: &str) -> Result<()>;

    /// Read the markdown summary for a day, if present.
    async fn summary(&self, date: NaiveDate) -> Result<Option<String>>;

    /// Daily summaries for each day in `start..=end`, in date order,
    /// skipping days without one.
    async fn daily_summaries_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, String)>>;

    /// Write the markdown summary for the week ending on `week_end`.
    async fn save_weekly_summary(&self, week_end: NaiveDate, content: &str) -> Result<()>;
}
