//! Summary generation.
//!
//! A [`SummaryClient`] turns a prompt into markdown text (normally by
//! shelling out to an AI CLI); the [`Generator`] assembles prompts from
//! journal data, stores the results and notifies the user.

mod command;
mod generator;

pub use command::CommandClient;
pub use generator::Generator;

use thiserror::Error;

/// Errors from summary generation.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// Nothing to summarize.
    #[error("no work entries for {0}")]
    NoEntries(chrono::NaiveDate),

    /// No daily summaries exist for the requested week.
    #[error("no daily summaries for week {start} to {end}")]
    EmptyWeek {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    /// The generation command failed.
    #[error("summary command failed: {0}")]
    Command(String),

    /// Underlying storage failure.
    #[error(transparent)]
    Storage(#[from] crate::storage::StorageError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for summary operations.
pub type Result<T> = std::result::Result<T, SummaryError>;

/// Turns a prompt into generated markdown.
#[async_trait::async_trait]
pub trait SummaryClient: Send + Sync {
    /// Generate text for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
