//! User-facing dialogs.
//!
//! The daemon talks to the user through native desktop dialogs; the
//! [`Dialog`] trait keeps that behind a seam so tasks stay testable
//! without a display server.

mod osascript;

pub use osascript::OsaScriptDialog;

use thiserror::Error;

/// Errors from the dialog layer.
#[derive(Debug, Error)]
pub enum DialogError {
    /// The user did not respond before the configured timeout.
    #[error("dialog timed out after {0} seconds")]
    Timeout(u64),

    /// The dialog script failed.
    #[error("dialog script failed: {0}")]
    Script(String),

    /// I/O error launching the script.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for dialog operations.
pub type Result<T> = std::result::Result<T, DialogError>;

/// Desktop dialog capability.
#[async_trait::async_trait]
pub trait Dialog: Send + Sync {
    /// Prompt the user for a line of text.
    ///
    /// `Ok(None)` means the user cancelled; that is a normal outcome,
    /// not an error.
    async fn show_input(&self, title: &str, prompt: &str) -> Result<Option<String>>;

    /// Show a passive notification. Failures are the caller's to ignore.
    async fn show_notification(&self, title: &str, message: &str) -> Result<()>;
}
