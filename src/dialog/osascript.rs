//! Dialogs via `osascript` (macOS AppleScript runner).

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use super::{Dialog, DialogError, Result};

/// How long a passive notification dialog may stay on screen.
const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Dialogs rendered with `osascript -e 'display dialog ...'`.
pub struct OsaScriptDialog {
    timeout: Duration,
}

impl OsaScriptDialog {
    /// Create a dialog runner; `timeout` bounds how long an input prompt
    /// waits for the user.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run_script(&self, script: &str, timeout: Duration) -> Result<ScriptOutcome> {
        let child = Command::new("osascript")
            .arg("-e")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => return Err(DialogError::Timeout(timeout.as_secs())),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            return Ok(ScriptOutcome::Completed(stdout));
        }
        // osascript exits nonzero when the user dismisses the dialog.
        if stderr.contains("User canceled") {
            return Ok(ScriptOutcome::Cancelled);
        }
        Err(DialogError::Script(stderr.trim().to_string()))
    }
}

enum ScriptOutcome {
    Completed(String),
    Cancelled,
}

#[async_trait::async_trait]
impl Dialog for OsaScriptDialog {
    async fn show_input(&self, title: &str, prompt: &str) -> Result<Option<String>> {
        let script = format!(
            r#"display dialog "{}" default answer "" with title "{}" buttons {{"Cancel", "OK"}} default button "OK""#,
            escape(prompt),
            escape(title),
        );

        debug!(title = %title, "Showing input dialog");
        match self.run_script(&script, self.timeout).await? {
            ScriptOutcome::Completed(stdout) => Ok(Some(parse_text_returned(&stdout))),
            ScriptOutcome::Cancelled => Ok(None),
        }
    }

    async fn show_notification(&self, title: &str, message: &str) -> Result<()> {
        let script = format!(
            r#"display dialog "{}" with title "{}" buttons {{"OK"}} default button "OK" with icon note"#,
            escape(message),
            escape(title),
        );

        match self.run_script(&script, NOTIFICATION_TIMEOUT).await? {
            // Dismissing a notification is as good as acknowledging it.
            ScriptOutcome::Completed(_) | ScriptOutcome::Cancelled => Ok(()),
        }
    }
}

/// Escape a string for embedding in an AppleScript literal.
fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Extract the user's text from osascript output, which looks like
/// `button returned:OK, text returned:what the user typed`.
fn parse_text_returned(output: &str) -> String {
    match output.split_once("text returned:") {
        Some((_, text)) => text.trim().to_string(),
        None => String::new(),
    }
}
