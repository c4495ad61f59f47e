//! Summary generation via an external CLI.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{Result, SummaryClient, SummaryError};

/// Client that pipes the prompt to a configured command's stdin and reads
/// the generated summary from its stdout.
pub struct CommandClient {
    program: String,
    args: Vec<String>,
}

impl CommandClient {
    /// Build a client from a command line, e.g. `["claude", "-p"]`. The
    /// first element is the program, the rest are fixed arguments.
    pub fn new(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait::async_trait]
impl SummaryClient for CommandClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(program = %self.program, "Invoking summary command");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(prompt.as_bytes()).await?;
            // Close stdin so the command sees EOF.
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SummaryError::Command(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command_line_is_rejected() {
        assert!(CommandClient::new(&[]).is_none());
    }

    #[tokio::test]
    async fn pipes_prompt_through_command() {
        let client = CommandClient::new(&["cat".to_string()]).unwrap();
        let out = client.generate("hello summary").await.unwrap();
        assert_eq!(out, "hello summary");
    }

    #[tokio::test]
    async fn failing_command_reports_stderr() {
        let client = CommandClient::new(&[
            "sh".to_string(),
            "-c".to_string(),
            "echo nope >&2; exit 3".to_string(),
        ])
        .unwrap();
        let err = client.generate("prompt").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("nope"), "unexpected error: {msg}");
    }
}
