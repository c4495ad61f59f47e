//! Size-based log rotation.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::scheduler::{Decision, Task, TaskConfig, timing};

use super::LOG_ROTATE_TASK_ID;

/// Fallback cadence when the registry entry carries no interval.
const DEFAULT_INTERVAL_MINUTES: u32 = 180;

/// Rotates log files that outgrow a size cap. Keeps a single `.old`
/// generation per file.
pub struct LogRotateTask {
    files: Vec<PathBuf>,
    max_size_mb: u64,
}

impl LogRotateTask {
    /// A `max_size_mb` of zero disables rotation.
    pub fn new(files: Vec<PathBuf>, max_size_mb: u64) -> Self {
        Self { files, max_size_mb }
    }

    async fn rotate_if_needed(&self, path: &PathBuf) -> std::io::Result<bool> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };

        let size_mb = metadata.len() / (1024 * 1024);
        if size_mb <= self.max_size_mb {
            return Ok(false);
        }

        let mut backup = path.clone().into_os_string();
        backup.push(".old");
        tokio::fs::rename(path, &backup).await?;
        info!(path = %path.display(), size_mb, "Log file rotated");
        Ok(true)
    }
}

#[async_trait::async_trait]
impl Task for LogRotateTask {
    fn id(&self) -> &str {
        LOG_ROTATE_TASK_ID
    }

    fn name(&self) -> &str {
        "Log rotation"
    }

    async fn should_run(&self, _now: DateTime<Local>, _config: &TaskConfig) -> Decision {
        // No rules beyond the engine's due check; rotation is idempotent.
        Decision::Run
    }

    async fn execute(&self) -> anyhow::Result<()> {
        if self.max_size_mb == 0 {
            return Ok(());
        }

        let mut rotated = 0usize;
        let mut failures = Vec::new();
        for path in &self.files {
            match self.rotate_if_needed(path).await {
                Ok(true) => rotated += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Rotation failed");
                    failures.push(format!("{}: {}", path.display(), e));
                }
            }
        }

        if rotated > 0 {
            info!(rotated, "Log rotation completed");
        }
        if !failures.is_empty() {
            anyhow::bail!("log rotation errors: {}", failures.join("; "));
        }
        Ok(())
    }

    fn on_executed(
        &self,
        now: DateTime<Local>,
        config: &mut TaskConfig,
        error: Option<&anyhow::Error>,
    ) {
        config.record_outcome(now, error);
        let interval = config
            .interval_minutes
            .unwrap_or(DEFAULT_INTERVAL_MINUTES)
            .max(1);
        config.next_run = Some(timing::next_interval_run(now, interval));
    }
}
