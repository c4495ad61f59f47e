//! Application configuration.
//!
//! Loaded from a YAML file; a missing file yields the defaults so the
//! daemon can start with zero setup. Relative paths are resolved against
//! `work_dir`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base directory for all state. Relative paths below resolve
    /// against it.
    pub work_dir: PathBuf,
    /// Journal entry documents.
    pub data_dir: PathBuf,
    /// Generated markdown summaries.
    pub summary_dir: PathBuf,
    pub reminder: ReminderConfig,
    pub summary: SummaryConfig,
    pub dialog: DialogConfig,
    pub logging: LoggingConfig,
}

/// Reminder cadence.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Interval in hours.
    pub hourly_interval: u32,
    /// Interval in minutes; overrides `hourly_interval` when nonzero.
    pub minute_interval: u32,
}

/// Summary generation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Daily generation anchor, "HH:MM".
    pub time: String,
    /// Command line the prompt is piped to, e.g. `["claude", "-p"]`.
    pub command: Vec<String>,
    pub weekly: WeeklyConfig,
}

/// Weekly report settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeeklyConfig {
    pub enabled: bool,
    /// Target weekday, 1=Monday .. 7=Sunday.
    pub weekday: u8,
    /// Generation anchor, "HH:MM".
    pub time: String,
}

/// Dialog behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DialogConfig {
    /// How long an input prompt waits for the user, in seconds.
    pub timeout_seconds: u64,
}

/// Log rotation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Rotation threshold in MB; zero disables rotation.
    pub max_log_size_mb: u64,
    /// Log files to rotate, relative to `work_dir`.
    pub files: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            data_dir: PathBuf::from("data"),
            summary_dir: PathBuf::from("summaries"),
            reminder: ReminderConfig::default(),
            summary: SummaryConfig::default(),
            dialog: DialogConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            hourly_interval: 1,
            minute_interval: 0,
        }
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            time: "00:00".to_string(),
            command: vec!["claude".to_string(), "-p".to_string()],
            weekly: WeeklyConfig::default(),
        }
    }
}

impl Default for WeeklyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            weekday: 1,
            time: "09:00".to_string(),
        }
    }
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 300,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            max_log_size_mb: 50,
            files: Vec::new(),
        }
    }
}

impl Config {
    /// Load from a YAML file, falling back to defaults when the file does
    /// not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config: Self = serde_saphyr::from_str(&content)
            .with_context(|| format!("parse config {}", path.display()))?;
        Ok(config)
    }

    /// Effective reminder interval in minutes.
    pub fn reminder_interval_minutes(&self) -> u32 {
        if self.reminder.minute_interval > 0 {
            self.reminder.minute_interval
        } else if self.reminder.hourly_interval > 0 {
            self.reminder.hourly_interval * 60
        } else {
            60
        }
    }

    /// Runtime state directory (registry, lock, reset signal).
    pub fn run_dir(&self) -> PathBuf {
        self.work_dir.join("run")
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.work_dir.join(path)
        }
    }

    /// Journal data directory, resolved against `work_dir`.
    pub fn data_dir(&self) -> PathBuf {
        self.resolve(&self.data_dir)
    }

    /// Summary directory, resolved against `work_dir`.
    pub fn summary_dir(&self) -> PathBuf {
        self.resolve(&self.summary_dir)
    }

    /// Log files to rotate, resolved against `work_dir`.
    pub fn log_files(&self) -> Vec<PathBuf> {
        self.logging.files.iter().map(|p| self.resolve(p)).collect()
    }
}
