//! Task data model and the pluggable task contract.
//!
//! A [`TaskConfig`] is the persisted description of one recurring unit of
//! work; the [`Task`] trait is the capability contract concrete tasks
//! implement. The engine only reads the generic fields - task-specific
//! state lives in [`TaskData`] and is owned by the task that wrote it.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

// ============================================================================
// Persisted Data Model
// ============================================================================

/// Unique, stable identifier for a task. Never regenerated.
pub type TaskId = String;

/// Which time-arithmetic applies to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Fires every `interval_minutes`, minute-aligned.
    Interval,
    /// Fires at a fixed "HH:MM" wall-clock anchor.
    Daily,
    /// Fires once at `next_run` and is then done.
    Once,
}

/// Task-specific persisted state.
///
/// Each variant is owned exclusively by the task implementation that set
/// it; the generic engine never matches on its contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskData {
    /// State for the weekly summary task.
    Weekly {
        /// ISO week key ("YYYY-Www") of the last generated weekly summary.
        last_generated_week: String,
    },
}

/// Persisted configuration and runtime state of one recurring task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Unique identifier.
    pub id: TaskId,
    /// Display label.
    pub name: String,
    /// Schedule shape.
    #[serde(rename = "type")]
    pub kind: TaskType,
    /// Disabled tasks are never dispatched.
    pub enabled: bool,
    /// Interval in minutes, for `interval` tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_minutes: Option<u32>,
    /// "HH:MM" anchor, for `daily` tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// When the task is next eligible to fire. `None` means not yet
    /// scheduled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Local>>,
    /// When the task last executed (success or failure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Local>>,
    /// When the task last executed successfully.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_success: Option<DateTime<Local>>,
    /// Error message of the last failed execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Task-specific state, opaque to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<TaskData>,
}

impl TaskConfig {
    /// Create an interval task firing every `interval_minutes`.
    pub fn interval(id: &str, name: &str, interval_minutes: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: TaskType::Interval,
            enabled: true,
            interval_minutes: Some(interval_minutes),
            time: None,
            next_run: None,
            last_run: None,
            last_success: None,
            last_error: None,
            data: None,
        }
    }

    /// Create a daily task anchored at `time` ("HH:MM").
    pub fn daily(id: &str, name: &str, time: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: TaskType::Daily,
            enabled: true,
            interval_minutes: None,
            time: Some(time.to_string()),
            next_run: None,
            last_run: None,
            last_success: None,
            last_error: None,
            data: None,
        }
    }

    /// Record the outcome of an execution into the runtime fields.
    ///
    /// Does not touch `next_run` or `data`; those are the calling task's
    /// responsibility.
    pub fn record_outcome(&mut self, now: DateTime<Local>, error: Option<&anyhow::Error>) {
        self.last_run = Some(now);
        match error {
            Some(e) => self.last_error = Some(e.to_string()),
            None => {
                self.last_success = Some(now);
                self.last_error = None;
            }
        }
    }
}

/// Ordered collection of task configs, the unit of persistence.
///
/// Insertion order is preserved; ids are unique.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskRegistry {
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
}

impl TaskRegistry {
    /// Find a task config by id.
    pub fn find(&self, id: &str) -> Option<&TaskConfig> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Find a task config by id, mutably.
    pub fn find_mut(&mut self, id: &str) -> Option<&mut TaskConfig> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }
}

// ============================================================================
// Task Contract
// ============================================================================

/// Outcome of a task's fine-grained dispatch check.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Execute the task this cycle.
    Run,
    /// Do nothing this cycle.
    Skip,
    /// Do not run, but push `next_run` to the given time. Used when
    /// running now would be wrong (missed cycle after downtime, no
    /// qualifying data yet).
    Reschedule(DateTime<Local>),
}

/// A pluggable unit of recurring work.
///
/// The engine guarantees at most one concurrent invocation of `execute`
/// per task id. `on_executed` is always invoked afterwards, success or
/// failure, and is solely responsible for writing the runtime fields and
/// computing the next `next_run` - keeping scheduling math testable
/// without mocking side effects.
#[async_trait::async_trait]
pub trait Task: Send + Sync {
    /// Stable task id, matching the registry entry.
    fn id(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str;

    /// Fine-grained dispatch check, called only once the coarse
    /// `next_run` filter says the task is due.
    async fn should_run(&self, now: DateTime<Local>, config: &TaskConfig) -> Decision;

    /// Perform the side-effecting work.
    async fn execute(&self) -> anyhow::Result<()>;

    /// Update the config after an execution: runtime fields, task data
    /// and the next `next_run`.
    fn on_executed(&self, now: DateTime<Local>, config: &mut TaskConfig, error: Option<&anyhow::Error>);
}

// ============================================================================
// Tests
// ============================================================================
