//! Concrete recurring tasks.
//!
//! Each task implements [`crate::scheduler::Task`] and owns its own
//! scheduling rules beyond the engine's coarse `next_run` check.

mod daily_summary;
mod log_rotate;
mod reminder;
mod weekly_summary;

pub use daily_summary::DailySummaryTask;
pub use log_rotate::LogRotateTask;
pub use reminder::ReminderTask;
pub use weekly_summary::WeeklySummaryTask;

/// Registry id of the reminder task.
pub const REMINDER_TASK_ID: &str = "work-reminder";
/// Registry id of the daily summary task.
pub const DAILY_SUMMARY_TASK_ID: &str = "daily-summary";
/// Registry id of the weekly summary task.
pub const WEEKLY_SUMMARY_TASK_ID: &str = "weekly-summary";
/// Registry id of the log rotation task.
pub const LOG_ROTATE_TASK_ID: &str = "log-rotate";
