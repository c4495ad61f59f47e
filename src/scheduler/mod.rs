//! Restart-safe task scheduling engine.
//!
//! The scheduler persists every task's schedule and runtime state in a
//! single JSON registry so that a restart resumes exactly where the
//! previous process left off. Dispatch is two-staged: the engine does a
//! coarse `next_run` check, then each task applies its own rules and may
//! run, skip, or push itself to a later slot.

pub mod error;
pub mod registry;
pub mod service;
pub mod task;
pub mod timing;

pub use error::{Result, SchedulerError};
pub use registry::Registry;
pub use service::{
    SchedulerHandle, SchedulerService, TaskBootstrap, WeeklyBootstrap, write_reset_signal,
};
pub use task::{Decision, Task, TaskConfig, TaskData, TaskId, TaskRegistry, TaskType};
