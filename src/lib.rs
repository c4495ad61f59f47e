//! Daylog - a work journal daemon with restart-safe task scheduling.
//!
//! Periodically prompts for short work-log entries and, on a schedule,
//! generates daily and weekly summaries from them. The scheduling engine
//! persists every decision so schedules survive restarts, system sleep,
//! and clock jumps without firing duplicate or missed work.

// ============================================================================
// Core Infrastructure
// ============================================================================

pub mod config;
pub mod lock;

// ============================================================================
// Scheduling Engine
// ============================================================================

pub mod scheduler;
pub mod tasks;

// ============================================================================
// Collaborators
// ============================================================================

pub mod dialog;
pub mod storage;
pub mod summary;

// ============================================================================
// CLI
// ============================================================================

pub mod commands;
