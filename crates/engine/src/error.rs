// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for job admission and batches.

use thiserror::Error;

/// Synchronous submission failures. No job record is created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("queue full: {active} active jobs (max {max})")]
    QueueFull { active: usize, max: usize },
}

impl SubmitError {
    /// Stable error code surfaced to callers.
    pub fn code(&self) -> &'static str {
        match self {
            SubmitError::QueueFull { .. } => "QUEUE_FULL",
        }
    }
}

/// Batch submission failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("batch contains no URLs")]
    Empty,
}
