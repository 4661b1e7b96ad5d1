// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The opaque evaluation engine seam.

use crate::hub::ProgressFn;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use vet_core::{JobError, JobRequest};

/// Failure surfaced by an engine invocation.
///
/// The optional `code` is engine-provided; the manager substitutes its own
/// default (`EVALUATION_ERROR` / `REMEDIATION_ERROR`) when absent.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
    pub code: Option<String>,
    pub details: Option<String>,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            details: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Normalize into the error recorded on the failed job.
    pub fn into_job_error(self, default_code: &str) -> JobError {
        let mut error = JobError::new(
            self.message,
            self.code.unwrap_or_else(|| default_code.to_string()),
        );
        if let Some(details) = self.details {
            error = error.with_details(details);
        }
        error
    }
}

/// The analysis engine, invoked once per job.
///
/// Implementations may call the progress callback any number of times from
/// any task before returning. The request payload is opaque to the
/// orchestration core and reaches the engine verbatim.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn run(&self, request: JobRequest, progress: ProgressFn) -> Result<Value, EngineError>;
}
