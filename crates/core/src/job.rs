// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job record and lifecycle state machine.

use crate::request::JobRequest;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a job instance.
    ///
    /// Each submitted evaluation or remediation gets a unique ID that can be
    /// used to query its status, stream its progress, and reference it in
    /// persisted results.
    pub struct JobId;
}

/// Lifecycle status of a job.
///
/// The progression is strictly linear: `queued → running → completed | failed`.
/// Terminal states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Admitted, waiting for a dispatcher slot
    Queued,
    /// Engine invocation in flight
    Running,
    /// Engine returned a result
    Completed,
    /// Engine threw, or the job was cancelled while queued
    Failed,
}

impl JobStatus {
    /// Check if this status is terminal (completed or failed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Check if this status counts against the admission cap (queued or running).
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Running)
    }
}

crate::simple_display! {
    JobStatus {
        Queued => "queued",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

/// Error recorded on a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobError {
    pub message: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl JobError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Copy without the details field, for event envelopes.
    pub fn brief(&self) -> Self {
        Self {
            message: self.message.clone(),
            code: self.code.clone(),
            details: None,
        }
    }
}

/// Severity of a log tail entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
}

crate::simple_display! {
    LogLevel {
        Info => "info",
        Warning => "warning",
        Error => "error",
        Success => "success",
    }
}

/// One entry in a job's bounded log tail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: u64,
    #[serde(rename = "type")]
    pub level: LogLevel,
    pub message: String,
}

/// Snapshot of evaluation progress, updated from engine events.
///
/// `completed_evaluators` tracks the index of the most recent
/// `evaluator.progress` event (last-write-wins — it can appear to jitter
/// when the engine runs evaluators in parallel).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_evaluator: Option<String>,
    #[serde(default)]
    pub completed_evaluators: u32,
    #[serde(default)]
    pub total_evaluators: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
    #[serde(default)]
    pub total_files: u32,
    #[serde(default)]
    pub completed_files: u32,
}

/// A job record — one engine invocation on one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub request: JobRequest,
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<u64>,
    pub updated_at: u64,
    #[serde(default)]
    pub progress: Progress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    /// Current remediation step, set from `remediation.step` events.
    /// Always `None` for evaluation jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
}

impl Job {
    /// Create a freshly-queued job.
    pub fn new(id: impl Into<String>, request: JobRequest, now_ms: u64) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Queued,
            request,
            created_at: now_ms,
            started_at: None,
            completed_at: None,
            failed_at: None,
            updated_at: now_ms,
            progress: Progress::default(),
            result: None,
            error: None,
            logs: Vec::new(),
            current_step: None,
        }
    }

    /// Check if the job is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Check if the job is queued or running
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Milliseconds spent running, for terminal jobs.
    ///
    /// Derived from the terminal timestamp and `started_at`; zero when the
    /// job never started (e.g. cancelled while queued).
    pub fn duration_ms(&self) -> u64 {
        let end = match self.status {
            JobStatus::Completed => self.completed_at,
            JobStatus::Failed => self.failed_at,
            _ => None,
        };
        match (end, self.started_at) {
            (Some(end), Some(start)) => end.saturating_sub(start),
            _ => 0,
        }
    }
}

/// Job counts by status, as reported by the store and the health route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub active: usize,
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            id: String = "job-1",
        }
        set {
            status: JobStatus = JobStatus::Queued,
            request: JobRequest = JobRequest::default(),
            created_at: u64 = 1_000_000,
            updated_at: u64 = 1_000_000,
            progress: Progress = Progress::default(),
            logs: Vec<LogEntry> = Vec::new(),
        }
        option {
            started_at: u64 = None,
            completed_at: u64 = None,
            failed_at: u64 = None,
            result: serde_json::Value = None,
            error: JobError = None,
            current_step: String = None,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
