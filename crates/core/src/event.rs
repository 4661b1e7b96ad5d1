// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress event envelopes.
//!
//! Every event serializes as `{"type": "<name>", "data": {...}}` — the shape
//! written verbatim onto server-push streams. The manager mints the job
//! lifecycle events; the rest are relayed from the engine.

use crate::job::{JobError, JobStatus, Progress};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events that flow from submission through the fan-out to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProgressEvent {
    /// First record written on every stream connection.
    #[serde(rename = "connected", rename_all = "camelCase")]
    Connected { job_id: String, status: JobStatus },

    /// Emitted when a job transitions to running.
    #[serde(rename = "job.status", rename_all = "camelCase")]
    JobStatusChanged {
        status: JobStatus,
        progress: Progress,
        created_at: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        started_at: Option<u64>,
        updated_at: u64,
    },

    /// Emitted on admission.
    #[serde(rename = "job.queued", rename_all = "camelCase")]
    JobQueued { job_id: String, request: Value },

    // -- engine relay --
    #[serde(rename = "job.started", rename_all = "camelCase")]
    JobStarted { mode: String, total_files: u32 },

    #[serde(rename = "file.started", rename_all = "camelCase")]
    FileStarted { file_path: String },

    #[serde(rename = "evaluator.progress", rename_all = "camelCase")]
    EvaluatorProgress {
        evaluator_name: String,
        evaluator_index: u32,
        total_evaluators: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_file: Option<String>,
    },

    #[serde(rename = "evaluator.retry", rename_all = "camelCase")]
    EvaluatorRetry {
        evaluator_name: String,
        attempt: u32,
        max_attempts: u32,
        error: String,
    },

    #[serde(rename = "evaluator.timeout", rename_all = "camelCase")]
    EvaluatorTimeout {
        evaluator_name: String,
        timeout_ms: u64,
    },

    #[serde(rename = "file.completed", rename_all = "camelCase")]
    FileCompleted {
        file_path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total_files: Option<u32>,
    },

    #[serde(rename = "curation.started", rename_all = "camelCase")]
    CurationStarted {
        issue_type: String,
        total_issues: u32,
    },

    #[serde(rename = "curation.completed", rename_all = "camelCase")]
    CurationCompleted {
        issue_type: String,
        curated_count: u32,
    },

    // -- terminal --
    #[serde(rename = "job.completed", rename_all = "camelCase")]
    JobCompleted {
        job_id: String,
        result: Value,
        /// Wall-clock run time in milliseconds.
        duration: u64,
    },

    #[serde(rename = "job.failed", rename_all = "camelCase")]
    JobFailed { job_id: String, error: JobError },

    // -- remediation --
    #[serde(rename = "remediation.started", rename_all = "camelCase")]
    RemediationStarted { job_id: String },

    #[serde(rename = "remediation.step", rename_all = "camelCase")]
    RemediationStep { step: String },

    #[serde(rename = "remediation.completed", rename_all = "camelCase")]
    RemediationCompleted {
        job_id: String,
        result: Value,
        duration: u64,
    },

    #[serde(rename = "remediation.failed", rename_all = "camelCase")]
    RemediationFailed { job_id: String, error: JobError },
}

impl ProgressEvent {
    /// The wire name of this event (`type` field of the envelope).
    pub fn name(&self) -> &'static str {
        match self {
            ProgressEvent::Connected { .. } => "connected",
            ProgressEvent::JobStatusChanged { .. } => "job.status",
            ProgressEvent::JobQueued { .. } => "job.queued",
            ProgressEvent::JobStarted { .. } => "job.started",
            ProgressEvent::FileStarted { .. } => "file.started",
            ProgressEvent::EvaluatorProgress { .. } => "evaluator.progress",
            ProgressEvent::EvaluatorRetry { .. } => "evaluator.retry",
            ProgressEvent::EvaluatorTimeout { .. } => "evaluator.timeout",
            ProgressEvent::FileCompleted { .. } => "file.completed",
            ProgressEvent::CurationStarted { .. } => "curation.started",
            ProgressEvent::CurationCompleted { .. } => "curation.completed",
            ProgressEvent::JobCompleted { .. } => "job.completed",
            ProgressEvent::JobFailed { .. } => "job.failed",
            ProgressEvent::RemediationStarted { .. } => "remediation.started",
            ProgressEvent::RemediationStep { .. } => "remediation.step",
            ProgressEvent::RemediationCompleted { .. } => "remediation.completed",
            ProgressEvent::RemediationFailed { .. } => "remediation.failed",
        }
    }

    /// Fold this event into a progress snapshot.
    ///
    /// Only `evaluator.progress` and `file.completed` mutate the snapshot.
    /// Evaluator updates are last-write-wins; under a parallel engine the
    /// current evaluator can jitter backwards. Returns true when mutated.
    pub fn apply_to(&self, progress: &mut Progress) -> bool {
        match self {
            ProgressEvent::EvaluatorProgress {
                evaluator_name,
                evaluator_index,
                total_evaluators,
                current_file,
            } => {
                progress.current_evaluator = Some(evaluator_name.clone());
                progress.completed_evaluators = *evaluator_index;
                progress.total_evaluators = *total_evaluators;
                if let Some(file) = current_file {
                    progress.current_file = Some(file.clone());
                }
                true
            }
            ProgressEvent::FileCompleted {
                file_path,
                total_files,
            } => {
                progress.current_file = Some(file_path.clone());
                progress.completed_files += 1;
                if let Some(total) = total_files {
                    progress.total_files = *total;
                }
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
