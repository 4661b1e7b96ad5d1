// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use vet_core::{JobError, JobStatus, Progress};
use yare::parameterized;

fn message(event: &ProgressEvent) -> String {
    format_event(event).map(|(_, m)| m).unwrap_or_default()
}

#[test]
fn job_started_line() {
    let event = ProgressEvent::JobStarted {
        mode: "full".into(),
        total_files: 3,
    };
    let (level, msg) = format_event(&event).unwrap();
    assert_eq!(level, LogLevel::Info);
    assert_eq!(msg, "Started evaluation (full mode, 3 file(s))");
}

#[test]
fn file_started_line() {
    let event = ProgressEvent::FileStarted {
        file_path: "src/lib.rs".into(),
    };
    assert_eq!(message(&event), "Processing src/lib.rs");
}

#[test]
fn evaluator_progress_with_file_uses_basename() {
    let event = ProgressEvent::EvaluatorProgress {
        evaluator_name: "security".into(),
        evaluator_index: 0,
        total_evaluators: 2,
        current_file: Some("deep/nested/main.rs".into()),
    };
    assert_eq!(message(&event), "Running security on main.rs (1/2)");
}

#[test]
fn evaluator_progress_without_file() {
    let event = ProgressEvent::EvaluatorProgress {
        evaluator_name: "security".into(),
        evaluator_index: 1,
        total_evaluators: 2,
        current_file: None,
    };
    assert_eq!(message(&event), "Running security (2/2)");
}

#[test]
fn retry_truncates_error_to_100_chars() {
    let event = ProgressEvent::EvaluatorRetry {
        evaluator_name: "security".into(),
        attempt: 2,
        max_attempts: 3,
        error: "x".repeat(250),
    };
    let (level, msg) = format_event(&event).unwrap();
    assert_eq!(level, LogLevel::Warning);
    assert_eq!(msg, format!("Retry 2/3 for security: {}", "x".repeat(100)));
}

#[test]
fn timeout_rounds_to_seconds() {
    let event = ProgressEvent::EvaluatorTimeout {
        evaluator_name: "perf".into(),
        timeout_ms: 29_600,
    };
    let (level, msg) = format_event(&event).unwrap();
    assert_eq!(level, LogLevel::Error);
    assert_eq!(msg, "Timeout: perf exceeded 30s limit");
}

#[parameterized(
    errors = { "error", "Curating top errors from 12 total..." },
    suggestions = { "suggestion", "Curating top suggestions from 12 total..." },
    other = { "style", "Curating top issues from 12 total..." },
)]
fn curation_started_labels(issue_type: &str, expected: &str) {
    let event = ProgressEvent::CurationStarted {
        issue_type: issue_type.into(),
        total_issues: 12,
    };
    assert_eq!(message(&event), expected);
}

#[test]
fn curation_completed_line() {
    let event = ProgressEvent::CurationCompleted {
        issue_type: "error".into(),
        curated_count: 5,
    };
    let (level, msg) = format_event(&event).unwrap();
    assert_eq!(level, LogLevel::Success);
    assert_eq!(msg, "Impact curation completed for errors (5 selected)");
}

#[test]
fn completed_rounds_duration() {
    let event = ProgressEvent::JobCompleted {
        job_id: "job-1".into(),
        result: json!({}),
        duration: 1234,
    };
    let (level, msg) = format_event(&event).unwrap();
    assert_eq!(level, LogLevel::Success);
    assert_eq!(msg, "Evaluation completed in 1s");
}

#[test]
fn failed_uses_message_or_placeholder() {
    let event = ProgressEvent::JobFailed {
        job_id: "job-1".into(),
        error: JobError::new("engine exploded", "EVALUATION_ERROR"),
    };
    assert_eq!(message(&event), "Evaluation failed: engine exploded");

    let blank = ProgressEvent::JobFailed {
        job_id: "job-1".into(),
        error: JobError::new("", "EVALUATION_ERROR"),
    };
    assert_eq!(message(&blank), "Evaluation failed: Unknown error");
}

#[test]
fn unlisted_events_are_not_logged() {
    assert!(format_event(&ProgressEvent::Connected {
        job_id: "job-1".into(),
        status: JobStatus::Running,
    })
    .is_none());
    assert!(format_event(&ProgressEvent::JobStatusChanged {
        status: JobStatus::Running,
        progress: Progress::default(),
        created_at: 0,
        started_at: Some(1),
        updated_at: 1,
    })
    .is_none());
    assert!(format_event(&ProgressEvent::RemediationStep {
        step: "apply-patch".into(),
    })
    .is_none());
    assert!(format_event(&ProgressEvent::FileCompleted {
        file_path: "a.rs".into(),
        total_files: None,
    })
    .is_none());
}
