// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human-readable log lines for the job log tail.

use std::path::Path;
use vet_core::{LogLevel, ProgressEvent, ShortId};

/// Translate a progress event into a log-tail line.
///
/// Events with no operator-facing story (status changes, stream plumbing,
/// remediation envelopes) map to `None` and are not logged.
pub fn format_event(event: &ProgressEvent) -> Option<(LogLevel, String)> {
    match event {
        ProgressEvent::JobStarted { mode, total_files } => Some((
            LogLevel::Info,
            format!("Started evaluation ({mode} mode, {total_files} file(s))"),
        )),
        ProgressEvent::FileStarted { file_path } => {
            Some((LogLevel::Info, format!("Processing {file_path}")))
        }
        ProgressEvent::EvaluatorProgress {
            evaluator_name,
            evaluator_index,
            total_evaluators,
            current_file,
        } => {
            let position = format!("({}/{})", evaluator_index + 1, total_evaluators);
            let message = match current_file {
                Some(file) => {
                    format!("Running {evaluator_name} on {} {position}", basename(file))
                }
                None => format!("Running {evaluator_name} {position}"),
            };
            Some((LogLevel::Info, message))
        }
        ProgressEvent::EvaluatorRetry {
            evaluator_name,
            attempt,
            max_attempts,
            error,
        } => Some((
            LogLevel::Warning,
            format!(
                "Retry {attempt}/{max_attempts} for {evaluator_name}: {}",
                error.short(100)
            ),
        )),
        ProgressEvent::EvaluatorTimeout {
            evaluator_name,
            timeout_ms,
        } => Some((
            LogLevel::Error,
            format!(
                "Timeout: {evaluator_name} exceeded {}s limit",
                round_secs(*timeout_ms)
            ),
        )),
        ProgressEvent::CurationStarted {
            issue_type,
            total_issues,
        } => Some((
            LogLevel::Info,
            format!(
                "Curating top {} from {total_issues} total...",
                issue_label(issue_type)
            ),
        )),
        ProgressEvent::CurationCompleted {
            issue_type,
            curated_count,
        } => Some((
            LogLevel::Success,
            format!(
                "Impact curation completed for {} ({curated_count} selected)",
                issue_label(issue_type)
            ),
        )),
        ProgressEvent::JobCompleted { duration, .. } => Some((
            LogLevel::Success,
            format!("Evaluation completed in {}s", round_secs(*duration)),
        )),
        ProgressEvent::JobFailed { error, .. } => {
            let message = if error.message.is_empty() {
                "Unknown error"
            } else {
                &error.message
            };
            Some((LogLevel::Error, format!("Evaluation failed: {message}")))
        }
        _ => None,
    }
}

fn round_secs(ms: u64) -> u64 {
    (ms as f64 / 1000.0).round() as u64
}

fn basename(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
}

fn issue_label(issue_type: &str) -> &'static str {
    match issue_type {
        "error" | "errors" => "errors",
        "suggestion" | "suggestions" => "suggestions",
        _ => "issues",
    }
}

#[cfg(test)]
#[path = "log_format_tests.rs"]
mod tests;
