// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Evaluator registry and issue extraction.
//!
//! Pure functions over engine result payloads. The registry feeds the
//! `/config` route; issue extraction flattens a completed result into the
//! per-finding list the UI renders.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A known evaluator the engine may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EvaluatorInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

/// Registry of evaluators, in the order the engine runs them.
pub const EVALUATORS: &[EvaluatorInfo] = &[
    EvaluatorInfo {
        id: "correctness",
        name: "Correctness",
        description: "Logic errors, unhandled edge cases, and broken contracts",
    },
    EvaluatorInfo {
        id: "security",
        name: "Security",
        description: "Injection risks, secret handling, and unsafe patterns",
    },
    EvaluatorInfo {
        id: "performance",
        name: "Performance",
        description: "Hot-path inefficiencies and unnecessary allocations",
    },
    EvaluatorInfo {
        id: "maintainability",
        name: "Maintainability",
        description: "Structure, naming, and duplication",
    },
    EvaluatorInfo {
        id: "test-coverage",
        name: "Test Coverage",
        description: "Untested branches and missing regression tests",
    },
];

/// Display name for an evaluator id, if registered.
pub fn evaluator_display_name(id: &str) -> Option<&'static str> {
    EVALUATORS.iter().find(|e| e.id == id).map(|e| e.name)
}

/// One finding extracted from a result payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub evaluator: String,
    pub severity: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
}

/// Flatten the issues of a completed result payload.
///
/// Understands `{"evaluations": [{"evaluator", "issues": [...]}]}` as well
/// as a bare top-level `{"issues": [...]}`. Anything else yields an empty
/// list — the payload is engine-owned and may evolve ahead of us.
pub fn extract_issues(result: &Value) -> Vec<Issue> {
    let mut issues = Vec::new();

    if let Some(evaluations) = result.get("evaluations").and_then(Value::as_array) {
        for evaluation in evaluations {
            let evaluator = evaluation
                .get("evaluator")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            collect_issues(evaluation.get("issues"), evaluator, &mut issues);
        }
    }

    collect_issues(result.get("issues"), "unknown", &mut issues);
    issues
}

fn collect_issues(raw: Option<&Value>, evaluator: &str, out: &mut Vec<Issue>) {
    let Some(items) = raw.and_then(Value::as_array) else {
        return;
    };
    for item in items {
        let Some(message) = item.get("message").and_then(Value::as_str) else {
            continue;
        };
        out.push(Issue {
            evaluator: item
                .get("evaluator")
                .and_then(Value::as_str)
                .unwrap_or(evaluator)
                .to_string(),
            severity: item
                .get("severity")
                .and_then(Value::as_str)
                .unwrap_or("info")
                .to_string(),
            message: message.to_string(),
            file: item
                .get("file")
                .and_then(Value::as_str)
                .map(str::to_string),
            line: item.get("line").and_then(Value::as_u64),
        });
    }
}

#[cfg(test)]
#[path = "evaluators_tests.rs"]
mod tests;
