// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted record shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vet_core::JobError;

/// A terminal evaluation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    pub id: String,
    pub request: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    pub created_at: u64,
}

impl EvaluationRecord {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// A terminal remediation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationRecord {
    pub id: String,
    pub request: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Evaluation that re-scored the remediated tree, linked after the fact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_evaluation_id: Option<String>,
    pub created_at: u64,
}

impl RemediationRecord {
    pub fn is_failed(&self) -> bool {
        self.error_message.is_some()
    }
}
