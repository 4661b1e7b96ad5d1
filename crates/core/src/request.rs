// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caller-supplied request payload.
//!
//! The payload is opaque to the orchestration core and forwarded to the
//! engine verbatim. A handful of underscore-prefixed hook fields are
//! recognized on the payload itself; the cleanup hook is process-local and
//! never serialized.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Process-local hook invoked when job execution finishes, regardless of
/// outcome. Errors are logged and swallowed.
pub type CleanupHook = Arc<dyn Fn() -> Result<(), String> + Send + Sync>;

/// An opaque request payload plus the implementation hooks the core honors.
#[derive(Clone, Default)]
pub struct JobRequest {
    pub payload: Value,
    pub cleanup: Option<CleanupHook>,
}

impl JobRequest {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            cleanup: None,
        }
    }

    pub fn with_cleanup(mut self, cleanup: CleanupHook) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key)?.as_str()
    }

    /// Remediation that produced this evaluation request, if any.
    ///
    /// After a successful save the manager links the result back to this
    /// remediation in the remediation store.
    pub fn source_remediation_id(&self) -> Option<&str> {
        self.payload_str("_sourceRemediationId")
    }

    /// Opaque parent evaluation reference; not interpreted by the core.
    pub fn parent_evaluation_id(&self) -> Option<&str> {
        self.payload_str("_parentEvaluationId")
    }

    /// Evaluation a remediation request targets.
    ///
    /// Used to enforce at most one concurrent remediation per evaluation.
    pub fn evaluation_id(&self) -> Option<&str> {
        self.payload_str("evaluationId")
    }

    /// Git repository URL, when the request evaluates a remote repository.
    /// Submissions carrying one are counted against the daily limit.
    pub fn repository_url(&self) -> Option<&str> {
        self.payload_str("repositoryUrl")
    }
}

impl std::fmt::Debug for JobRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRequest")
            .field("payload", &self.payload)
            .field("cleanup", &self.cleanup.as_ref().map(|_| "<hook>"))
            .finish()
    }
}

impl Serialize for JobRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.payload.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for JobRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::new(Value::deserialize(deserializer)?))
    }
}

impl From<Value> for JobRequest {
    fn from(payload: Value) -> Self {
        Self::new(payload)
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
