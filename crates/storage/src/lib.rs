// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! vet-storage: Persistence interface for terminal job results.
//!
//! The orchestration core only sees the two store traits; the physical
//! layout behind them is an implementation choice. Persistence failures are
//! always benign to the caller — the job manager logs and moves on.

mod jsonl;
mod memory;
mod records;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use vet_core::JobError;

pub use jsonl::JsonlStore;
pub use memory::MemoryStore;
pub use records::{EvaluationRecord, RemediationRecord};

/// Errors from a persistence backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Repository for terminal evaluation results.
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    async fn save_evaluation(
        &self,
        id: &str,
        request: &Value,
        result: &Value,
        created_at: u64,
    ) -> Result<(), StoreError>;

    async fn save_failed_evaluation(
        &self,
        id: &str,
        request: &Value,
        error: &JobError,
        created_at: u64,
    ) -> Result<(), StoreError>;

    async fn get_evaluation(&self, id: &str) -> Result<Option<EvaluationRecord>, StoreError>;

    /// Most recently saved records, newest first.
    async fn recent_evaluations(&self, limit: usize) -> Result<Vec<EvaluationRecord>, StoreError>;
}

/// Repository for terminal remediation results.
#[async_trait]
pub trait RemediationStore: Send + Sync {
    async fn save_remediation(
        &self,
        id: &str,
        request: &Value,
        result: &Value,
        created_at: u64,
    ) -> Result<(), StoreError>;

    async fn save_failed_remediation(
        &self,
        id: &str,
        request: &Value,
        error_message: &str,
        created_at: u64,
    ) -> Result<(), StoreError>;

    /// Record which evaluation re-scored the remediated tree.
    async fn link_result_evaluation(
        &self,
        remediation_id: &str,
        evaluation_id: &str,
    ) -> Result<(), StoreError>;

    async fn get_remediation(&self, id: &str) -> Result<Option<RemediationRecord>, StoreError>;
}
