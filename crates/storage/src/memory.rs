// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store, for tests and engine-less development.

use crate::records::{EvaluationRecord, RemediationRecord};
use crate::{EvaluationStore, RemediationStore, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use vet_core::JobError;

/// Keeps every record in process memory.
///
/// `set_fail_saves(true)` makes every subsequent save return a backend
/// error, for exercising the manager's log-and-continue path.
#[derive(Default)]
pub struct MemoryStore {
    evaluations: Mutex<HashMap<String, EvaluationRecord>>,
    eval_order: Mutex<Vec<String>>,
    remediations: Mutex<HashMap<String, RemediationRecord>>,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    fn check_failure(&self) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected save failure".to_string()));
        }
        Ok(())
    }

    pub fn evaluation_count(&self) -> usize {
        self.evaluations.lock().len()
    }

    pub fn remediation_count(&self) -> usize {
        self.remediations.lock().len()
    }
}

#[async_trait]
impl EvaluationStore for MemoryStore {
    async fn save_evaluation(
        &self,
        id: &str,
        request: &Value,
        result: &Value,
        created_at: u64,
    ) -> Result<(), StoreError> {
        self.check_failure()?;
        self.evaluations.lock().insert(
            id.to_string(),
            EvaluationRecord {
                id: id.to_string(),
                request: request.clone(),
                result: Some(result.clone()),
                error: None,
                created_at,
            },
        );
        self.eval_order.lock().push(id.to_string());
        Ok(())
    }

    async fn save_failed_evaluation(
        &self,
        id: &str,
        request: &Value,
        error: &JobError,
        created_at: u64,
    ) -> Result<(), StoreError> {
        self.check_failure()?;
        self.evaluations.lock().insert(
            id.to_string(),
            EvaluationRecord {
                id: id.to_string(),
                request: request.clone(),
                result: None,
                error: Some(error.clone()),
                created_at,
            },
        );
        self.eval_order.lock().push(id.to_string());
        Ok(())
    }

    async fn get_evaluation(&self, id: &str) -> Result<Option<EvaluationRecord>, StoreError> {
        Ok(self.evaluations.lock().get(id).cloned())
    }

    async fn recent_evaluations(&self, limit: usize) -> Result<Vec<EvaluationRecord>, StoreError> {
        let order = self.eval_order.lock();
        let evaluations = self.evaluations.lock();
        Ok(order
            .iter()
            .rev()
            .take(limit)
            .filter_map(|id| evaluations.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl RemediationStore for MemoryStore {
    async fn save_remediation(
        &self,
        id: &str,
        request: &Value,
        result: &Value,
        created_at: u64,
    ) -> Result<(), StoreError> {
        self.check_failure()?;
        self.remediations.lock().insert(
            id.to_string(),
            RemediationRecord {
                id: id.to_string(),
                request: request.clone(),
                result: Some(result.clone()),
                error_message: None,
                result_evaluation_id: None,
                created_at,
            },
        );
        Ok(())
    }

    async fn save_failed_remediation(
        &self,
        id: &str,
        request: &Value,
        error_message: &str,
        created_at: u64,
    ) -> Result<(), StoreError> {
        self.check_failure()?;
        self.remediations.lock().insert(
            id.to_string(),
            RemediationRecord {
                id: id.to_string(),
                request: request.clone(),
                result: None,
                error_message: Some(error_message.to_string()),
                result_evaluation_id: None,
                created_at,
            },
        );
        Ok(())
    }

    async fn link_result_evaluation(
        &self,
        remediation_id: &str,
        evaluation_id: &str,
    ) -> Result<(), StoreError> {
        let mut remediations = self.remediations.lock();
        match remediations.get_mut(remediation_id) {
            Some(record) => {
                record.result_evaluation_id = Some(evaluation_id.to_string());
                Ok(())
            }
            None => Err(StoreError::Backend(format!(
                "remediation not found: {remediation_id}"
            ))),
        }
    }

    async fn get_remediation(&self, id: &str) -> Result<Option<RemediationRecord>, StoreError> {
        Ok(self.remediations.lock().get(id).cloned())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
