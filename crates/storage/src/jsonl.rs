// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL store.
//!
//! One line per saved record; re-saves and link updates append a fresh line
//! and the newest line per id wins on load. Terminal results survive a
//! restart this way without any durability promise for in-flight jobs.

use crate::records::{EvaluationRecord, RemediationRecord};
use crate::{EvaluationStore, RemediationStore, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use vet_core::JobError;

const EVALUATIONS_FILE: &str = "evaluations.jsonl";
const REMEDIATIONS_FILE: &str = "remediations.jsonl";

/// File-backed store rooted at a state directory.
pub struct JsonlStore {
    dir: PathBuf,
    evaluations: Mutex<Catalog<EvaluationRecord>>,
    remediations: Mutex<Catalog<RemediationRecord>>,
}

struct Catalog<T> {
    by_id: HashMap<String, T>,
    order: Vec<String>,
}

impl<T> Default for Catalog<T> {
    fn default() -> Self {
        Self {
            by_id: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<T: Clone> Catalog<T> {
    fn put(&mut self, id: String, record: T) {
        if self.by_id.insert(id.clone(), record).is_none() {
            self.order.push(id);
        }
    }
}

impl JsonlStore {
    /// Open (or create) the store under `dir`, replaying both files.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let store = Self {
            evaluations: Mutex::new(load(&dir.join(EVALUATIONS_FILE), |r: &EvaluationRecord| {
                r.id.clone()
            })?),
            remediations: Mutex::new(load(
                &dir.join(REMEDIATIONS_FILE),
                |r: &RemediationRecord| r.id.clone(),
            )?),
            dir,
        };
        Ok(store)
    }

    fn append(&self, file: &str, record: &impl Serialize) -> Result<(), StoreError> {
        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(file))?;
        let line = serde_json::to_string(record)?;
        writeln!(handle, "{line}")?;
        Ok(())
    }
}

fn load<T: DeserializeOwned + Clone>(
    path: &Path,
    id_of: impl Fn(&T) -> String,
) -> Result<Catalog<T>, StoreError> {
    let mut catalog = Catalog::default();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(catalog),
        Err(e) => return Err(e.into()),
    };
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(&line) {
            Ok(record) => catalog.put(id_of(&record), record),
            // A torn trailing line from a crash mid-append is expected.
            Err(e) => {
                tracing::warn!(path = %path.display(), "skipping malformed line: {e}");
            }
        }
    }
    Ok(catalog)
}

#[async_trait]
impl EvaluationStore for JsonlStore {
    async fn save_evaluation(
        &self,
        id: &str,
        request: &Value,
        result: &Value,
        created_at: u64,
    ) -> Result<(), StoreError> {
        let record = EvaluationRecord {
            id: id.to_string(),
            request: request.clone(),
            result: Some(result.clone()),
            error: None,
            created_at,
        };
        self.append(EVALUATIONS_FILE, &record)?;
        self.evaluations.lock().put(id.to_string(), record);
        Ok(())
    }

    async fn save_failed_evaluation(
        &self,
        id: &str,
        request: &Value,
        error: &JobError,
        created_at: u64,
    ) -> Result<(), StoreError> {
        let record = EvaluationRecord {
            id: id.to_string(),
            request: request.clone(),
            result: None,
            error: Some(error.clone()),
            created_at,
        };
        self.append(EVALUATIONS_FILE, &record)?;
        self.evaluations.lock().put(id.to_string(), record);
        Ok(())
    }

    async fn get_evaluation(&self, id: &str) -> Result<Option<EvaluationRecord>, StoreError> {
        Ok(self.evaluations.lock().by_id.get(id).cloned())
    }

    async fn recent_evaluations(&self, limit: usize) -> Result<Vec<EvaluationRecord>, StoreError> {
        let catalog = self.evaluations.lock();
        Ok(catalog
            .order
            .iter()
            .rev()
            .take(limit)
            .filter_map(|id| catalog.by_id.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl RemediationStore for JsonlStore {
    async fn save_remediation(
        &self,
        id: &str,
        request: &Value,
        result: &Value,
        created_at: u64,
    ) -> Result<(), StoreError> {
        let record = RemediationRecord {
            id: id.to_string(),
            request: request.clone(),
            result: Some(result.clone()),
            error_message: None,
            result_evaluation_id: None,
            created_at,
        };
        self.append(REMEDIATIONS_FILE, &record)?;
        self.remediations.lock().put(id.to_string(), record);
        Ok(())
    }

    async fn save_failed_remediation(
        &self,
        id: &str,
        request: &Value,
        error_message: &str,
        created_at: u64,
    ) -> Result<(), StoreError> {
        let record = RemediationRecord {
            id: id.to_string(),
            request: request.clone(),
            result: None,
            error_message: Some(error_message.to_string()),
            result_evaluation_id: None,
            created_at,
        };
        self.append(REMEDIATIONS_FILE, &record)?;
        self.remediations.lock().put(id.to_string(), record);
        Ok(())
    }

    async fn link_result_evaluation(
        &self,
        remediation_id: &str,
        evaluation_id: &str,
    ) -> Result<(), StoreError> {
        let updated = {
            let mut catalog = self.remediations.lock();
            let Some(record) = catalog.by_id.get_mut(remediation_id) else {
                return Err(StoreError::Backend(format!(
                    "remediation not found: {remediation_id}"
                )));
            };
            record.result_evaluation_id = Some(evaluation_id.to_string());
            record.clone()
        };
        self.append(REMEDIATIONS_FILE, &updated)
    }

    async fn get_remediation(&self, id: &str) -> Result<Option<RemediationRecord>, StoreError> {
        Ok(self.remediations.lock().by_id.get(id).cloned())
    }
}

#[cfg(test)]
#[path = "jsonl_tests.rs"]
mod tests;
