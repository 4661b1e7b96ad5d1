// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch coordinator.
//!
//! Submits child evaluation jobs one at a time, in URL order: the next
//! child is not admitted until the previous one reaches a terminal state,
//! observed through the job manager's finished hook. The batch itself has
//! no lifecycle beyond its id; its status is derived from the children.

use crate::error::BatchError;
use crate::manager::JobManager;
use crate::rate_limiter::RateLimiter;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::oneshot;
use vet_core::{Clock, IdGen, JobRequest, JobStatus, SystemClock, UuidIdGen};

/// Status of one batch child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchJobStatus {
    /// Not yet submitted.
    Pending,
    Queued,
    Running,
    Completed,
    Failed,
}

impl From<JobStatus> for BatchJobStatus {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Queued => BatchJobStatus::Queued,
            JobStatus::Running => BatchJobStatus::Running,
            JobStatus::Completed => BatchJobStatus::Completed,
            JobStatus::Failed => BatchJobStatus::Failed,
        }
    }
}

#[derive(Debug, Clone)]
struct BatchEntry {
    url: String,
    job_id: Option<String>,
    status: BatchJobStatus,
    error_code: Option<String>,
}

#[derive(Debug, Clone)]
struct Batch {
    entries: Vec<BatchEntry>,
}

/// One row of a batch status reply.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJobView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub url: String,
    pub status: BatchJobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregated batch status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatus {
    pub total_urls: usize,
    pub pending: usize,
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub is_finished: bool,
    pub jobs: Vec<BatchJobView>,
}

pub struct BatchManager<C: Clock + 'static = SystemClock, G: IdGen + 'static = UuidIdGen> {
    manager: Arc<JobManager<C, G>>,
    limiter: Arc<RateLimiter<C>>,
    batches: Mutex<HashMap<String, Batch>>,
    waiters: Arc<Mutex<HashMap<String, oneshot::Sender<JobStatus>>>>,
    ids: G,
    /// Back-reference for handing `Arc<Self>` to driver tasks.
    this: Weak<Self>,
}

impl<C: Clock + 'static, G: IdGen + 'static> BatchManager<C, G> {
    pub fn new(
        manager: Arc<JobManager<C, G>>,
        limiter: Arc<RateLimiter<C>>,
        ids: G,
    ) -> Arc<Self> {
        let waiters: Arc<Mutex<HashMap<String, oneshot::Sender<JobStatus>>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let hook_waiters = Arc::clone(&waiters);
        manager.on_job_finished(Arc::new(move |job_id, status| {
            if let Some(tx) = hook_waiters.lock().remove(job_id) {
                let _ = tx.send(status);
            }
        }));

        Arc::new_cyclic(|this| Self {
            manager,
            limiter,
            batches: Mutex::new(HashMap::new()),
            waiters,
            ids,
            this: this.clone(),
        })
    }

    /// Create a batch and start its sequential driver.
    pub fn submit_batch(&self, urls: Vec<String>, options: Value) -> Result<String, BatchError> {
        if urls.is_empty() {
            return Err(BatchError::Empty);
        }
        let batch_id = self.ids.next();
        let entries = urls
            .iter()
            .map(|url| BatchEntry {
                url: url.clone(),
                job_id: None,
                status: BatchJobStatus::Pending,
                error_code: None,
            })
            .collect();
        self.batches
            .lock()
            .insert(batch_id.clone(), Batch { entries });

        tracing::info!(batch = %batch_id, urls = urls.len(), "batch submitted");
        if let Some(driver) = self.this.upgrade() {
            let driver_id = batch_id.clone();
            tokio::spawn(async move { driver.drive(driver_id, urls, options).await });
        }
        Ok(batch_id)
    }

    async fn drive(self: Arc<Self>, batch_id: String, urls: Vec<String>, options: Value) {
        for (index, url) in urls.iter().enumerate() {
            if !self.limiter.consume().allowed {
                tracing::warn!(batch = %batch_id, url = %url, "batch child rate limited");
                self.update_entry(&batch_id, index, |entry| {
                    entry.status = BatchJobStatus::Failed;
                    entry.error_code = Some("RATE_LIMITED".to_string());
                });
                continue;
            }

            let request = child_request(url, &options);
            let job_id = match self.manager.submit_job(request) {
                Ok(job_id) => job_id,
                Err(e) => {
                    tracing::warn!(batch = %batch_id, url = %url, "batch child rejected: {e}");
                    self.update_entry(&batch_id, index, |entry| {
                        entry.status = BatchJobStatus::Failed;
                        entry.error_code = Some(e.code().to_string());
                    });
                    continue;
                }
            };

            let (tx, rx) = oneshot::channel();
            self.waiters.lock().insert(job_id.clone(), tx);
            self.update_entry(&batch_id, index, |entry| {
                entry.job_id = Some(job_id.clone());
                entry.status = BatchJobStatus::Queued;
            });

            // The child may already be terminal if the engine returned
            // before the waiter was registered.
            let status = match self.manager.get_job(&job_id).map(|j| j.status) {
                Some(status) if status.is_terminal() => {
                    self.waiters.lock().remove(&job_id);
                    status
                }
                _ => rx.await.unwrap_or(JobStatus::Failed),
            };
            self.update_entry(&batch_id, index, |entry| {
                entry.status = status.into();
            });
        }
        tracing::info!(batch = %batch_id, "batch finished");
    }

    fn update_entry(&self, batch_id: &str, index: usize, apply: impl FnOnce(&mut BatchEntry)) {
        let mut batches = self.batches.lock();
        if let Some(entry) = batches
            .get_mut(batch_id)
            .and_then(|b| b.entries.get_mut(index))
        {
            apply(entry);
        }
    }

    /// Aggregate view of a batch, reading live child states through the
    /// job manager.
    pub fn batch_status(&self, batch_id: &str) -> Option<BatchStatus> {
        let batch = self.batches.lock().get(batch_id).cloned()?;

        let mut status = BatchStatus {
            total_urls: batch.entries.len(),
            pending: 0,
            queued: 0,
            running: 0,
            completed: 0,
            failed: 0,
            is_finished: true,
            jobs: Vec::with_capacity(batch.entries.len()),
        };

        for entry in &batch.entries {
            let effective = match (&entry.job_id, entry.status) {
                // Live children read through the store; terminal snapshots
                // stay authoritative even after the job is swept.
                (Some(job_id), s) if !matches!(s, BatchJobStatus::Completed | BatchJobStatus::Failed) => {
                    self.manager
                        .get_job(job_id)
                        .map(|j| j.status.into())
                        .unwrap_or(s)
                }
                (_, s) => s,
            };
            match effective {
                BatchJobStatus::Pending => status.pending += 1,
                BatchJobStatus::Queued => status.queued += 1,
                BatchJobStatus::Running => status.running += 1,
                BatchJobStatus::Completed => status.completed += 1,
                BatchJobStatus::Failed => status.failed += 1,
            }
            if !matches!(
                effective,
                BatchJobStatus::Completed | BatchJobStatus::Failed
            ) {
                status.is_finished = false;
            }
            status.jobs.push(BatchJobView {
                job_id: entry.job_id.clone(),
                url: entry.url.clone(),
                status: effective,
                error: entry.error_code.clone(),
            });
        }
        Some(status)
    }
}

/// Build a child request: the batch options object plus the repository URL.
fn child_request(url: &str, options: &Value) -> JobRequest {
    let mut payload = match options {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    payload.insert(
        "repositoryUrl".to_string(),
        Value::String(url.to_string()),
    );
    JobRequest::new(Value::Object(payload))
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
