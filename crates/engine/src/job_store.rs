// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory job catalog.
//!
//! All lifecycle transitions happen through the methods here, under a
//! single mutex, so readers always observe a coherent job record and the
//! §3-style timestamp invariants hold by construction. Terminal jobs are
//! garbage-collected by the [`Sweeper`]; queued and running jobs never are.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use vet_core::{Clock, Job, JobError, JobStatus, LogEntry, LogLevel, Progress, StatusCounts};

struct Slot {
    /// Monotone admission sequence; FIFO dispatch tie-breaker.
    seq: u64,
    job: Job,
}

/// Thread-safe catalog of jobs keyed by id.
pub struct JobStore {
    slots: Mutex<HashMap<String, Slot>>,
    next_seq: AtomicU64,
    log_cap: usize,
}

impl JobStore {
    pub fn new(log_cap: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            log_cap,
        }
    }

    /// Insert a new job if the active count is below `max_active`.
    ///
    /// The capacity check and the insert share one critical section, so
    /// concurrent submits cannot overshoot the admission cap.
    pub fn insert_if_capacity(&self, job: Job, max_active: usize) -> Result<(), usize> {
        let mut slots = self.slots.lock();
        let active = slots.values().filter(|s| s.job.is_active()).count();
        if active >= max_active {
            return Err(active);
        }
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        slots.insert(job.id.clone(), Slot { seq, job });
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        self.slots.lock().get(id).map(|s| s.job.clone())
    }

    /// All jobs in admission order.
    pub fn all(&self) -> Vec<Job> {
        let slots = self.slots.lock();
        let mut entries: Vec<(u64, Job)> =
            slots.values().map(|s| (s.seq, s.job.clone())).collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, job)| job).collect()
    }

    /// Queued and running jobs in admission order.
    pub fn active(&self) -> Vec<Job> {
        self.all().into_iter().filter(Job::is_active).collect()
    }

    pub fn active_count(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|s| s.job.is_active())
            .count()
    }

    pub fn counts(&self) -> StatusCounts {
        let slots = self.slots.lock();
        let mut counts = StatusCounts {
            total: slots.len(),
            ..StatusCounts::default()
        };
        for slot in slots.values() {
            match slot.job.status {
                JobStatus::Queued => counts.queued += 1,
                JobStatus::Running => counts.running += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        counts.active = counts.queued + counts.running;
        counts
    }

    /// Atomically promote the oldest queued job to running.
    pub fn take_next_queued(&self, now_ms: u64) -> Option<Job> {
        let mut slots = self.slots.lock();
        let id = slots
            .values()
            .filter(|s| s.job.status == JobStatus::Queued)
            .min_by_key(|s| s.seq)
            .map(|s| s.job.id.clone())?;
        let slot = slots.get_mut(&id)?;
        slot.job.status = JobStatus::Running;
        slot.job.started_at = Some(now_ms);
        slot.job.updated_at = now_ms;
        Some(slot.job.clone())
    }

    /// Fold a progress mutation into the snapshot.
    ///
    /// `updated_at` moves only when the closure reports a change.
    pub fn update_progress(
        &self,
        id: &str,
        now_ms: u64,
        apply: impl FnOnce(&mut Progress) -> bool,
    ) -> bool {
        let mut slots = self.slots.lock();
        let Some(slot) = slots.get_mut(id) else {
            return false;
        };
        let changed = apply(&mut slot.job.progress);
        if changed {
            slot.job.updated_at = now_ms;
        }
        changed
    }

    /// Append to the log tail, dropping the oldest entries past the cap.
    pub fn append_log(&self, id: &str, level: LogLevel, message: String, now_ms: u64) {
        let mut slots = self.slots.lock();
        let Some(slot) = slots.get_mut(id) else {
            return;
        };
        slot.job.logs.push(LogEntry {
            timestamp: now_ms,
            level,
            message,
        });
        if slot.job.logs.len() > self.log_cap {
            let excess = slot.job.logs.len() - self.log_cap;
            slot.job.logs.drain(..excess);
        }
        slot.job.updated_at = now_ms;
    }

    /// Record the engine result: `running → completed`.
    pub fn store_result(&self, id: &str, result: serde_json::Value, now_ms: u64) -> Option<Job> {
        let mut slots = self.slots.lock();
        let slot = slots.get_mut(id)?;
        slot.job.status = JobStatus::Completed;
        slot.job.result = Some(result);
        slot.job.completed_at = Some(now_ms);
        slot.job.updated_at = now_ms;
        Some(slot.job.clone())
    }

    /// Record an engine failure: `running → failed`.
    pub fn store_error(&self, id: &str, error: JobError, now_ms: u64) -> Option<Job> {
        let mut slots = self.slots.lock();
        let slot = slots.get_mut(id)?;
        slot.job.status = JobStatus::Failed;
        slot.job.error = Some(error);
        slot.job.failed_at = Some(now_ms);
        slot.job.updated_at = now_ms;
        Some(slot.job.clone())
    }

    /// Fail a job only if it is still queued. Running jobs are not preempted.
    pub fn cancel_queued(&self, id: &str, error: JobError, now_ms: u64) -> bool {
        let mut slots = self.slots.lock();
        let Some(slot) = slots.get_mut(id) else {
            return false;
        };
        if slot.job.status != JobStatus::Queued {
            return false;
        }
        slot.job.status = JobStatus::Failed;
        slot.job.error = Some(error);
        slot.job.failed_at = Some(now_ms);
        slot.job.updated_at = now_ms;
        true
    }

    /// Update the remediation step label.
    pub fn set_current_step(&self, id: &str, step: &str, now_ms: u64) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(id) {
            slot.job.current_step = Some(step.to_string());
            slot.job.updated_at = now_ms;
        }
    }

    pub fn remove(&self, id: &str) -> Option<Job> {
        self.slots.lock().remove(id).map(|s| s.job)
    }

    /// Most recently admitted job matching the predicate.
    pub fn find(&self, pred: impl Fn(&Job) -> bool) -> Option<Job> {
        let slots = self.slots.lock();
        slots
            .values()
            .filter(|s| pred(&s.job))
            .max_by_key(|s| s.seq)
            .map(|s| s.job.clone())
    }

    /// Drop terminal jobs whose `updated_at` is older than the TTL.
    /// Returns how many were removed.
    pub fn sweep(&self, now_ms: u64, ttl_ms: u64) -> usize {
        let mut slots = self.slots.lock();
        let before = slots.len();
        slots.retain(|_, s| {
            s.job.is_active() || now_ms.saturating_sub(s.job.updated_at) <= ttl_ms
        });
        before - slots.len()
    }
}

/// Periodic GC task over a [`JobStore`]. Stoppable for shutdown.
pub struct Sweeper {
    shutdown: Arc<Notify>,
}

impl Sweeper {
    pub fn spawn<C: Clock + 'static>(
        store: Arc<JobStore>,
        clock: C,
        interval: Duration,
        ttl: Duration,
    ) -> Self {
        let shutdown = Arc::new(Notify::new());
        let stop = Arc::clone(&shutdown);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately; skip it.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = store.sweep(clock.epoch_ms(), ttl.as_millis() as u64);
                        if removed > 0 {
                            tracing::debug!(removed, "swept terminal jobs");
                        }
                    }
                    _ = stop.notified() => break,
                }
            }
        });
        Self { shutdown }
    }

    pub fn stop(&self) {
        self.shutdown.notify_waiters();
        self.shutdown.notify_one();
    }
}

#[cfg(test)]
#[path = "job_store_tests.rs"]
mod tests;
