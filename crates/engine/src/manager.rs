// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Evaluation job manager.
//!
//! Bounded FIFO queue with a cooperative dispatcher: submits admit into the
//! store, the dispatcher promotes the oldest queued job whenever a slot is
//! free, and each running job executes the engine on its own task. Progress
//! events update the store, feed the log tail, and fan out through the
//! buffered hub. Terminal results are persisted through the storage seam;
//! persistence failures never change job state.

use crate::config::ManagerConfig;
use crate::engine::{Engine, EngineError};
use crate::error::SubmitError;
use crate::hub::{ProgressFn, ProgressHub, SubscriptionId};
use crate::job_store::{JobStore, Sweeper};
use crate::log_format;
use crate::stream::ProgressSource;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Weak};
use vet_core::{
    Clock, IdGen, Job, JobRequest, JobStatus, ProgressEvent, StatusCounts, SystemClock, UuidIdGen,
};
use vet_storage::{EvaluationStore, RemediationStore};

/// Listener invoked once per job reaching a terminal state.
pub type FinishedHook = Arc<dyn Fn(&str, JobStatus) + Send + Sync>;

pub struct JobManager<C: Clock + 'static = SystemClock, G: IdGen + 'static = UuidIdGen> {
    store: Arc<JobStore>,
    hub: ProgressHub,
    engine: Arc<dyn Engine>,
    evaluations: Arc<dyn EvaluationStore>,
    remediations: Option<Arc<dyn RemediationStore>>,
    running: Mutex<HashSet<String>>,
    finished_hooks: Mutex<Vec<FinishedHook>>,
    config: ManagerConfig,
    clock: C,
    ids: G,
    sweeper: Sweeper,
    /// Back-reference for handing `Arc<Self>` to spawned job tasks.
    this: Weak<Self>,
}

impl<C: Clock + 'static, G: IdGen + 'static> JobManager<C, G> {
    pub fn new(
        engine: Arc<dyn Engine>,
        evaluations: Arc<dyn EvaluationStore>,
        remediations: Option<Arc<dyn RemediationStore>>,
        config: ManagerConfig,
        clock: C,
        ids: G,
    ) -> Arc<Self> {
        let store = Arc::new(JobStore::new(config.log_tail_max));
        let sweeper = Sweeper::spawn(
            Arc::clone(&store),
            clock.clone(),
            config.sweep_interval,
            config.job_ttl,
        );
        Arc::new_cyclic(|this| Self {
            store,
            hub: ProgressHub::new(),
            engine,
            evaluations,
            remediations,
            running: Mutex::new(HashSet::new()),
            finished_hooks: Mutex::new(Vec::new()),
            config,
            clock,
            ids,
            sweeper,
            this: this.clone(),
        })
    }

    /// Admit a job, or fail with `QUEUE_FULL` when queued ∪ running is at
    /// the cap. Returns the new job id; dispatch happens asynchronously.
    pub fn submit_job(&self, request: JobRequest) -> Result<String, SubmitError> {
        let id = self.ids.next();
        let job = Job::new(&id, request, self.clock.epoch_ms());
        let payload = job.request.payload.clone();

        self.store
            .insert_if_capacity(job, self.config.max_queue_size)
            .map_err(|active| SubmitError::QueueFull {
                active,
                max: self.config.max_queue_size,
            })?;

        tracing::info!(job = %id, "job queued");
        self.hub.emit(
            &id,
            &ProgressEvent::JobQueued {
                job_id: id.clone(),
                request: payload,
            },
        );
        self.dispatch();
        Ok(id)
    }

    pub fn get_job(&self, id: &str) -> Option<Job> {
        self.store.get(id)
    }

    pub fn all_jobs(&self) -> Vec<Job> {
        self.store.all()
    }

    pub fn active_jobs(&self) -> Vec<Job> {
        self.store.active()
    }

    pub fn stats(&self) -> StatusCounts {
        self.store.counts()
    }

    /// Register a progress subscriber. Buffered events are replayed to it
    /// in emit order before it goes live.
    pub fn on_progress(&self, job_id: &str, subscriber: ProgressFn) -> SubscriptionId {
        self.hub.subscribe(job_id, subscriber)
    }

    pub fn off_progress(&self, job_id: &str, sub: SubscriptionId) -> bool {
        self.hub.unsubscribe(job_id, sub)
    }

    /// Register a process-wide terminal-status listener.
    pub fn on_job_finished(&self, hook: FinishedHook) {
        self.finished_hooks.lock().push(hook);
    }

    /// Cancel a queued job. Running jobs are not preempted; returns false
    /// for them and for repeat cancels.
    pub fn cancel_job(&self, id: &str) -> bool {
        let error = vet_core::JobError::new("Job cancelled by user", "JOB_CANCELLED");
        if !self
            .store
            .cancel_queued(id, error.clone(), self.clock.epoch_ms())
        {
            return false;
        }
        tracing::info!(job = %id, "job cancelled");
        self.hub.emit(
            id,
            &ProgressEvent::JobFailed {
                job_id: id.to_string(),
                error: error.brief(),
            },
        );
        self.hub.clear(id);
        self.notify_finished(id, JobStatus::Failed);
        true
    }

    /// Stop the sweep and drop all fan-out state. In-flight engine work is
    /// not preempted.
    pub fn shutdown(&self) {
        self.sweeper.stop();
        self.hub.clear_all();
        self.running.lock().clear();
    }

    /// Promote queued jobs into free dispatcher slots.
    fn dispatch(&self) {
        // Gone only during teardown, when nothing should be started anyway.
        let Some(manager) = self.this.upgrade() else {
            return;
        };
        loop {
            let job = {
                let mut running = self.running.lock();
                if running.len() >= self.config.max_concurrent_jobs {
                    return;
                }
                let Some(job) = self.store.take_next_queued(self.clock.epoch_ms()) else {
                    return;
                };
                running.insert(job.id.clone());
                job
            };

            tracing::info!(job = %job.id, "job started");
            self.hub.emit(
                &job.id,
                &ProgressEvent::JobStatusChanged {
                    status: job.status,
                    progress: job.progress.clone(),
                    created_at: job.created_at,
                    started_at: job.started_at,
                    updated_at: job.updated_at,
                },
            );

            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.run_job(job).await });
        }
    }

    async fn run_job(self: Arc<Self>, job: Job) {
        let progress: ProgressFn = {
            let manager = Arc::clone(&self);
            let job_id = job.id.clone();
            Arc::new(move |event: &ProgressEvent| manager.handle_event(&job_id, event))
        };
        let outcome = self.engine.run(job.request.clone(), progress).await;

        let status = match outcome {
            Ok(result) => {
                self.finish_success(&job, result).await;
                JobStatus::Completed
            }
            Err(error) => {
                self.finish_failure(&job, error).await;
                JobStatus::Failed
            }
        };

        if let Some(cleanup) = &job.request.cleanup {
            if let Err(e) = cleanup() {
                tracing::warn!(job = %job.id, "cleanup hook failed: {e}");
            }
        }
        self.hub.clear(&job.id);
        self.notify_finished(&job.id, status);
        self.running.lock().remove(&job.id);
        self.dispatch();
    }

    /// Apply one event: progress snapshot, log tail, fan-out. Used for both
    /// engine relays and the manager's own terminal events.
    fn handle_event(&self, job_id: &str, event: &ProgressEvent) {
        let now = self.clock.epoch_ms();
        self.store.update_progress(job_id, now, |p| event.apply_to(p));
        if let Some((level, message)) = log_format::format_event(event) {
            self.store.append_log(job_id, level, message, now);
        }
        self.hub.emit(job_id, event);
    }

    async fn finish_success(&self, job: &Job, result: Value) {
        let stored = self
            .store
            .store_result(&job.id, result.clone(), self.clock.epoch_ms());
        let duration = stored.map(|j| j.duration_ms()).unwrap_or(0);

        if let Err(e) = self
            .evaluations
            .save_evaluation(&job.id, &job.request.payload, &result, job.created_at)
            .await
        {
            tracing::error!(job = %job.id, "failed to persist evaluation: {e}");
        }

        if let Some(remediation_id) = job.request.source_remediation_id() {
            if let Some(remediations) = &self.remediations {
                if let Err(e) = remediations
                    .link_result_evaluation(remediation_id, &job.id)
                    .await
                {
                    tracing::warn!(
                        job = %job.id,
                        remediation = remediation_id,
                        "failed to link result evaluation: {e}"
                    );
                }
            }
        }

        self.handle_event(
            &job.id,
            &ProgressEvent::JobCompleted {
                job_id: job.id.clone(),
                result,
                duration,
            },
        );
    }

    async fn finish_failure(&self, job: &Job, error: EngineError) {
        let job_error = error.into_job_error("EVALUATION_ERROR");
        self.store
            .store_error(&job.id, job_error.clone(), self.clock.epoch_ms());

        if let Err(e) = self
            .evaluations
            .save_failed_evaluation(&job.id, &job.request.payload, &job_error, job.created_at)
            .await
        {
            tracing::error!(job = %job.id, "failed to persist failed evaluation: {e}");
        }

        self.handle_event(
            &job.id,
            &ProgressEvent::JobFailed {
                job_id: job.id.clone(),
                error: job_error.brief(),
            },
        );
    }

    fn notify_finished(&self, id: &str, status: JobStatus) {
        let hooks: Vec<FinishedHook> = self.finished_hooks.lock().iter().map(Arc::clone).collect();
        for hook in hooks {
            hook(id, status);
        }
    }
}

impl<C: Clock + 'static, G: IdGen + 'static> ProgressSource for JobManager<C, G> {
    fn snapshot(&self, job_id: &str) -> Option<Job> {
        self.get_job(job_id)
    }

    fn subscribe(&self, job_id: &str, subscriber: ProgressFn) -> SubscriptionId {
        self.on_progress(job_id, subscriber)
    }

    fn unsubscribe(&self, job_id: &str, sub: SubscriptionId) -> bool {
        self.off_progress(job_id, sub)
    }

    fn terminal_event(&self, job: &Job) -> Option<ProgressEvent> {
        match job.status {
            JobStatus::Completed => Some(ProgressEvent::JobCompleted {
                job_id: job.id.clone(),
                result: job.result.clone().unwrap_or(Value::Null),
                duration: job.duration_ms(),
            }),
            JobStatus::Failed => Some(ProgressEvent::JobFailed {
                job_id: job.id.clone(),
                error: job
                    .error
                    .as_ref()
                    .map(|e| e.brief())
                    .unwrap_or_else(|| vet_core::JobError::new("Unknown error", "EVALUATION_ERROR")),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
