// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remediation job manager.
//!
//! Same queue/fan-out substrate as the evaluation manager, but strictly
//! serial: remediations mutate a working tree, so at most one may run at a
//! time regardless of configuration. Tracks a `current_step` label from
//! engine step events and persists through the remediation store.

use crate::config::ManagerConfig;
use crate::engine::{Engine, EngineError};
use crate::error::SubmitError;
use crate::hub::{ProgressFn, ProgressHub, SubscriptionId};
use crate::job_store::{JobStore, Sweeper};
use crate::log_format;
use crate::manager::FinishedHook;
use crate::stream::ProgressSource;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::{Arc, Weak};
use vet_core::{
    Clock, IdGen, Job, JobError, JobRequest, JobStatus, ProgressEvent, StatusCounts, SystemClock,
    UuidIdGen,
};
use vet_storage::RemediationStore;

pub struct RemediationManager<C: Clock + 'static = SystemClock, G: IdGen + 'static = UuidIdGen> {
    store: Arc<JobStore>,
    hub: ProgressHub,
    engine: Arc<dyn Engine>,
    remediations: Arc<dyn RemediationStore>,
    /// Filesystem safety: at most one remediation runs at a time.
    running: Mutex<Option<String>>,
    finished_hooks: Mutex<Vec<FinishedHook>>,
    config: ManagerConfig,
    clock: C,
    ids: G,
    sweeper: Sweeper,
    /// Back-reference for handing `Arc<Self>` to the spawned job task.
    this: Weak<Self>,
}

impl<C: Clock + 'static, G: IdGen + 'static> RemediationManager<C, G> {
    pub fn new(
        engine: Arc<dyn Engine>,
        remediations: Arc<dyn RemediationStore>,
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
            remediations,
            running: Mutex::new(None),
            finished_hooks: Mutex::new(Vec::new()),
            config,
            clock,
            ids,
            sweeper,
            this: this.clone(),
        })
    }

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

        tracing::info!(remediation = %id, "remediation queued");
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

    pub fn stats(&self) -> StatusCounts {
        self.store.counts()
    }

    /// Is some active remediation already bound to this evaluation?
    pub fn has_active_job_for_evaluation(&self, evaluation_id: &str) -> bool {
        self.store
            .find(|j| j.is_active() && j.request.evaluation_id() == Some(evaluation_id))
            .is_some()
    }

    /// Most recent remediation (any state) targeting an evaluation.
    pub fn job_by_evaluation_id(&self, evaluation_id: &str) -> Option<Job> {
        self.store
            .find(|j| j.request.evaluation_id() == Some(evaluation_id))
    }

    pub fn on_progress(&self, job_id: &str, subscriber: ProgressFn) -> SubscriptionId {
        self.hub.subscribe(job_id, subscriber)
    }

    pub fn off_progress(&self, job_id: &str, sub: SubscriptionId) -> bool {
        self.hub.unsubscribe(job_id, sub)
    }

    pub fn on_job_finished(&self, hook: FinishedHook) {
        self.finished_hooks.lock().push(hook);
    }

    pub fn cancel_job(&self, id: &str) -> bool {
        let error = JobError::new("Job cancelled by user", "JOB_CANCELLED");
        if !self
            .store
            .cancel_queued(id, error.clone(), self.clock.epoch_ms())
        {
            return false;
        }
        tracing::info!(remediation = %id, "remediation cancelled");
        self.hub.emit(
            id,
            &ProgressEvent::RemediationFailed {
                job_id: id.to_string(),
                error: error.brief(),
            },
        );
        self.hub.clear(id);
        self.notify_finished(id, JobStatus::Failed);
        true
    }

    pub fn shutdown(&self) {
        self.sweeper.stop();
        self.hub.clear_all();
        *self.running.lock() = None;
    }

    fn dispatch(&self) {
        // Gone only during teardown, when nothing should be started anyway.
        let Some(manager) = self.this.upgrade() else {
            return;
        };
        let job = {
            let mut running = self.running.lock();
            if running.is_some() {
                return;
            }
            let Some(job) = self.store.take_next_queued(self.clock.epoch_ms()) else {
                return;
            };
            *running = Some(job.id.clone());
            job
        };

        tracing::info!(remediation = %job.id, "remediation started");
        self.hub.emit(
            &job.id,
            &ProgressEvent::RemediationStarted {
                job_id: job.id.clone(),
            },
        );

        tokio::spawn(async move { manager.run_job(job).await });
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
                tracing::warn!(remediation = %job.id, "cleanup hook failed: {e}");
            }
        }
        self.hub.clear(&job.id);
        self.notify_finished(&job.id, status);
        *self.running.lock() = None;
        self.dispatch();
    }

    fn handle_event(&self, job_id: &str, event: &ProgressEvent) {
        let now = self.clock.epoch_ms();
        if let ProgressEvent::RemediationStep { step } = event {
            self.store.set_current_step(job_id, step, now);
        }
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
            .remediations
            .save_remediation(&job.id, &job.request.payload, &result, job.created_at)
            .await
        {
            tracing::error!(remediation = %job.id, "failed to persist remediation: {e}");
        }

        self.handle_event(
            &job.id,
            &ProgressEvent::RemediationCompleted {
                job_id: job.id.clone(),
                result,
                duration,
            },
        );
    }

    async fn finish_failure(&self, job: &Job, error: EngineError) {
        let job_error = error.into_job_error("REMEDIATION_ERROR");
        self.store
            .store_error(&job.id, job_error.clone(), self.clock.epoch_ms());

        if let Err(e) = self
            .remediations
            .save_failed_remediation(
                &job.id,
                &job.request.payload,
                &job_error.message,
                job.created_at,
            )
            .await
        {
            tracing::error!(remediation = %job.id, "failed to persist failed remediation: {e}");
        }

        self.handle_event(
            &job.id,
            &ProgressEvent::RemediationFailed {
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

impl<C: Clock + 'static, G: IdGen + 'static> ProgressSource for RemediationManager<C, G> {
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
            JobStatus::Completed => Some(ProgressEvent::RemediationCompleted {
                job_id: job.id.clone(),
                result: job.result.clone().unwrap_or(Value::Null),
                duration: job.duration_ms(),
            }),
            JobStatus::Failed => Some(ProgressEvent::RemediationFailed {
                job_id: job.id.clone(),
                error: job
                    .error
                    .as_ref()
                    .map(|e| e.brief())
                    .unwrap_or_else(|| JobError::new("Unknown error", "REMEDIATION_ERROR")),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "remediation_tests.rs"]
mod tests;
