// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared application state: the wired orchestration core.

use crate::config::ServiceConfig;
use std::sync::Arc;
use std::time::Instant;
use vet_core::{SystemClock, UuidIdGen};
use vet_engine::{
    BatchManager, Engine, JobManager, ProgressSource, ProgressStreamer, RateLimiter,
    RemediationManager,
};
use vet_storage::{EvaluationStore, RemediationStore};

pub type Manager = JobManager<SystemClock, UuidIdGen>;
pub type Remediations = RemediationManager<SystemClock, UuidIdGen>;
pub type Batches = BatchManager<SystemClock, UuidIdGen>;

/// Remediation half of the service, absent when disabled by config.
pub struct RemediationState {
    pub manager: Arc<Remediations>,
    pub streamer: Arc<ProgressStreamer>,
}

pub struct AppState {
    pub config: ServiceConfig,
    pub manager: Arc<Manager>,
    pub remediation: Option<RemediationState>,
    pub batches: Arc<Batches>,
    pub limiter: Arc<RateLimiter>,
    pub streamer: Arc<ProgressStreamer>,
    pub evaluations: Arc<dyn EvaluationStore>,
    pub started: Instant,
}

impl AppState {
    pub fn new(
        config: ServiceConfig,
        engine: Arc<dyn Engine>,
        remediation_engine: Arc<dyn Engine>,
        evaluations: Arc<dyn EvaluationStore>,
        remediations: Arc<dyn RemediationStore>,
    ) -> Arc<Self> {
        let clock = SystemClock;

        let manager = JobManager::new(
            engine,
            Arc::clone(&evaluations),
            Some(Arc::clone(&remediations)),
            config.manager_config(),
            clock.clone(),
            UuidIdGen,
        );
        let streamer = ProgressStreamer::new(
            Arc::clone(&manager) as Arc<dyn ProgressSource>,
            config.streamer_config(),
        );

        let limiter = Arc::new(RateLimiter::new(config.daily_git_eval_limit, clock.clone()));
        let batches = BatchManager::new(Arc::clone(&manager), Arc::clone(&limiter), UuidIdGen);

        let remediation = config.enable_remediation.then(|| {
            let manager = RemediationManager::new(
                remediation_engine,
                remediations,
                config.remediation_config(),
                clock,
                UuidIdGen,
            );
            let streamer = ProgressStreamer::new(
                Arc::clone(&manager) as Arc<dyn ProgressSource>,
                config.streamer_config(),
            );
            RemediationState { manager, streamer }
        });

        Arc::new(Self {
            config,
            manager,
            remediation,
            batches,
            limiter,
            streamer,
            evaluations,
            started: Instant::now(),
        })
    }

    /// Streamers first so clients see closed connections, then the managers.
    pub fn shutdown(&self) {
        self.streamer.shutdown();
        if let Some(remediation) = &self.remediation {
            remediation.streamer.shutdown();
            remediation.manager.shutdown();
        }
        self.manager.shutdown();
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}
