// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manager tuning knobs.

use std::time::Duration;

/// Limits and periods for a job manager instance.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Dispatcher cap: jobs executing in parallel.
    pub max_concurrent_jobs: usize,
    /// Admission cap: queued plus running jobs.
    pub max_queue_size: usize,
    /// Per-job log tail length.
    pub log_tail_max: usize,
    /// How long terminal jobs linger before the sweep removes them.
    pub job_ttl: Duration,
    /// Period of the store sweep.
    pub sweep_interval: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            max_queue_size: 20,
            log_tail_max: 50,
            job_ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(600),
        }
    }
}

impl ManagerConfig {
    /// Strict-serial variant used for filesystem-mutating remediation work.
    pub fn serial() -> Self {
        Self {
            max_concurrent_jobs: 1,
            ..Self::default()
        }
    }
}
