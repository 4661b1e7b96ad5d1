// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service configuration.
//!
//! Defaults, overlaid by an optional TOML file, overlaid by `VET_*`
//! environment variables.

use crate::env;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use vet_engine::{ManagerConfig, StreamerConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind: SocketAddr,
    pub state_dir: PathBuf,
    /// Search path for the UI bundle; first existing directory wins.
    pub static_dirs: Vec<PathBuf>,
    pub engine_command: Option<String>,
    pub remediation_command: Option<String>,
    pub max_concurrent_jobs: usize,
    pub max_queue_size: usize,
    pub job_ttl_ms: u64,
    pub sweep_interval_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub retry_directive_ms: u64,
    pub log_tail_max: usize,
    /// Daily cap on git-URL evaluations; 0 disables the limiter.
    pub daily_git_eval_limit: u32,
    pub enable_remediation: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            state_dir: PathBuf::from(".vet"),
            static_dirs: vec![PathBuf::from("public"), PathBuf::from("dist")],
            engine_command: None,
            remediation_command: None,
            max_concurrent_jobs: 2,
            max_queue_size: 20,
            job_ttl_ms: 3_600_000,
            sweep_interval_ms: 600_000,
            heartbeat_interval_ms: 15_000,
            retry_directive_ms: 10_000,
            log_tail_max: 50,
            daily_git_eval_limit: 50,
            enable_remediation: true,
        }
    }
}

/// File shape: every field optional, unknown keys rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    bind: Option<SocketAddr>,
    state_dir: Option<PathBuf>,
    static_dirs: Option<Vec<PathBuf>>,
    engine_command: Option<String>,
    remediation_command: Option<String>,
    max_concurrent_jobs: Option<usize>,
    max_queue_size: Option<usize>,
    job_ttl_ms: Option<u64>,
    sweep_interval_ms: Option<u64>,
    heartbeat_interval_ms: Option<u64>,
    retry_directive_ms: Option<u64>,
    log_tail_max: Option<usize>,
    daily_git_eval_limit: Option<u32>,
    enable_remediation: Option<bool>,
}

impl ServiceConfig {
    /// Defaults → config file (if present) → environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(dir) = env::state_dir() {
            config.state_dir = dir;
        }

        let path = env::config_path();
        if path.is_file() {
            let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let file: FileConfig =
                toml::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })?;
            config.apply_file(file);
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        let FileConfig {
            bind,
            state_dir,
            static_dirs,
            engine_command,
            remediation_command,
            max_concurrent_jobs,
            max_queue_size,
            job_ttl_ms,
            sweep_interval_ms,
            heartbeat_interval_ms,
            retry_directive_ms,
            log_tail_max,
            daily_git_eval_limit,
            enable_remediation,
        } = file;

        self.bind = bind.unwrap_or(self.bind);
        self.state_dir = state_dir.unwrap_or_else(|| self.state_dir.clone());
        self.static_dirs = static_dirs.unwrap_or_else(|| self.static_dirs.clone());
        self.engine_command = engine_command.or_else(|| self.engine_command.take());
        self.remediation_command = remediation_command.or_else(|| self.remediation_command.take());
        self.max_concurrent_jobs = max_concurrent_jobs.unwrap_or(self.max_concurrent_jobs);
        self.max_queue_size = max_queue_size.unwrap_or(self.max_queue_size);
        self.job_ttl_ms = job_ttl_ms.unwrap_or(self.job_ttl_ms);
        self.sweep_interval_ms = sweep_interval_ms.unwrap_or(self.sweep_interval_ms);
        self.heartbeat_interval_ms = heartbeat_interval_ms.unwrap_or(self.heartbeat_interval_ms);
        self.retry_directive_ms = retry_directive_ms.unwrap_or(self.retry_directive_ms);
        self.log_tail_max = log_tail_max.unwrap_or(self.log_tail_max);
        self.daily_git_eval_limit = daily_git_eval_limit.unwrap_or(self.daily_git_eval_limit);
        self.enable_remediation = enable_remediation.unwrap_or(self.enable_remediation);
    }

    fn apply_env(&mut self) {
        if let Some(bind) = env::bind_addr() {
            self.bind = bind;
        }
        if let Some(dirs) = env::static_dirs() {
            self.static_dirs = dirs;
        }
        if let Some(cmd) = env::engine_command() {
            self.engine_command = Some(cmd);
        }
        if let Some(cmd) = env::remediation_command() {
            self.remediation_command = Some(cmd);
        }
        if let Some(v) = env::usize_var("VET_MAX_CONCURRENT_JOBS") {
            self.max_concurrent_jobs = v;
        }
        if let Some(v) = env::usize_var("VET_MAX_QUEUE_SIZE") {
            self.max_queue_size = v;
        }
        if let Some(v) = env::u64_var("VET_JOB_TTL_MS") {
            self.job_ttl_ms = v;
        }
        if let Some(v) = env::u64_var("VET_SWEEP_INTERVAL_MS") {
            self.sweep_interval_ms = v;
        }
        if let Some(v) = env::u64_var("VET_HEARTBEAT_INTERVAL_MS") {
            self.heartbeat_interval_ms = v;
        }
        if let Some(v) = env::u64_var("VET_RETRY_DIRECTIVE_MS") {
            self.retry_directive_ms = v;
        }
        if let Some(v) = env::usize_var("VET_LOG_TAIL_MAX") {
            self.log_tail_max = v;
        }
        if let Some(v) = env::u32_var("VET_DAILY_GIT_EVAL_LIMIT") {
            self.daily_git_eval_limit = v;
        }
        if let Some(v) = env::bool_var("VET_ENABLE_REMEDIATION") {
            self.enable_remediation = v;
        }
    }

    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            max_concurrent_jobs: self.max_concurrent_jobs,
            max_queue_size: self.max_queue_size,
            log_tail_max: self.log_tail_max,
            job_ttl: Duration::from_millis(self.job_ttl_ms),
            sweep_interval: Duration::from_millis(self.sweep_interval_ms),
        }
    }

    /// The remediation manager shares the queue limits but runs serially.
    pub fn remediation_config(&self) -> ManagerConfig {
        ManagerConfig {
            max_concurrent_jobs: 1,
            ..self.manager_config()
        }
    }

    pub fn streamer_config(&self) -> StreamerConfig {
        StreamerConfig {
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms),
            retry_millis: self.retry_directive_ms,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
