// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config route: rate-limit stats, evaluator registry, service limits.

use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use vet_core::EVALUATORS;

/// `GET /config`
pub async fn lookup(State(state): State<Arc<AppState>>) -> Json<Value> {
    let rate = state.limiter.stats();
    Json(json!({
        "dailyGitEvalLimit": rate.limit,
        "dailyGitEvalCount": rate.count,
        "dailyGitEvalRemaining": rate.remaining,
        "evaluators": EVALUATORS,
        "maxConcurrentJobs": state.config.max_concurrent_jobs,
        "maxQueueSize": state.config.max_queue_size,
        "remediationEnabled": state.remediation.is_some(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
