// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health route.

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use vet_core::StatusCounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: u64,
    pub uptime: u64,
    pub version: &'static str,
    pub jobs: StatusCounts,
}

/// Classify service health from the job counts.
///
/// Small samples stay healthy; sustained failure rates degrade, and a store
/// where everything has failed is unhealthy.
pub fn assess(counts: &StatusCounts) -> HealthStatus {
    if counts.total >= 5 && counts.failed == counts.total {
        return HealthStatus::Unhealthy;
    }
    if counts.total >= 10 && counts.failed as f64 / counts.total as f64 > 0.5 {
        return HealthStatus::Degraded;
    }
    HealthStatus::Healthy
}

/// `GET /health` — 503 only when unhealthy.
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let counts = state.manager.stats();
    let status = assess(&counts);
    let report = HealthReport {
        status,
        timestamp: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64,
        uptime: state.uptime_secs(),
        version: env!("CARGO_PKG_VERSION"),
        jobs: counts,
    };
    let code = match status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    (code, Json(report)).into_response()
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
