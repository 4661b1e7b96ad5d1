// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Route table.

pub mod batch;
pub mod evaluate;
pub mod health;
pub mod progress;
pub mod remediate;
pub mod service_config;

use crate::assets;
use crate::reply;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/evaluate", post(evaluate::submit))
        .route("/evaluate/batch", post(batch::submit))
        .route("/evaluate/batch/:id", get(batch::status))
        .route(
            "/evaluate/:id",
            get(evaluate::lookup).delete(evaluate::cancel),
        )
        .route("/evaluate/:id/progress", get(progress::evaluation_stream))
        .route("/evaluate/:id/issues", get(evaluate::issues))
        .route("/evaluations/:id", get(evaluate::persisted))
        .route("/remediate", post(remediate::submit))
        .route(
            "/remediate/:id",
            get(remediate::lookup).delete(remediate::cancel),
        )
        .route("/remediate/:id/progress", get(progress::remediation_stream))
        .route("/config", get(service_config::lookup))
        .route("/health", get(health::health))
        .fallback(assets::serve)
        .layer(TraceLayer::new_for_http())
        .layer(reply::cors())
        .with_state(state)
}
