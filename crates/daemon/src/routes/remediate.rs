// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remediation routes.

use crate::reply::ApiError;
use crate::state::{AppState, RemediationState};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use vet_core::JobRequest;

fn remediation(state: &AppState) -> Result<&RemediationState, ApiError> {
    state.remediation.as_ref().ok_or_else(|| ApiError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        code: "REMEDIATION_DISABLED",
        message: "remediation is disabled on this instance".to_string(),
    })
}

/// `POST /remediate` — one active remediation per evaluation.
pub async fn submit(State(state): State<Arc<AppState>>, Json(payload): Json<Value>) -> Response {
    let remediation = match remediation(&state) {
        Ok(r) => r,
        Err(e) => return e.into_response(),
    };

    let request = JobRequest::new(payload);
    if let Some(evaluation_id) = request.evaluation_id() {
        if remediation.manager.has_active_job_for_evaluation(evaluation_id) {
            return ApiError::conflict(
                "REMEDIATION_IN_PROGRESS",
                format!("a remediation is already active for evaluation {evaluation_id}"),
            )
            .into_response();
        }
    }

    match remediation.manager.submit_job(request) {
        Ok(job_id) => (StatusCode::ACCEPTED, Json(json!({"jobId": job_id}))).into_response(),
        Err(e) => ApiError::queue_full(e.to_string()).into_response(),
    }
}

/// `GET /remediate/:id`
pub async fn lookup(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let remediation = match remediation(&state) {
        Ok(r) => r,
        Err(e) => return e.into_response(),
    };
    match remediation.manager.get_job(&id) {
        Some(job) => Json(job).into_response(),
        None => ApiError::not_found(format!("remediation not found: {id}")).into_response(),
    }
}

/// `DELETE /remediate/:id` — cancel a queued remediation.
pub async fn cancel(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let remediation = match remediation(&state) {
        Ok(r) => r,
        Err(e) => return e.into_response(),
    };
    if remediation.manager.get_job(&id).is_none() {
        return ApiError::not_found(format!("remediation not found: {id}")).into_response();
    }
    if remediation.manager.cancel_job(&id) {
        Json(json!({"cancelled": true})).into_response()
    } else {
        ApiError::conflict("CANNOT_CANCEL", "only queued remediations can be cancelled")
            .into_response()
    }
}
