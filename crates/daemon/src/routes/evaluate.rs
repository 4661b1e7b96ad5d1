// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Evaluation submit/query/cancel routes.

use crate::reply::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use vet_core::{extract_issues, JobRequest};

/// `POST /evaluate` — admit a job. Git-URL evaluations consume the daily
/// budget; the queue cap applies to everything.
pub async fn submit(State(state): State<Arc<AppState>>, Json(payload): Json<Value>) -> Response {
    let request = JobRequest::new(payload);

    if request.repository_url().is_some() && !state.limiter.consume().allowed {
        return ApiError::rate_limited("daily evaluation limit reached").into_response();
    }

    match state.manager.submit_job(request) {
        Ok(job_id) => (StatusCode::ACCEPTED, Json(json!({"jobId": job_id}))).into_response(),
        Err(e) => ApiError::queue_full(e.to_string()).into_response(),
    }
}

/// `GET /evaluate/:id`
pub async fn lookup(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.manager.get_job(&id) {
        Some(job) => Json(job).into_response(),
        None => ApiError::not_found(format!("job not found: {id}")).into_response(),
    }
}

/// `DELETE /evaluate/:id` — cancel a queued job.
pub async fn cancel(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    if state.manager.get_job(&id).is_none() {
        return ApiError::not_found(format!("job not found: {id}")).into_response();
    }
    if state.manager.cancel_job(&id) {
        Json(json!({"cancelled": true})).into_response()
    } else {
        ApiError::conflict("CANNOT_CANCEL", "only queued jobs can be cancelled").into_response()
    }
}

/// `GET /evaluate/:id/issues` — findings flattened from the result payload.
pub async fn issues(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let Some(job) = state.manager.get_job(&id) else {
        return ApiError::not_found(format!("job not found: {id}")).into_response();
    };
    let issues = job.result.as_ref().map(extract_issues).unwrap_or_default();
    Json(json!({"jobId": id, "issues": issues})).into_response()
}

/// `GET /evaluations/:id` — persisted terminal record.
pub async fn persisted(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.evaluations.get_evaluation(&id).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => ApiError::not_found(format!("evaluation not found: {id}")).into_response(),
        Err(e) => ApiError::internal(e.to_string()).into_response(),
    }
}
