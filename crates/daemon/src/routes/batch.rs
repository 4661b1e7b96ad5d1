// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch submit and status routes.

use crate::reply::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct BatchBody {
    pub urls: Vec<String>,
    #[serde(default)]
    pub options: Value,
}

/// `POST /evaluate/batch`
pub async fn submit(State(state): State<Arc<AppState>>, Json(body): Json<BatchBody>) -> Response {
    match state.batches.submit_batch(body.urls, body.options) {
        Ok(batch_id) => {
            (StatusCode::ACCEPTED, Json(json!({"batchId": batch_id}))).into_response()
        }
        Err(e) => ApiError::bad_request("EMPTY_BATCH", e.to_string()).into_response(),
    }
}

/// `GET /evaluate/batch/:id`
pub async fn status(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.batches.batch_status(&id) {
        Some(status) => Json(status).into_response(),
        None => ApiError::not_found(format!("batch not found: {id}")).into_response(),
    }
}
