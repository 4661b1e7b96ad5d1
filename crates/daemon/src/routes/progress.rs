// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server-push progress streams.
//!
//! Maps the streamer's transport-agnostic records onto `text/event-stream`
//! frames: the retry directive, `: heartbeat` comments, and `data:` records
//! carrying the event envelopes.

use crate::reply::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use vet_engine::{ClientStream, StreamRecord};

/// `GET /evaluate/:id/progress`
pub async fn evaluation_stream(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.streamer.connect(&id) {
        Some(stream) => sse_response(stream),
        None => ApiError::not_found(format!("job not found: {id}")).into_response(),
    }
}

/// `GET /remediate/:id/progress`
pub async fn remediation_stream(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let Some(remediation) = &state.remediation else {
        return ApiError::not_found("remediation is disabled on this instance").into_response();
    };
    match remediation.streamer.connect(&id) {
        Some(stream) => sse_response(stream),
        None => ApiError::not_found(format!("remediation not found: {id}")).into_response(),
    }
}

fn sse_response(stream: ClientStream) -> Response {
    let frames = stream.map(|record| Ok::<_, Infallible>(to_sse_event(record)));
    let mut response = Sse::new(frames).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}

fn to_sse_event(record: StreamRecord) -> Event {
    match record {
        StreamRecord::Retry { millis } => Event::default().retry(Duration::from_millis(millis)),
        StreamRecord::Heartbeat => Event::default().comment("heartbeat"),
        StreamRecord::Data(event) => match Event::default().json_data(&event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("failed to serialize event envelope: {e}");
                Event::default().comment("serialization error")
            }
        },
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
