// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static UI assets.
//!
//! Requests are resolved against the configured search directories; SPA
//! navigation paths (no file extension) fall back to `index.html`, and an
//! embedded shell page answers when no bundle is installed at all.

use crate::state::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

const EMBEDDED_INDEX: &str = include_str!("../assets/index.html");

/// Fallback handler: everything the API router did not claim.
pub async fn serve(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    let request_path = uri.path().trim_start_matches('/');
    let Some(relative) = sanitize(request_path) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if !relative.as_os_str().is_empty() {
        for dir in &state.config.static_dirs {
            if let Some(response) = read_file(&dir.join(&relative)).await {
                return response;
            }
        }
    }

    // SPA fallback: navigation paths render the app shell.
    let is_navigation = request_path.is_empty() || !request_path.contains('.');
    if is_navigation {
        for dir in &state.config.static_dirs {
            if let Some(response) = read_file(&dir.join("index.html")).await {
                return response;
            }
        }
        return Html(EMBEDDED_INDEX).into_response();
    }

    StatusCode::NOT_FOUND.into_response()
}

/// Reject traversal and absolute components.
pub fn sanitize(request_path: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(request_path).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(out)
}

async fn read_file(path: &Path) -> Option<Response> {
    if !path.is_file() {
        return None;
    }
    let body = tokio::fs::read(path).await.ok()?;
    let mime = mime_for(path.extension().and_then(|e| e.to_str()).unwrap_or(""));
    Some(([(header::CONTENT_TYPE, mime)], body).into_response())
}

pub fn mime_for(extension: &str) -> &'static str {
    match extension {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" | "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "ico" => "image/x-icon",
        "woff2" => "font/woff2",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
#[path = "assets_tests.rs"]
mod tests;
