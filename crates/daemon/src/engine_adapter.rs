// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess engine adapter.
//!
//! The evaluation engine is an external program. Per job it is spawned with
//! the request JSON on stdin and speaks a line protocol on stdout:
//!
//! - `{"type": "...", "data": {...}}` — a progress event, relayed verbatim
//! - `{"result": {...}}` — terminal success payload
//! - `{"error": {"message", "code"?, "details"?}}` — terminal failure
//!
//! stderr is drained into the daemon log. A nonzero exit without a terminal
//! line fails the job.

use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use vet_core::{JobRequest, ProgressEvent};
use vet_engine::{Engine, EngineError, ProgressFn};

/// Engine that shells out to a configured command per job.
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
}

impl CommandEngine {
    /// Parse a whitespace-separated command line.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

#[async_trait]
impl Engine for CommandEngine {
    async fn run(&self, request: JobRequest, progress: ProgressFn) -> Result<Value, EngineError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                EngineError::new(format!("failed to spawn engine: {e}")).with_code("ENGINE_SPAWN")
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let body = serde_json::to_vec(&request.payload)
                .map_err(|e| EngineError::new(format!("unserializable request: {e}")))?;
            stdin
                .write_all(&body)
                .await
                .map_err(|e| EngineError::new(format!("failed to write request: {e}")))?;
            stdin
                .write_all(b"\n")
                .await
                .map_err(|e| EngineError::new(format!("failed to write request: {e}")))?;
        }

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: "vet_engine_stderr", "{line}");
                }
            });
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::new("engine stdout unavailable"))?;
        let mut lines = BufReader::new(stdout).lines();

        let mut outcome: Option<Result<Value, EngineError>> = None;
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| EngineError::new(format!("failed to read engine output: {e}")))?
        {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(&line) {
                Ok(EngineLine::Event(event)) => progress(&event),
                Ok(EngineLine::Result(value)) => outcome = Some(Ok(value)),
                Ok(EngineLine::Error(error)) => outcome = Some(Err(error)),
                Err(e) => tracing::warn!("ignoring malformed engine line: {e}"),
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| EngineError::new(format!("failed to await engine: {e}")))?;

        match outcome {
            Some(result) => result,
            None if status.success() => {
                Err(EngineError::new("engine produced no result").with_code("ENGINE_PROTOCOL"))
            }
            None => Err(EngineError::new(format!("engine exited with {status}"))
                .with_code("ENGINE_EXIT")),
        }
    }
}

enum EngineLine {
    Event(ProgressEvent),
    Result(Value),
    Error(EngineError),
}

fn parse_line(line: &str) -> Result<EngineLine, serde_json::Error> {
    let value: Value = serde_json::from_str(line)?;

    if let Some(result) = value.get("result") {
        return Ok(EngineLine::Result(result.clone()));
    }
    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("engine error")
            .to_string();
        let mut engine_error = EngineError::new(message);
        if let Some(code) = error.get("code").and_then(Value::as_str) {
            engine_error = engine_error.with_code(code);
        }
        if let Some(details) = error.get("details").and_then(Value::as_str) {
            engine_error = engine_error.with_details(details);
        }
        return Ok(EngineLine::Error(engine_error));
    }

    serde_json::from_value::<ProgressEvent>(value).map(EngineLine::Event)
}

/// Placeholder when no engine command is configured. Every job fails with a
/// clear code instead of the daemon refusing to start.
pub struct NullEngine;

#[async_trait]
impl Engine for NullEngine {
    async fn run(&self, _request: JobRequest, _progress: ProgressFn) -> Result<Value, EngineError> {
        Err(EngineError::new("no engine command configured").with_code("ENGINE_UNCONFIGURED"))
    }
}

#[cfg(test)]
#[path = "engine_adapter_tests.rs"]
mod tests;
