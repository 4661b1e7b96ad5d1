// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted engines and wait helpers for tests.

#![allow(clippy::panic)]

use crate::engine::{Engine, EngineError};
use crate::hub::ProgressFn;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use vet_core::{JobRequest, ProgressEvent};

/// Engine that replays a fixed event script and returns a fixed outcome.
///
/// With a gate, every run first waits for one permit — tests release jobs
/// one at a time with `gate.add_permits(1)`.
pub struct ScriptedEngine {
    pub events: Vec<ProgressEvent>,
    pub outcome: Result<Value, EngineError>,
    pub gate: Option<Arc<Semaphore>>,
    /// When set, the gate is awaited after emitting events instead of before.
    pub gate_after_events: bool,
}

impl ScriptedEngine {
    pub fn ok(result: Value) -> Self {
        Self {
            events: Vec::new(),
            outcome: Ok(result),
            gate: None,
            gate_after_events: false,
        }
    }

    pub fn failing(message: &str, code: Option<&str>) -> Self {
        let mut error = EngineError::new(message);
        if let Some(code) = code {
            error = error.with_code(code);
        }
        Self {
            events: Vec::new(),
            outcome: Err(error),
            gate: None,
            gate_after_events: false,
        }
    }

    pub fn with_events(mut self, events: Vec<ProgressEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn gated_after_events(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self.gate_after_events = true;
        self
    }

    async fn wait_gate(&self) -> Result<(), EngineError> {
        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| EngineError::new("gate closed"))?;
            permit.forget();
        }
        Ok(())
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    async fn run(&self, _request: JobRequest, progress: ProgressFn) -> Result<Value, EngineError> {
        if !self.gate_after_events {
            self.wait_gate().await?;
        }
        for event in &self.events {
            progress(event);
        }
        if self.gate_after_events {
            self.wait_gate().await?;
        }
        self.outcome.clone()
    }
}

/// Progress callback capturing every event it sees.
pub fn collector() -> (ProgressFn, Arc<Mutex<Vec<ProgressEvent>>>) {
    let seen: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: ProgressFn = Arc::new(move |event| sink.lock().push(event.clone()));
    (callback, seen)
}

/// Poll until the condition holds, or panic after ~2 seconds.
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Names of the engine-relayed and terminal events in a capture, in order.
pub fn event_names(events: &[ProgressEvent]) -> Vec<&'static str> {
    events.iter().map(ProgressEvent::name).collect()
}
