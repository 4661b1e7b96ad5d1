// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job progress streamer.
//!
//! Multiplexes one upstream manager subscription per job across any number
//! of client connections. The first client to attach registers the shared
//! callback; the last to detach removes it — N clients never cost N
//! upstream registrations, and fan-out stays linear in the client count.
//!
//! Records are transport-agnostic; the HTTP layer maps them onto
//! `text/event-stream` frames.

use crate::hub::{ProgressFn, SubscriptionId};
use futures_util::Stream;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use vet_core::{Job, ProgressEvent};

/// Streamer timing knobs.
#[derive(Debug, Clone)]
pub struct StreamerConfig {
    /// Period of the per-connection keep-alive comment.
    pub heartbeat_interval: Duration,
    /// Client auto-reconnect delay, sent once at connection open.
    pub retry_millis: u64,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(15),
            retry_millis: 10_000,
        }
    }
}

/// One frame on a client stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamRecord {
    /// `retry: <millis>` directive.
    Retry { millis: u64 },
    /// `: heartbeat` comment.
    Heartbeat,
    /// `data: <json>` event envelope.
    Data(ProgressEvent),
}

/// What the streamer needs from a job manager.
pub trait ProgressSource: Send + Sync {
    fn snapshot(&self, job_id: &str) -> Option<Job>;
    fn subscribe(&self, job_id: &str, subscriber: ProgressFn) -> SubscriptionId;
    fn unsubscribe(&self, job_id: &str, sub: SubscriptionId) -> bool;
    /// Terminal envelope replayed to late joiners of a finished job.
    fn terminal_event(&self, job: &Job) -> Option<ProgressEvent>;
}

struct JobConns {
    upstream: Option<SubscriptionId>,
    clients: HashMap<u64, mpsc::UnboundedSender<StreamRecord>>,
}

/// Broadcaster from one manager to many client streams.
pub struct ProgressStreamer {
    source: Arc<dyn ProgressSource>,
    config: StreamerConfig,
    conns: Mutex<HashMap<String, JobConns>>,
    next_conn_id: AtomicU64,
    closed: AtomicBool,
    /// Back-reference for the upstream callback and detach guards.
    this: Weak<Self>,
}

impl ProgressStreamer {
    pub fn new(source: Arc<dyn ProgressSource>, config: StreamerConfig) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            source,
            config,
            conns: Mutex::new(HashMap::new()),
            next_conn_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            this: this.clone(),
        })
    }

    /// Attach a client to a job's stream.
    ///
    /// Returns `None` for unknown jobs and after shutdown. The returned
    /// stream starts with any replayed history, then the retry directive,
    /// the `connected` envelope, and — for already-finished jobs — the
    /// terminal envelope.
    pub fn connect(&self, job_id: &str) -> Option<ClientStream> {
        if self.closed.load(Ordering::SeqCst) {
            return None;
        }
        let this = self.this.upgrade()?;
        let job = self.source.snapshot(job_id)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::SeqCst);

        let is_first = {
            let mut conns = self.conns.lock();
            match conns.get_mut(job_id) {
                Some(entry) => {
                    entry.clients.insert(conn_id, tx.clone());
                    false
                }
                None => {
                    let mut clients = HashMap::new();
                    clients.insert(conn_id, tx.clone());
                    conns.insert(
                        job_id.to_string(),
                        JobConns {
                            upstream: None,
                            clients,
                        },
                    );
                    true
                }
            }
        };

        if is_first {
            // Register the single shared upstream callback. Buffered events
            // replay synchronously here, reaching this first client through
            // the broadcast path.
            let streamer = Arc::clone(&this);
            let forward_id = job_id.to_string();
            let sub = self.source.subscribe(
                job_id,
                Arc::new(move |event| streamer.broadcast(&forward_id, event)),
            );

            let orphaned = {
                let mut conns = self.conns.lock();
                match conns.get_mut(job_id) {
                    Some(entry) => {
                        entry.upstream = Some(sub);
                        false
                    }
                    // Every client detached during the replay.
                    None => true,
                }
            };
            if orphaned {
                self.source.unsubscribe(job_id, sub);
            }
        }

        self.spawn_heartbeat(&tx);

        let _ = tx.send(StreamRecord::Retry {
            millis: self.config.retry_millis,
        });
        let _ = tx.send(StreamRecord::Data(ProgressEvent::Connected {
            job_id: job_id.to_string(),
            status: job.status,
        }));
        if job.is_terminal() {
            if let Some(event) = self.source.terminal_event(&job) {
                let _ = tx.send(StreamRecord::Data(event));
            }
        }

        Some(ClientStream {
            rx,
            _guard: DetachGuard {
                streamer: this,
                job_id: job_id.to_string(),
                conn_id,
            },
        })
    }

    // Holds only a weak sender so a parked heartbeat timer cannot keep a
    // detached client's channel alive.
    fn spawn_heartbeat(&self, tx: &mpsc::UnboundedSender<StreamRecord>) {
        let weak = tx.downgrade();
        let interval = self.config.heartbeat_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // immediate first tick
            loop {
                ticker.tick().await;
                let Some(tx) = weak.upgrade() else { break };
                if tx.send(StreamRecord::Heartbeat).is_err() {
                    break;
                }
            }
        });
    }

    /// Deliver one event to every client of a job. Send failures mean the
    /// client is gone; it is cleaned up as if it had disconnected.
    fn broadcast(&self, job_id: &str, event: &ProgressEvent) {
        let dropped_upstream = {
            let mut conns = self.conns.lock();
            let Some(entry) = conns.get_mut(job_id) else {
                return;
            };
            entry
                .clients
                .retain(|_, tx| tx.send(StreamRecord::Data(event.clone())).is_ok());
            if entry.clients.is_empty() {
                let upstream = entry.upstream.take();
                conns.remove(job_id);
                upstream
            } else {
                None
            }
        };
        if let Some(sub) = dropped_upstream {
            self.source.unsubscribe(job_id, sub);
        }
    }

    fn detach(&self, job_id: &str, conn_id: u64) {
        let dropped_upstream = {
            let mut conns = self.conns.lock();
            let Some(entry) = conns.get_mut(job_id) else {
                return;
            };
            entry.clients.remove(&conn_id);
            if entry.clients.is_empty() {
                let upstream = entry.upstream.take();
                conns.remove(job_id);
                upstream
            } else {
                None
            }
        };
        if let Some(sub) = dropped_upstream {
            self.source.unsubscribe(job_id, sub);
        }
    }

    /// Live client connections for a job.
    pub fn connection_count(&self, job_id: &str) -> usize {
        self.conns
            .lock()
            .get(job_id)
            .map_or(0, |entry| entry.clients.len())
    }

    /// Close every connection and drop every upstream subscription.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let drained: Vec<(String, Option<SubscriptionId>)> = self
            .conns
            .lock()
            .drain()
            .map(|(job_id, entry)| (job_id, entry.upstream))
            .collect();
        for (job_id, upstream) in drained {
            if let Some(sub) = upstream {
                self.source.unsubscribe(&job_id, sub);
            }
        }
    }
}

/// Receiving half of one client connection.
///
/// Dropping the stream detaches the client; when it was the last one for
/// its job, the shared upstream subscription is removed too.
pub struct ClientStream {
    rx: mpsc::UnboundedReceiver<StreamRecord>,
    _guard: DetachGuard,
}

impl ClientStream {
    pub async fn recv(&mut self) -> Option<StreamRecord> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<StreamRecord> {
        self.rx.try_recv().ok()
    }
}

impl Stream for ClientStream {
    type Item = StreamRecord;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

struct DetachGuard {
    streamer: Arc<ProgressStreamer>,
    job_id: String,
    conn_id: u64,
}

impl Drop for DetachGuard {
    fn drop(&mut self) {
        self.streamer.detach(&self.job_id, self.conn_id);
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
