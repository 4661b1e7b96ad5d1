// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Buffered per-job pub-sub.
//!
//! Events emitted while a job has no subscriber accumulate in a replay
//! buffer; the first subscriber receives the whole buffer in emit order
//! before any live event, after which the channel is pass-through. This is
//! what lets a client attach just after submission without losing the
//! earliest events.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use vet_core::ProgressEvent;

/// Subscriber callback. Invoked on the emitting task, never under the hub
/// lock, so callbacks may re-enter the hub.
pub type ProgressFn = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Handle for deregistering a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Channel {
    subscribers: Vec<(u64, ProgressFn)>,
    buffer: Vec<ProgressEvent>,
}

/// Per-job fan-out with pre-subscription buffering.
#[derive(Default)]
pub struct ProgressHub {
    channels: Mutex<HashMap<String, Channel>>,
    next_id: AtomicU64,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver to every subscriber in registration order, or buffer when
    /// nobody is listening.
    pub fn emit(&self, job_id: &str, event: &ProgressEvent) {
        let subscribers: Vec<ProgressFn> = {
            let mut channels = self.channels.lock();
            let channel = channels.entry(job_id.to_string()).or_default();
            if channel.subscribers.is_empty() {
                channel.buffer.push(event.clone());
                return;
            }
            channel
                .subscribers
                .iter()
                .map(|(_, f)| Arc::clone(f))
                .collect()
        };
        for subscriber in subscribers {
            subscriber(event);
        }
    }

    /// Register a subscriber, replaying any buffered events to it first.
    ///
    /// The buffer is drained and delivered before the callback is added to
    /// the live set; events emitted concurrently land back in the buffer
    /// and are picked up by the next drain round, so replayed events always
    /// precede live ones.
    pub fn subscribe(&self, job_id: &str, subscriber: ProgressFn) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        loop {
            let batch = {
                let mut channels = self.channels.lock();
                let channel = channels.entry(job_id.to_string()).or_default();
                if channel.buffer.is_empty() {
                    channel.subscribers.push((id, Arc::clone(&subscriber)));
                    break;
                }
                std::mem::take(&mut channel.buffer)
            };
            for event in &batch {
                subscriber(event);
            }
        }
        SubscriptionId(id)
    }

    /// Deregister. Returns false when the subscription was already gone.
    pub fn unsubscribe(&self, job_id: &str, sub: SubscriptionId) -> bool {
        let mut channels = self.channels.lock();
        let Some(channel) = channels.get_mut(job_id) else {
            return false;
        };
        let before = channel.subscribers.len();
        channel.subscribers.retain(|(id, _)| *id != sub.0);
        channel.subscribers.len() != before
    }

    /// Drop the channel for a job: subscribers and replay buffer.
    pub fn clear(&self, job_id: &str) {
        self.channels.lock().remove(job_id);
    }

    pub fn clear_all(&self) {
        self.channels.lock().clear();
    }

    pub fn subscriber_count(&self, job_id: &str) -> usize {
        self.channels
            .lock()
            .get(job_id)
            .map_or(0, |c| c.subscribers.len())
    }

    pub fn buffered_count(&self, job_id: &str) -> usize {
        self.channels
            .lock()
            .get(job_id)
            .map_or(0, |c| c.buffer.len())
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
