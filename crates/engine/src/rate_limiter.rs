// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daily rate limiter.
//!
//! A single calendar-day bucket: the day string and count live under one
//! mutex, and the rollover reset happens inside the same critical section
//! as the check or consume, so a consume racing a midnight rollover can
//! never observe a stale count.

use parking_lot::Mutex;
use serde::Serialize;
use vet_core::{Clock, SystemClock};

/// Outcome of a check or consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub limit: u32,
}

/// Current counter state, reported on the config route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateStats {
    pub count: u32,
    pub limit: u32,
    pub remaining: u32,
}

struct DayWindow {
    day: String,
    count: u32,
}

/// Process-wide, calendar-day-bucketed admission counter.
///
/// A limit of zero disables the limiter: every consume is allowed and
/// nothing is counted.
pub struct RateLimiter<C: Clock = SystemClock> {
    clock: C,
    limit: u32,
    window: Mutex<DayWindow>,
}

impl<C: Clock> RateLimiter<C> {
    pub fn new(limit: u32, clock: C) -> Self {
        let day = clock.date_stamp();
        Self {
            clock,
            limit,
            window: Mutex::new(DayWindow { day, count: 0 }),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.limit == 0
    }

    /// Reset the window if the wall-clock day has changed.
    /// Must be called with the window lock held.
    fn roll(&self, window: &mut DayWindow) {
        let today = self.clock.date_stamp();
        if window.day != today {
            window.day = today;
            window.count = 0;
        }
    }

    /// Inspect without consuming.
    pub fn check(&self) -> RateDecision {
        if self.is_disabled() {
            return RateDecision {
                allowed: true,
                remaining: 0,
                limit: 0,
            };
        }
        let mut window = self.window.lock();
        self.roll(&mut window);
        RateDecision {
            allowed: window.count < self.limit,
            remaining: self.limit - window.count,
            limit: self.limit,
        }
    }

    /// Consume one unit if the daily budget allows.
    pub fn consume(&self) -> RateDecision {
        if self.is_disabled() {
            return RateDecision {
                allowed: true,
                remaining: 0,
                limit: 0,
            };
        }
        let mut window = self.window.lock();
        self.roll(&mut window);
        if window.count < self.limit {
            window.count += 1;
            RateDecision {
                allowed: true,
                remaining: self.limit - window.count,
                limit: self.limit,
            }
        } else {
            RateDecision {
                allowed: false,
                remaining: 0,
                limit: self.limit,
            }
        }
    }

    pub fn stats(&self) -> RateStats {
        let mut window = self.window.lock();
        self.roll(&mut window);
        RateStats {
            count: window.count,
            limit: self.limit,
            remaining: self.limit.saturating_sub(window.count),
        }
    }
}

#[cfg(test)]
#[path = "rate_limiter_tests.rs"]
mod tests;
