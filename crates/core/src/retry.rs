// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry and wait policies for the protocol loops
//!
//! Attempt counts, multipliers, and wait durations are configuration, not
//! constants: every loop in the protocol is parameterized by one of these.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded exponential backoff
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts before the loop fails (first try included)
    pub max_attempts: u32,
    /// Delay before the first retry
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    /// Growth factor applied per retry
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            multiplier,
        }
    }

    /// Delay before retrying after the given 1-based attempt, or `None` once
    /// the budget is spent.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        Some(self.base_delay.mul_f64(factor.max(0.0)))
    }
}

/// Fixed-interval wait used while the semaphore is saturated
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitPolicy {
    /// Pause between polls of the record
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
    /// Polls before giving up
    pub max_waits: u32,
}

impl WaitPolicy {
    pub fn new(delay: Duration, max_waits: u32) -> Self {
        Self { delay, max_waits }
    }

    /// Delay before the next poll after `waits` completed waits, or `None`
    /// once the budget is spent.
    pub fn delay_after(&self, waits: u32) -> Option<Duration> {
        (waits < self.max_waits).then_some(self.delay)
    }
}
