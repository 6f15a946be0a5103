// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Retry and polling policies.
//!
//! Plain value types so the domain can describe "how long" and "how often"
//! without depending on the infrastructure that actually sleeps.

use std::time::Duration;

/// Fixed-backoff retry: at most `max_attempts` tries, `delay` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// Bounded polling: check every `interval` until `timeout` elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// A bounded wait for an externally produced condition did not finish.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WaitError {
    #[error("timed out after {timeout:?} waiting for {condition}")]
    TimedOut { condition: String, timeout: Duration },

    #[error("cancelled while waiting for {condition}")]
    Cancelled { condition: String },

    #[error("cannot check for {condition}: {reason}")]
    Inaccessible { condition: String, reason: String },
}
