// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Window-based rate limiter for waitlist submissions.
//!
//! Counters live in the shared store, one key per client per aligned
//! window, so several service instances enforce a single budget:
//! 1. Fixed window: increment, then compare against the limit.
//! 2. Sliding window: weight the previous window by how much of it still
//!    overlaps the trailing interval, reject without consuming when full.

use crate::config::{RateLimitConfig, RateLimitStrategy};
use crate::store::{KeyValueStore, Keys, StoreResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Remaining requests in current window
        remaining: u32,
        /// Time until window resets
        reset_in: Duration,
    },
    /// Request is rate limited
    Limited {
        /// Time until the client may retry
        retry_after: Duration,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }

    /// Milliseconds until the window resets; zero when allowed.
    pub fn retry_after_ms(&self) -> u64 {
        match self {
            RateLimitResult::Allowed { .. } => 0,
            RateLimitResult::Limited { retry_after } => retry_after.as_millis() as u64,
        }
    }
}

/// Store-backed rate limiter.
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Arc<dyn KeyValueStore>,
    keys: Keys,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig, store: Arc<dyn KeyValueStore>, keys: Keys) -> Self {
        Self {
            config,
            store,
            keys,
        }
    }

    /// Decide whether `client_key` may make another request at `now_ms`.
    pub async fn admit(&self, client_key: &str, now_ms: i64) -> StoreResult<RateLimitResult> {
        match self.config.strategy {
            RateLimitStrategy::FixedWindow => self.admit_fixed(client_key, now_ms).await,
            RateLimitStrategy::SlidingWindow => self.admit_sliding(client_key, now_ms).await,
        }
    }

    async fn admit_fixed(&self, client_key: &str, now_ms: i64) -> StoreResult<RateLimitResult> {
        let window = Window::at(now_ms, self.config.window_ms());
        let key = self.keys.rate_window(client_key, window.index);

        let count = self
            .store
            .increment(&key, self.config.window_duration().max(Duration::from_secs(1)))
            .await?;

        let max = u64::from(self.config.max_requests);
        if count <= max {
            Ok(RateLimitResult::Allowed {
                remaining: (max - count) as u32,
                reset_in: window.reset_in(now_ms),
            })
        } else {
            let retry_after = window.reset_in(now_ms);
            debug!(client = %client_key, count, ?retry_after, "Client rate limit exceeded");
            Ok(RateLimitResult::Limited { retry_after })
        }
    }

    async fn admit_sliding(&self, client_key: &str, now_ms: i64) -> StoreResult<RateLimitResult> {
        let window = Window::at(now_ms, self.config.window_ms());
        let current_key = self.keys.rate_window(client_key, window.index);
        let previous_key = self.keys.rate_window(client_key, window.index - 1);

        let previous = parse_count(self.store.get(&previous_key).await?);
        let current = parse_count(self.store.get(&current_key).await?);

        let max = f64::from(self.config.max_requests);
        let estimate = weighted(previous, current, window.elapsed_fraction(now_ms));
        if estimate >= max {
            let retry_after = window.reset_in(now_ms);
            debug!(client = %client_key, estimate, ?retry_after, "Client rate limit exceeded");
            return Ok(RateLimitResult::Limited { retry_after });
        }

        // Counters must outlive the following window to serve as its "previous".
        let ttl = self
            .config
            .window_duration()
            .max(Duration::from_secs(1))
            .saturating_mul(2);
        let current = self.store.increment(&current_key, ttl).await?;

        // Another instance may have consumed the last slot between read and increment.
        let before = weighted(previous, current.saturating_sub(1), window.elapsed_fraction(now_ms));
        if before >= max {
            let retry_after = window.reset_in(now_ms);
            debug!(client = %client_key, estimate = before, ?retry_after, "Client rate limit exceeded");
            return Ok(RateLimitResult::Limited { retry_after });
        }

        let estimate = before + 1.0;
        Ok(RateLimitResult::Allowed {
            remaining: (max - estimate).floor().max(0.0) as u32,
            reset_in: window.reset_in(now_ms),
        })
    }
}

/// An aligned time window.
#[derive(Debug, Clone, Copy)]
struct Window {
    index: i64,
    start_ms: i64,
    length_ms: i64,
}

impl Window {
    fn at(now_ms: i64, length_ms: i64) -> Self {
        let index = now_ms.div_euclid(length_ms);
        Self {
            index,
            start_ms: index * length_ms,
            length_ms,
        }
    }

    fn reset_in(&self, now_ms: i64) -> Duration {
        let end_ms = self.start_ms.saturating_add(self.length_ms);
        let remaining = end_ms.saturating_sub(now_ms).clamp(0, self.length_ms);
        Duration::from_millis(remaining as u64)
    }

    fn elapsed_fraction(&self, now_ms: i64) -> f64 {
        (now_ms - self.start_ms) as f64 / self.length_ms as f64
    }
}

fn weighted(previous: u64, current: u64, elapsed_fraction: f64) -> f64 {
    previous as f64 * (1.0 - elapsed_fraction) + current as f64
}

fn parse_count(value: Option<String>) -> u64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0)
}
