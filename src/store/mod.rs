// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Shared key-value store.
//!
//! All state shared between requests lives behind [`KeyValueStore`]: rate
//! limit counters, the known-email set, subscriber hashes and the signup
//! log. Atomicity of increment, set-add and list-push is the store's job;
//! callers never lock in-process.
//!
//! ## Key layout
//!
//! ```text
//! {prefix}:emails                 → set of accepted emails
//! {prefix}:sub:{email}            → hash with the latest submission
//! {prefix}:chron                  → list of signup events, newest first
//! {prefix}:rl:{client}:{window}   → request counter for one window
//! ```

mod memory;
#[cfg(feature = "redis-backend")]
mod redis;

pub use memory::MemoryStore;
#[cfg(feature = "redis-backend")]
pub use self::redis::RedisStore;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Store failure. Every variant surfaces to callers as `STORE_UNAVAILABLE`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("key {0} holds a value of another type")]
    WrongType(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Key-value operations the intake path relies on.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Upsert fields of a hash; existing fields are overwritten.
    async fn hash_set(&self, key: &str, fields: &[(&str, String)]) -> StoreResult<()>;

    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>>;

    /// Add a member to a set. Returns `true` when it was not already present.
    async fn set_add(&self, key: &str, member: &str) -> StoreResult<bool>;

    async fn set_remove(&self, key: &str, member: &str) -> StoreResult<bool>;

    async fn set_contains(&self, key: &str, member: &str) -> StoreResult<bool>;

    async fn set_len(&self, key: &str) -> StoreResult<u64>;

    /// Prepend to a list. Returns the new length.
    async fn list_push(&self, key: &str, value: &str) -> StoreResult<u64>;

    /// Inclusive range; negative indices count from the end.
    async fn list_range(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>>;

    async fn list_len(&self, key: &str) -> StoreResult<u64>;

    /// Atomically increment a counter, creating it with `ttl` if absent.
    async fn increment(&self, key: &str, ttl: Duration) -> StoreResult<u64>;

    async fn ping(&self) -> StoreResult<()>;
}

/// Builds the keys of the store schema for one prefix.
#[derive(Debug, Clone)]
pub struct Keys {
    prefix: String,
}

impl Keys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn emails(&self) -> String {
        format!("{}:emails", self.prefix)
    }

    pub fn subscriber(&self, email: &str) -> String {
        format!("{}:sub:{}", self.prefix, email)
    }

    pub fn signup_log(&self) -> String {
        format!("{}:chron", self.prefix)
    }

    pub fn rate_window(&self, client_key: &str, window_index: i64) -> String {
        format!("{}:rl:{}:{}", self.prefix, client_key, window_index)
    }
}

/// Bounds every call of the wrapped store by a fixed timeout.
pub struct TimeoutStore {
    inner: Arc<dyn KeyValueStore>,
    timeout: Duration,
}

impl TimeoutStore {
    pub fn new(inner: Arc<dyn KeyValueStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T, F>(&self, call: F) -> StoreResult<T>
    where
        F: std::future::Future<Output = StoreResult<T>> + Send,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "Store call timed out");
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for TimeoutStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.bounded(self.inner.get(key)).await
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.bounded(self.inner.set(key, value)).await
    }

    async fn hash_set(&self, key: &str, fields: &[(&str, String)]) -> StoreResult<()> {
        self.bounded(self.inner.hash_set(key, fields)).await
    }

    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        self.bounded(self.inner.hash_get_all(key)).await
    }

    async fn set_add(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.bounded(self.inner.set_add(key, member)).await
    }

    async fn set_remove(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.bounded(self.inner.set_remove(key, member)).await
    }

    async fn set_contains(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.bounded(self.inner.set_contains(key, member)).await
    }

    async fn set_len(&self, key: &str) -> StoreResult<u64> {
        self.bounded(self.inner.set_len(key)).await
    }

    async fn list_push(&self, key: &str, value: &str) -> StoreResult<u64> {
        self.bounded(self.inner.list_push(key, value)).await
    }

    async fn list_range(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        self.bounded(self.inner.list_range(key, start, stop)).await
    }

    async fn list_len(&self, key: &str) -> StoreResult<u64> {
        self.bounded(self.inner.list_len(key)).await
    }

    async fn increment(&self, key: &str, ttl: Duration) -> StoreResult<u64> {
        self.bounded(self.inner.increment(key, ttl)).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.bounded(self.inner.ping()).await
    }
}
