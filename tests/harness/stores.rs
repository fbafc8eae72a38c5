// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Store doubles for failure-path tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use waitlist_intake::store::{KeyValueStore, MemoryStore, StoreError, StoreResult};

fn down() -> StoreError {
    StoreError::Unavailable("connection refused".to_string())
}

/// Store that fails every call.
pub struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        Err(down())
    }
    async fn set(&self, _key: &str, _value: &str) -> StoreResult<()> {
        Err(down())
    }
    async fn hash_set(&self, _key: &str, _fields: &[(&str, String)]) -> StoreResult<()> {
        Err(down())
    }
    async fn hash_get_all(&self, _key: &str) -> StoreResult<HashMap<String, String>> {
        Err(down())
    }
    async fn set_add(&self, _key: &str, _member: &str) -> StoreResult<bool> {
        Err(down())
    }
    async fn set_remove(&self, _key: &str, _member: &str) -> StoreResult<bool> {
        Err(down())
    }
    async fn set_contains(&self, _key: &str, _member: &str) -> StoreResult<bool> {
        Err(down())
    }
    async fn set_len(&self, _key: &str) -> StoreResult<u64> {
        Err(down())
    }
    async fn list_push(&self, _key: &str, _value: &str) -> StoreResult<u64> {
        Err(down())
    }
    async fn list_range(&self, _key: &str, _start: i64, _stop: i64) -> StoreResult<Vec<String>> {
        Err(down())
    }
    async fn list_len(&self, _key: &str) -> StoreResult<u64> {
        Err(down())
    }
    async fn increment(&self, _key: &str, _ttl: Duration) -> StoreResult<u64> {
        Err(down())
    }
    async fn ping(&self) -> StoreResult<()> {
        Err(down())
    }
}

/// In-memory store with failures injected on demand.
///
/// Hash writes can be refused outright. List pushes can be applied and then
/// reported as timed out, the way a slow Redis `LPUSH` looks to the caller.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_hash_writes: AtomicBool,
    pub late_push_failure: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_hash_writes.store(failing, Ordering::SeqCst);
    }

    /// Make the next list push land and then fail.
    pub fn fail_next_push_after_write(&self) {
        self.late_push_failure.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.inner.get(key).await
    }
    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.inner.set(key, value).await
    }
    async fn hash_set(&self, key: &str, fields: &[(&str, String)]) -> StoreResult<()> {
        if self.fail_hash_writes.load(Ordering::SeqCst) {
            return Err(down());
        }
        self.inner.hash_set(key, fields).await
    }
    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        self.inner.hash_get_all(key).await
    }
    async fn set_add(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.inner.set_add(key, member).await
    }
    async fn set_remove(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.inner.set_remove(key, member).await
    }
    async fn set_contains(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.inner.set_contains(key, member).await
    }
    async fn set_len(&self, key: &str) -> StoreResult<u64> {
        self.inner.set_len(key).await
    }
    async fn list_push(&self, key: &str, value: &str) -> StoreResult<u64> {
        let len = self.inner.list_push(key, value).await?;
        if self.late_push_failure.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Timeout(Duration::from_secs(3)));
        }
        Ok(len)
    }
    async fn list_range(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        self.inner.list_range(key, start, stop).await
    }
    async fn list_len(&self, key: &str) -> StoreResult<u64> {
        self.inner.list_len(key).await
    }
    async fn increment(&self, key: &str, ttl: Duration) -> StoreResult<u64> {
        self.inner.increment(key, ttl).await
    }
    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }
}

/// Store whose calls never complete.
pub struct HangingStore;

#[async_trait]
impl KeyValueStore for HangingStore {
    async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        std::future::pending().await
    }
    async fn set(&self, _key: &str, _value: &str) -> StoreResult<()> {
        std::future::pending().await
    }
    async fn hash_set(&self, _key: &str, _fields: &[(&str, String)]) -> StoreResult<()> {
        std::future::pending().await
    }
    async fn hash_get_all(&self, _key: &str) -> StoreResult<HashMap<String, String>> {
        std::future::pending().await
    }
    async fn set_add(&self, _key: &str, _member: &str) -> StoreResult<bool> {
        std::future::pending().await
    }
    async fn set_remove(&self, _key: &str, _member: &str) -> StoreResult<bool> {
        std::future::pending().await
    }
    async fn set_contains(&self, _key: &str, _member: &str) -> StoreResult<bool> {
        std::future::pending().await
    }
    async fn set_len(&self, _key: &str) -> StoreResult<u64> {
        std::future::pending().await
    }
    async fn list_push(&self, _key: &str, _value: &str) -> StoreResult<u64> {
        std::future::pending().await
    }
    async fn list_range(&self, _key: &str, _start: i64, _stop: i64) -> StoreResult<Vec<String>> {
        std::future::pending().await
    }
    async fn list_len(&self, _key: &str) -> StoreResult<u64> {
        std::future::pending().await
    }
    async fn increment(&self, _key: &str, _ttl: Duration) -> StoreResult<u64> {
        std::future::pending().await
    }
    async fn ping(&self) -> StoreResult<()> {
        std::future::pending().await
    }
}
