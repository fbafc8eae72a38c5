// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! In-process store for single-instance deployments and tests.

use super::{KeyValueStore, StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
enum Value {
    Str(String),
    Hash(HashMap<String, String>),
    Set(HashSet<String>),
    List(VecDeque<String>),
    Counter(u64),
}

#[derive(Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Thread-safe in-memory key-value store.
///
/// Each operation runs under a single write or read guard, which gives the
/// same per-command atomicity a Redis server does.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove expired entries (should be called periodically).
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "Purged expired store entries");
        }
    }

    /// Number of live keys.
    pub async fn key_count(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|e| !e.is_expired(now)).count()
    }

    /// Fetch a live entry mutably, dropping it first if it has expired.
    fn live_entry<'a>(
        entries: &'a mut HashMap<String, Entry>,
        key: &str,
    ) -> Option<&'a mut Entry> {
        let now = Instant::now();
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }

    fn live_ref<'a>(entries: &'a HashMap<String, Entry>, key: &str) -> Option<&'a Entry> {
        let now = Instant::now();
        entries.get(key).filter(|e| !e.is_expired(now))
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::WrongType(key.to_string())
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.read().await;
        match Self::live_ref(&entries, key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s.clone())),
            Some(Value::Counter(n)) => Ok(Some(n.to_string())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), Entry::new(Value::Str(value.to_string())));
        Ok(())
    }

    async fn hash_set(&self, key: &str, fields: &[(&str, String)]) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        if Self::live_entry(&mut entries, key).is_none() {
            entries.insert(key.to_string(), Entry::new(Value::Hash(HashMap::new())));
        }
        match entries.get_mut(key).map(|e| &mut e.value) {
            Some(Value::Hash(hash)) => {
                for (field, value) in fields {
                    hash.insert((*field).to_string(), value.clone());
                }
                Ok(())
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let entries = self.entries.read().await;
        match Self::live_ref(&entries, key).map(|e| &e.value) {
            None => Ok(HashMap::new()),
            Some(Value::Hash(hash)) => Ok(hash.clone()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set_add(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut entries = self.entries.write().await;
        if Self::live_entry(&mut entries, key).is_none() {
            entries.insert(key.to_string(), Entry::new(Value::Set(HashSet::new())));
        }
        match entries.get_mut(key).map(|e| &mut e.value) {
            Some(Value::Set(set)) => Ok(set.insert(member.to_string())),
            _ => Err(wrong_type(key)),
        }
    }

    async fn set_remove(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut entries = self.entries.write().await;
        match Self::live_entry(&mut entries, key).map(|e| &mut e.value) {
            None => Ok(false),
            Some(Value::Set(set)) => Ok(set.remove(member)),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set_contains(&self, key: &str, member: &str) -> StoreResult<bool> {
        let entries = self.entries.read().await;
        match Self::live_ref(&entries, key).map(|e| &e.value) {
            None => Ok(false),
            Some(Value::Set(set)) => Ok(set.contains(member)),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set_len(&self, key: &str) -> StoreResult<u64> {
        let entries = self.entries.read().await;
        match Self::live_ref(&entries, key).map(|e| &e.value) {
            None => Ok(0),
            Some(Value::Set(set)) => Ok(set.len() as u64),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn list_push(&self, key: &str, value: &str) -> StoreResult<u64> {
        let mut entries = self.entries.write().await;
        if Self::live_entry(&mut entries, key).is_none() {
            entries.insert(key.to_string(), Entry::new(Value::List(VecDeque::new())));
        }
        match entries.get_mut(key).map(|e| &mut e.value) {
            Some(Value::List(list)) => {
                list.push_front(value.to_string());
                Ok(list.len() as u64)
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn list_range(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        let entries = self.entries.read().await;
        let list = match Self::live_ref(&entries, key).map(|e| &e.value) {
            None => return Ok(Vec::new()),
            Some(Value::List(list)) => list,
            Some(_) => return Err(wrong_type(key)),
        };

        let len = list.len() as i64;
        let resolve = |idx: i64| if idx < 0 { len + idx } else { idx };
        let start = resolve(start).max(0);
        let stop = resolve(stop).min(len - 1);
        if len == 0 || start > stop {
            return Ok(Vec::new());
        }

        Ok(list
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .cloned()
            .collect())
    }

    async fn list_len(&self, key: &str) -> StoreResult<u64> {
        let entries = self.entries.read().await;
        match Self::live_ref(&entries, key).map(|e| &e.value) {
            None => Ok(0),
            Some(Value::List(list)) => Ok(list.len() as u64),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn increment(&self, key: &str, ttl: Duration) -> StoreResult<u64> {
        let mut entries = self.entries.write().await;
        if Self::live_entry(&mut entries, key).is_none() {
            entries.insert(
                key.to_string(),
                Entry {
                    value: Value::Counter(0),
                    expires_at: Instant::now().checked_add(ttl),
                },
            );
        }
        match entries.get_mut(key).map(|e| &mut e.value) {
            Some(Value::Counter(n)) => {
                *n += 1;
                Ok(*n)
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
