// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Deduplicating signup recorder.
//!
//! The known-email set decides first-time versus repeat signups. Set-add
//! is the only membership test, so two concurrent submissions of the same
//! address cannot both append to the signup log.

use crate::store::{KeyValueStore, Keys, StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Latest submission details for one email. Overwritten on every submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberRecord {
    pub email: String,
    pub website: String,
    pub client_ip: String,
    pub user_agent: String,
    /// Unix epoch milliseconds
    pub received_at: i64,
    pub source: String,
    /// Unix epoch milliseconds
    pub started_at: i64,
}

impl SubscriberRecord {
    fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("email", self.email.clone()),
            ("website", self.website.clone()),
            ("ip", self.client_ip.clone()),
            ("ua", self.user_agent.clone()),
            ("ts", self.received_at.to_string()),
            ("source", self.source.clone()),
            ("startedAt", self.started_at.to_string()),
        ]
    }

    fn from_fields(fields: &std::collections::HashMap<String, String>) -> Option<Self> {
        let text = |name: &str| fields.get(name).cloned().unwrap_or_default();
        let number = |name: &str| fields.get(name).and_then(|v| v.parse().ok()).unwrap_or(0);

        Some(Self {
            email: fields.get("email")?.clone(),
            website: text("website"),
            client_ip: text("ip"),
            user_agent: text("ua"),
            received_at: number("ts"),
            source: text("source"),
            started_at: number("startedAt"),
        })
    }
}

/// Entry in the chronological signup log, written once per new email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupLogEntry {
    pub email: String,
    pub website: String,
    pub ts: i64,
    pub ip: String,
}

impl From<&SubscriberRecord> for SignupLogEntry {
    fn from(record: &SubscriberRecord) -> Self {
        Self {
            email: record.email.clone(),
            website: record.website.clone(),
            ts: record.received_at,
            ip: record.client_ip.clone(),
        }
    }
}

/// Outcome of recording a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOutcome {
    /// `false` when the email was already on the list
    pub is_new: bool,
}

/// Persists submissions into the shared store.
pub struct SubmissionRecorder {
    store: Arc<dyn KeyValueStore>,
    keys: Keys,
}

impl SubmissionRecorder {
    pub fn new(store: Arc<dyn KeyValueStore>, keys: Keys) -> Self {
        Self { store, keys }
    }

    /// Record a submission: dedup, upsert the record, log new signups.
    ///
    /// A fresh membership is released only when the record upsert fails.
    /// Once the log append has been issued it may have landed even if the
    /// call errored, so membership is kept and a retry reports a duplicate.
    pub async fn record(&self, record: &SubscriberRecord) -> StoreResult<RecordOutcome> {
        let entry = serde_json::to_string(&SignupLogEntry::from(record))
            .map_err(|e| StoreError::Unavailable(format!("encode signup entry: {e}")))?;
        let is_new = self.store.set_add(&self.keys.emails(), &record.email).await?;

        if let Err(err) = self
            .store
            .hash_set(&self.keys.subscriber(&record.email), &record.to_fields())
            .await
        {
            if is_new {
                self.release(&record.email).await;
            }
            return Err(err);
        }

        if is_new {
            if let Err(err) = self.store.list_push(&self.keys.signup_log(), &entry).await {
                warn!(error = %err, "Signup log append failed, keeping email membership");
                return Err(err);
            }
        }

        debug!(is_new, "Submission recorded");
        Ok(RecordOutcome { is_new })
    }

    /// Undo a fresh set membership so a retry is not mistaken for a duplicate.
    async fn release(&self, email: &str) {
        if let Err(err) = self.store.set_remove(&self.keys.emails(), email).await {
            warn!(error = %err, "Failed to roll back email membership after store error");
        }
    }

    /// Fetch the stored record for an email.
    pub async fn subscriber(&self, email: &str) -> StoreResult<Option<SubscriberRecord>> {
        let fields = self.store.hash_get_all(&self.keys.subscriber(email)).await?;
        Ok(SubscriberRecord::from_fields(&fields))
    }

    /// Most recent signups, newest first.
    pub async fn recent_signups(&self, limit: usize) -> StoreResult<Vec<SignupLogEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let raw = self
            .store
            .list_range(&self.keys.signup_log(), 0, limit as i64 - 1)
            .await?;

        Ok(raw
            .iter()
            .filter_map(|entry| match serde_json::from_str(entry) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    warn!(error = %err, "Skipping unreadable signup log entry");
                    None
                }
            })
            .collect())
    }

    /// Number of unique emails accepted so far.
    pub async fn subscriber_count(&self) -> StoreResult<u64> {
        self.store.set_len(&self.keys.emails()).await
    }

    /// Number of entries in the signup log.
    pub async fn signup_log_len(&self) -> StoreResult<u64> {
        self.store.list_len(&self.keys.signup_log()).await
    }
}
