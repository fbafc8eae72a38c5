// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Waitlist Intake
//!
//! This crate provides the signup endpoint behind a product landing page:
//!
//! - Per-client rate limiting (5 per minute default)
//! - Email syntax validation
//! - Honeypot and minimum-fill-time bot checks
//! - Email deduplication with a chronological signup log
//! - Pluggable key-value store (in-memory or Redis)

pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod recorder;
pub mod store;
pub mod validator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::IntakeError;
pub use handlers::{router, AppState};
pub use limiter::{RateLimitResult, RateLimiter};
pub use recorder::{RecordOutcome, SubmissionRecorder, SubscriberRecord};
pub use store::{KeyValueStore, MemoryStore, StoreError};
pub use validator::{Submission, ValidationResult, WaitlistValidator};
