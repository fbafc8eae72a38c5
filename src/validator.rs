// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Waitlist submission validator.
//!
//! Rules run in a fixed order and the first violation wins:
//! - Email address syntax
//! - Honeypot field must be empty
//! - Minimum time between form render and submission

use crate::config::ValidationConfig;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Generic message returned for rejections that should not reveal which
/// anti-bot heuristic fired.
pub const GENERIC_REJECTION: &str = "Invalid submission";

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Honeypot field was filled in")]
    BotDetected,

    #[error("Submitted {elapsed_ms:?}ms after render, minimum is {min_ms}ms")]
    TooFast { elapsed_ms: Option<i64>, min_ms: i64 },
}

impl ValidationError {
    /// Taxonomy code, used in logs and metrics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "INVALID_EMAIL",
            Self::BotDetected => "BOT_DETECTED",
            Self::TooFast { .. } => "TOO_FAST",
        }
    }

    /// Message shown to the caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "Please enter a valid email",
            Self::BotDetected => GENERIC_REJECTION,
            Self::TooFast { .. } => "Please wait a moment before submitting",
        }
    }
}

/// Raw submission as posted by the signup form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Submission {
    pub email: String,
    /// Honeypot field
    pub website: Option<String>,
    /// Form render time, Unix epoch milliseconds
    pub started_at: Option<i64>,
}

impl Submission {
    /// Build a submission from a request body.
    ///
    /// Anything that is not a JSON object is treated as an empty submission;
    /// mistyped fields are treated as absent, except a non-string honeypot
    /// which counts as filled in.
    pub fn from_json_bytes(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => Self::from_json(&value),
            Err(err) => {
                debug!(error = %err, "Unparseable body, treating as empty");
                Self::default()
            }
        }
    }

    pub fn from_json(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let email = obj
            .get("email")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let website = match obj.get("website") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };

        let started_at = obj
            .get("startedAt")
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .map(|v| v as i64);

        Self {
            email,
            website,
            started_at,
        }
    }
}

/// Submission that passed every rule, with the email normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubmission {
    pub email: String,
    pub website: String,
    pub started_at: i64,
}

/// Result of validation.
#[derive(Debug, Clone)]
pub enum ValidationResult {
    /// Submission is valid
    Valid(ValidSubmission),
    /// Submission is invalid
    Invalid(ValidationError),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            ValidationResult::Valid(_) => None,
            ValidationResult::Invalid(e) => Some(e),
        }
    }
}

/// Waitlist submission validator.
pub struct WaitlistValidator {
    config: ValidationConfig,
    email_pattern: Regex,
}

impl WaitlistValidator {
    /// Create a new validator with the given configuration.
    pub fn new(config: ValidationConfig) -> Self {
        let email_pattern = Regex::new(
            r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$",
        )
        .expect("email pattern is a valid regex");

        Self {
            config,
            email_pattern,
        }
    }

    /// Trim, lowercase and check an email address.
    pub fn normalize_email(&self, raw: &str) -> Option<String> {
        let email = raw.trim().to_lowercase();

        if email.is_empty() || email.len() > self.config.max_email_len {
            return None;
        }
        if email.starts_with('.') || email.contains("..") {
            return None;
        }
        if !self.email_pattern.is_match(&email) {
            return None;
        }

        Some(email)
    }

    /// Validate the honeypot field.
    pub fn validate_honeypot(&self, website: Option<&str>) -> Result<(), ValidationError> {
        match website {
            Some(v) if !v.is_empty() => {
                debug!("Honeypot field filled in");
                Err(ValidationError::BotDetected)
            }
            _ => Ok(()),
        }
    }

    /// Validate the time between form render and submission.
    pub fn validate_timing(&self, started_at: Option<i64>, now_ms: i64) -> Result<i64, ValidationError> {
        let min_ms = self.config.min_submit_ms;
        match started_at {
            Some(started) if now_ms.saturating_sub(started) >= min_ms => Ok(started),
            Some(started) => {
                let elapsed_ms = now_ms.saturating_sub(started);
                debug!(elapsed_ms, min_ms, "Submission too fast");
                Err(ValidationError::TooFast {
                    elapsed_ms: Some(elapsed_ms),
                    min_ms,
                })
            }
            None => {
                debug!("Missing render timestamp");
                Err(ValidationError::TooFast {
                    elapsed_ms: None,
                    min_ms,
                })
            }
        }
    }

    /// Validate a complete submission.
    pub fn validate(&self, submission: &Submission, now_ms: i64) -> ValidationResult {
        let email = match self.normalize_email(&submission.email) {
            Some(email) => email,
            None => {
                debug!("Invalid email syntax");
                return ValidationResult::Invalid(ValidationError::InvalidEmail);
            }
        };

        if let Err(err) = self.validate_honeypot(submission.website.as_deref()) {
            return ValidationResult::Invalid(err);
        }

        let started_at = match self.validate_timing(submission.started_at, now_ms) {
            Ok(started) => started,
            Err(err) => return ValidationResult::Invalid(err),
        };

        ValidationResult::Valid(ValidSubmission {
            email,
            website: submission.website.clone().unwrap_or_default(),
            started_at,
        })
    }
}
