// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for the intake endpoint.

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Outcome label values for `waitlist_submissions_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Accepted,
    Duplicate,
    RateLimited,
    InvalidEmail,
    BotDetected,
    TooFast,
    StoreUnavailable,
    InternalError,
}

impl Outcome {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Duplicate => "duplicate",
            Self::RateLimited => "rate_limited",
            Self::InvalidEmail => "invalid_email",
            Self::BotDetected => "bot_detected",
            Self::TooFast => "too_fast",
            Self::StoreUnavailable => "store_unavailable",
            Self::InternalError => "internal_error",
        }
    }
}

/// Metrics registry for the service.
pub struct IntakeMetrics {
    registry: Registry,
    submissions: IntCounterVec,
    duration: HistogramVec,
}

impl IntakeMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let submissions = IntCounterVec::new(
            Opts::new("waitlist_submissions_total", "Waitlist submissions by outcome"),
            &["outcome"],
        )?;
        let duration = HistogramVec::new(
            HistogramOpts::new(
                "waitlist_request_duration_seconds",
                "Time spent handling waitlist submissions",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["outcome"],
        )?;

        registry.register(Box::new(submissions.clone()))?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            registry,
            submissions,
            duration,
        })
    }

    /// Count one handled submission.
    pub fn observe(&self, outcome: Outcome, elapsed_secs: f64) {
        self.submissions.with_label_values(&[outcome.as_label()]).inc();
        self.duration
            .with_label_values(&[outcome.as_label()])
            .observe(elapsed_secs);
    }

    pub fn count(&self, outcome: Outcome) -> u64 {
        self.submissions.with_label_values(&[outcome.as_label()]).get()
    }

    /// Encode all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> Result<(String, String), prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        let body = String::from_utf8_lossy(&buffer).into_owned();
        Ok((encoder.format_type().to_string(), body))
    }
}
