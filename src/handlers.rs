// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the waitlist intake service.
//!
//! A submission moves through
//! `Received → RateChecked → Validated → Recorded → Responded`; any
//! rejection jumps straight to `Responded`. Errors never leave the handler
//! raw: they become one of the JSON bodies defined in [`crate::error`].

use crate::clock::Clock;
use crate::config::Config;
use crate::error::{no_store, IntakeError, INTERNAL_ERROR_MESSAGE};
use crate::limiter::{RateLimitResult, RateLimiter};
use crate::metrics::{IntakeMetrics, Outcome};
use crate::recorder::{SubmissionRecorder, SubscriberRecord};
use crate::store::{KeyValueStore, Keys, TimeoutStore};
use crate::validator::{Submission, ValidationError, ValidationResult, WaitlistValidator};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Sentinel client identifier when no forwarding header is present.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Shared application state.
pub struct AppState {
    pub limiter: RateLimiter,
    pub validator: WaitlistValidator,
    pub recorder: SubmissionRecorder,
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
    pub metrics: IntakeMetrics,
    pub config: Config,
}

impl AppState {
    /// Wire every component to one store, bounded by the configured timeout.
    pub fn new(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, prometheus::Error> {
        let store: Arc<dyn KeyValueStore> =
            Arc::new(TimeoutStore::new(store, config.store.timeout()));
        let keys = Keys::new(config.store.key_prefix.clone());

        Ok(Self {
            limiter: RateLimiter::new(config.rate_limit.clone(), store.clone(), keys.clone()),
            validator: WaitlistValidator::new(config.validation.clone()),
            recorder: SubmissionRecorder::new(store.clone(), keys),
            store,
            clock,
            metrics: IntakeMetrics::new()?,
            config,
        })
    }
}

/// Successful submission body.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub ok: bool,
    pub deduped: bool,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

/// Processing stage, reported when a submission leaves the pipeline early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Received,
    RateChecked,
    Validated,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/api/waitlist", post(submit))
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/readyz", get(ready));

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    let mut app = app
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors_layer(&state.config.cors.allowed_origins) {
        app = app.layer(cors);
    }

    app.with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.trim().parse().ok())
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]),
    )
}

/// Derive the client identifier from forwarding headers.
///
/// Uses the first hop of `X-Forwarded-For`, then `X-Real-IP`, then the
/// `"unknown"` sentinel.
pub fn client_ip(headers: &HeaderMap) -> String {
    let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    header_str("x-forwarded-for")
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .or_else(|| {
            header_str("x-real-ip")
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
        })
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "waitlist-intake",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness endpoint: the store must answer a ping.
pub async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadyResponse {
                status: "ready",
                reason: None,
            }),
        ),
        Err(err) => {
            warn!(error = %err, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    status: "not_ready",
                    reason: Some("store_unavailable"),
                }),
            )
        }
    }
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok((content_type, body)) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Err(err) => {
            error!(error = %err, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Accept a waitlist signup.
///
/// A body that cannot be read (including one over the size limit) is
/// handled as an empty submission, so the caller still gets a JSON reply.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();
    let ip = client_ip(&headers);

    let body = body.unwrap_or_else(|rejection| {
        debug!(ip = %ip, status = %rejection.status(), error = %rejection, "Unreadable request body");
        Bytes::new()
    });

    let result = process(&state, &ip, &headers, &body).await;
    let elapsed = started.elapsed().as_secs_f64();

    match result {
        Ok(is_new) => {
            let outcome = if is_new { Outcome::Accepted } else { Outcome::Duplicate };
            state.metrics.observe(outcome, elapsed);
            info!(ip = %ip, deduped = !is_new, "Waitlist signup accepted");
            no_store(
                (
                    StatusCode::OK,
                    Json(SubmitResponse {
                        ok: true,
                        deduped: !is_new,
                    }),
                )
                    .into_response(),
            )
        }
        Err((stage, err)) => {
            state.metrics.observe(outcome_for(&err), elapsed);
            match &err {
                IntakeError::RateLimited { retry_after } => {
                    warn!(ip = %ip, retry_after_ms = retry_after.as_millis() as u64, "Submission rate limited");
                }
                IntakeError::Validation(v) => {
                    info!(ip = %ip, code = v.code(), "Submission rejected");
                }
                IntakeError::StoreUnavailable(_) | IntakeError::Internal(_) => {
                    error!(ip = %ip, stage = ?stage, code = err.code(), error = %err, "Submission failed");
                }
            }
            err.into_response()
        }
    }
}

/// Run one submission through the pipeline. Returns whether the email is new.
async fn process(
    state: &AppState,
    ip: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<bool, (Stage, IntakeError)> {
    let now_ms = state.clock.now_ms();

    let rate_key = format!("waitlist:{ip}");
    match state.limiter.admit(&rate_key, now_ms).await {
        Ok(RateLimitResult::Allowed { remaining, .. }) => {
            debug!(ip = %ip, remaining, "Rate check passed");
        }
        Ok(RateLimitResult::Limited { retry_after }) => {
            return Err((Stage::Received, IntakeError::RateLimited { retry_after }));
        }
        Err(err) => return Err((Stage::Received, err.into())),
    }

    let submission = Submission::from_json_bytes(body);
    let valid = match state.validator.validate(&submission, now_ms) {
        ValidationResult::Valid(valid) => valid,
        ValidationResult::Invalid(err) => return Err((Stage::RateChecked, err.into())),
    };

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let record = SubscriberRecord {
        email: valid.email,
        website: valid.website,
        client_ip: ip.to_string(),
        user_agent,
        received_at: now_ms,
        source: state.config.store.source_tag.clone(),
        started_at: valid.started_at,
    };

    let outcome = state
        .recorder
        .record(&record)
        .await
        .map_err(|err| (Stage::Validated, IntakeError::from(err)))?;

    Ok(outcome.is_new)
}

fn outcome_for(err: &IntakeError) -> Outcome {
    match err {
        IntakeError::RateLimited { .. } => Outcome::RateLimited,
        IntakeError::Validation(ValidationError::InvalidEmail) => Outcome::InvalidEmail,
        IntakeError::Validation(ValidationError::BotDetected) => Outcome::BotDetected,
        IntakeError::Validation(ValidationError::TooFast { .. }) => Outcome::TooFast,
        IntakeError::StoreUnavailable(_) => Outcome::StoreUnavailable,
        IntakeError::Internal(_) => Outcome::InternalError,
    }
}

/// Convert a handler panic into the generic 500 body.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(detail = %detail, "Handler panicked");

    IntakeError::Internal(detail).into_response()
}
