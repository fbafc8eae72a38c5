// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the intake endpoint and their HTTP mapping.

use crate::store::StoreError;
use crate::validator::ValidationError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Try again soon.";

/// Application error types
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Store error: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntakeError {
    /// Taxonomy code, used in logs and metrics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Validation(err) => err.code(),
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::StoreUnavailable(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failure response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    pub message: String,
}

/// Whole seconds for a `Retry-After` header, rounded up.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let millis = retry_after.as_millis() as u64;
    millis.div_ceil(1000)
}

/// Attach `Cache-Control: no-store` to a response.
pub fn no_store(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let status = self.status();
        let response = match self {
            Self::RateLimited { retry_after } => (
                status,
                [(header::RETRY_AFTER, retry_after_secs(retry_after).to_string())],
                Json(ErrorBody {
                    ok: false,
                    code: Some("RATE_LIMITED"),
                    message: RATE_LIMITED_MESSAGE.to_string(),
                }),
            )
                .into_response(),
            Self::Validation(err) => (
                status,
                Json(ErrorBody {
                    ok: false,
                    code: None,
                    message: err.public_message().to_string(),
                }),
            )
                .into_response(),
            Self::StoreUnavailable(_) | Self::Internal(_) => (
                status,
                Json(ErrorBody {
                    ok: false,
                    code: None,
                    message: INTERNAL_ERROR_MESSAGE.to_string(),
                }),
            )
                .into_response(),
        };
        no_store(response)
    }
}
