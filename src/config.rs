// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the waitlist intake service.
//!
//! Defaults match the landing page's signup policy: 5 submissions per
//! minute per client, 800ms minimum time between form render and submit.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Configuration for the waitlist intake service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Validation configuration
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Cross-origin configuration
    #[serde(default)]
    pub cors: CorsConfig,
}

/// Window strategy used by the rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitStrategy {
    /// Counter per aligned window; resets at the window boundary.
    #[default]
    FixedWindow,
    /// Weighted blend of the previous and current fixed windows.
    SlidingWindow,
}

/// Per-client rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum admitted requests per window per client (default: 5)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds (default: 60)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Window strategy (default: fixed window)
    #[serde(default)]
    pub strategy: RateLimitStrategy,
}

/// Validation configuration for signup submissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Minimum milliseconds between form render and submission (default: 800)
    #[serde(default = "default_min_submit_ms")]
    pub min_submit_ms: i64,

    /// Maximum accepted email length (default: 254)
    #[serde(default = "default_max_email_len")]
    pub max_email_len: usize,
}

/// Which store implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Memory,
    Redis,
}

/// Shared key-value store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Redis connection URL, used with the `redis` backend
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Prefix for every key the service writes (default: waitlist)
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Source tag stored on each subscriber record
    #[serde(default = "default_source_tag")]
    pub source_tag: String,

    /// Upper bound for a single store call in milliseconds (default: 3000)
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

/// Cross-origin configuration. An empty list disables the CORS layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    60
}

fn default_min_submit_ms() -> i64 {
    800
}

fn default_max_email_len() -> usize {
    254 // RFC 5321 path limit
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_key_prefix() -> String {
    "waitlist".to_string()
}

fn default_source_tag() -> String {
    "nexbolt-landing".to_string()
}

fn default_store_timeout_ms() -> u64 {
    3000
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            rate_limit: RateLimitConfig::default(),
            validation: ValidationConfig::default(),
            store: StoreConfig::default(),
            metrics: MetricsConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            strategy: RateLimitStrategy::default(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_submit_ms: default_min_submit_ms(),
            max_email_len: default_max_email_len(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: default_redis_url(),
            key_prefix: default_key_prefix(),
            source_tag: default_source_tag(),
            timeout_ms: default_store_timeout_ms(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl RateLimitConfig {
    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Window length in milliseconds, never zero, capped at `i64::MAX`.
    pub fn window_ms(&self) -> i64 {
        let millis = self.window_secs.max(1).saturating_mul(1000);
        i64::try_from(millis).unwrap_or(i64::MAX)
    }
}

impl StoreConfig {
    /// Get the per-call store timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Missing or unparseable values fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let strategy = match lookup("WAITLIST_RATE_STRATEGY").as_deref().map(str::trim) {
            Some("sliding") | Some("sliding_window") => RateLimitStrategy::SlidingWindow,
            _ => RateLimitStrategy::FixedWindow,
        };

        let backend = match lookup("WAITLIST_STORE").as_deref().map(str::trim) {
            Some("redis") => StoreBackend::Redis,
            _ => StoreBackend::Memory,
        };

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Config {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            rate_limit: RateLimitConfig {
                max_requests: parse_var(&lookup, "WAITLIST_MAX_REQUESTS")
                    .unwrap_or(defaults.rate_limit.max_requests),
                window_secs: parse_var(&lookup, "WAITLIST_WINDOW_SECS")
                    .unwrap_or(defaults.rate_limit.window_secs),
                strategy,
            },
            validation: ValidationConfig {
                min_submit_ms: parse_var(&lookup, "WAITLIST_MIN_SUBMIT_MS")
                    .unwrap_or(defaults.validation.min_submit_ms),
                ..defaults.validation
            },
            store: StoreConfig {
                backend,
                redis_url: lookup("REDIS_URL").unwrap_or(defaults.store.redis_url),
                key_prefix: lookup("WAITLIST_KEY_PREFIX").unwrap_or(defaults.store.key_prefix),
                source_tag: lookup("WAITLIST_SOURCE_TAG").unwrap_or(defaults.store.source_tag),
                timeout_ms: parse_var(&lookup, "STORE_TIMEOUT_MS").unwrap_or(defaults.store.timeout_ms),
            },
            metrics: MetricsConfig {
                enabled: parse_var(&lookup, "METRICS_ENABLED").unwrap_or(defaults.metrics.enabled),
                ..defaults.metrics
            },
            cors: CorsConfig { allowed_origins },
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}
