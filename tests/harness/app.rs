// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! In-process driver for the HTTP router.

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use waitlist_intake::{
    handlers::{router, AppState},
    store::{KeyValueStore, MemoryStore},
    Config, ManualClock,
};

/// Epoch milliseconds at the start of a 60s window.
pub const T0: i64 = 1_699_999_980_000;

/// Response captured from the router.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Router plus handles on its store and clock.
pub struct TestApp {
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
    pub store: MemoryStore,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(T0));
        let state = AppState::new(config, Arc::new(store.clone()), clock.clone())
            .expect("metrics registry");

        Self {
            state: Arc::new(state),
            clock,
            store,
        }
    }

    /// Build an app on top of a custom store.
    pub fn with_store(config: Config, store: Arc<dyn KeyValueStore>) -> Self {
        let clock = Arc::new(ManualClock::new(T0));
        let state = AppState::new(config, store, clock.clone()).expect("metrics registry");

        Self {
            state: Arc::new(state),
            clock,
            store: MemoryStore::new(),
        }
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// A well-formed submission rendered `age_ms` before the current clock.
    pub fn payload(&self, email: &str, age_ms: i64) -> Value {
        json!({
            "email": email,
            "website": "",
            "startedAt": self.clock_now() - age_ms,
        })
    }

    pub fn clock_now(&self) -> i64 {
        use waitlist_intake::Clock;
        self.clock.now_ms()
    }

    /// POST a JSON value to the waitlist endpoint.
    pub async fn submit(&self, ip: Option<&str>, body: &Value) -> TestResponse {
        self.submit_raw(ip, body.to_string().into_bytes()).await
    }

    /// POST raw bytes to the waitlist endpoint.
    pub async fn submit_raw(&self, ip: Option<&str>, body: Vec<u8>) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/waitlist")
            .header("content-type", "application/json")
            .header("user-agent", "harness/1.0");
        if let Some(ip) = ip {
            builder = builder.header("x-forwarded-for", ip);
        }
        let request = builder.body(Body::from(body)).unwrap();

        self.send(request).await
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        TestResponse {
            status,
            headers,
            body,
        }
    }
}
