// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Waitlist Intake Service
//!
//! Accepts waitlist signups from the landing page form at
//! `POST /api/waitlist`, rate limited per client IP and deduplicated by
//! email.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (and `.env`):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `WAITLIST_MAX_REQUESTS`: Submissions per window per client (default: 5)
//! - `WAITLIST_WINDOW_SECS`: Rate window length (default: 60)
//! - `WAITLIST_RATE_STRATEGY`: `fixed` or `sliding` (default: fixed)
//! - `WAITLIST_MIN_SUBMIT_MS`: Minimum form fill time (default: 800)
//! - `WAITLIST_STORE`: `memory` or `redis` (default: memory)
//! - `REDIS_URL`: Redis URL for the `redis` store
//! - `STORE_TIMEOUT_MS`: Per-call store timeout (default: 3000)
//! - `ALLOWED_ORIGINS`: Comma separated CORS origins (default: none)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use waitlist_intake::{
    config::{Config, StoreBackend},
    handlers::{router, AppState},
    store::{KeyValueStore, MemoryStore},
    SystemClock,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    info!(
        bind_addr = %config.bind_addr,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        strategy = ?config.rate_limit.strategy,
        min_submit_ms = config.validation.min_submit_ms,
        backend = ?config.store.backend,
        "Starting waitlist intake"
    );

    let store = open_store(&config).await?;
    let state = Arc::new(AppState::new(config.clone(), store, Arc::new(SystemClock))?);

    let app = router(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Open the configured store. The in-memory store gets a cleanup task.
async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            let store = MemoryStore::new();

            let cleanup_store = store.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(60));
                loop {
                    interval.tick().await;
                    cleanup_store.cleanup().await;
                }
            });

            Ok(Arc::new(store))
        }
        StoreBackend::Redis => open_redis(config).await,
    }
}

#[cfg(feature = "redis-backend")]
async fn open_redis(config: &Config) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let store = waitlist_intake::store::RedisStore::connect(&config.store.redis_url).await?;
    info!("Connected to Redis");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis-backend"))]
async fn open_redis(_config: &Config) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    tracing::warn!("Built without the redis-backend feature");
    anyhow::bail!("WAITLIST_STORE=redis requires the redis-backend feature")
}
