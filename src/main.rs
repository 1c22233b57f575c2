//! admin-gate entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Build shared state (clock + login rate limiter)
//! 3. Start the rate-limit sweep task
//! 4. Build router with API routes, CORS and security headers
//! 5. Start Axum server

use admin_gate::{
    auth::AppState,
    cleanup,
    clock::{Clock, SystemClock},
    config::Config,
    routes,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config from environment
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(config = ?config, "Starting admin-gate on {}", config.bind_addr);

    if config.admin_token.is_none() {
        // Not fatal: every admin request will fail closed with a 500.
        tracing::warn!("ADMIN_TOKEN is not set; admin endpoints will reject all requests");
    }

    let bind_addr = config.bind_addr;
    let sweep_interval = Duration::from_secs(config.rate_limit_sweep_secs);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::new(config, clock);

    tokio::spawn(cleanup::run_sweep_loop(
        state.limiter.clone(),
        sweep_interval,
    ));

    let app = routes::app(state);

    let listener = match tokio::net::TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "Failed to bind {}", bind_addr);
            std::process::exit(1);
        }
    };
    tracing::info!("Listening on {}", bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
