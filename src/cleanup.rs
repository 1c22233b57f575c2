//! Background sweep of expired login rate-limit windows.
//!
//! Entries are also dropped lazily when the table is full; the sweep keeps
//! memory flat between bursts from many distinct addresses.

use crate::auth::rate_limit::LoginRateLimiter;
use std::sync::Arc;
use std::time::Duration;

/// Run the sweep loop.
///
/// Every `interval`, removes rate-limit entries whose window has ended.
pub async fn run_sweep_loop(limiter: Arc<LoginRateLimiter>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        sweep_once(&limiter);
    }
}

/// Sweep once at the limiter's current time. Returns how many entries were removed.
pub fn sweep_once(limiter: &LoginRateLimiter) -> usize {
    let now = limiter.clock().now();
    let removed = limiter.sweep(now);
    if removed > 0 {
        tracing::info!(
            removed = removed,
            remaining = limiter.len(),
            "Rate limit sweep completed"
        );
    }
    removed
}
