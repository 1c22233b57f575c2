//! Shared state and the Axum extractor that guards admin handlers.

use crate::auth::guard::{self, AccessGrant};
use crate::auth::rate_limit::LoginRateLimiter;
use crate::clock::Clock;
use crate::config::Config;
use crate::error::AppError;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
    pub limiter: Arc<LoginRateLimiter>,
}

impl AppState {
    /// Build state with a login limiter sized from `config`.
    pub fn new(config: Config, clock: Arc<dyn Clock>) -> Self {
        let limiter = LoginRateLimiter::new(
            clock.clone(),
            config.login_max_attempts,
            Duration::from_secs(config.login_window_secs),
            config.rate_limit_max_entries,
        );
        Self {
            config: Arc::new(config),
            clock,
            limiter: Arc::new(limiter),
        }
    }

    pub fn admin_token(&self) -> Option<&str> {
        self.config.admin_token.as_deref()
    }
}

/// Admin-only extractor.
///
/// Handlers opt in by taking `AdminGuard` as a parameter. Rejections are
/// the 401/403/500 responses produced by [`guard::enforce`].
pub struct AdminGuard(pub AccessGrant);

impl FromRequestParts<AppState> for AdminGuard {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        guard::enforce(parts, state.admin_token(), state.clock.now()).map(AdminGuard)
    }
}
