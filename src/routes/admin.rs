//! Admin login, logout and session endpoints.

use crate::auth::guard::{is_authenticated, is_secure_request, token_matches};
use crate::auth::middleware::{AdminGuard, AppState};
use crate::auth::rate_limit::{client_key, RateLimitDecision};
use crate::auth::session::{clear_session_cookie, mint, session_cookie};
use crate::error::AppError;
use crate::models::{LoginRequest, OkResponse, SessionStatus};
use axum::{
    body::Bytes,
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, Uri},
    response::IntoResponse,
    Json,
};
use std::hash::{Hash, Hasher};

/// Hash a client key so addresses never reach the logs in clear.
fn client_hash(key: &str) -> String {
    let mut hasher = std::hash::DefaultHasher::new();
    key.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

/// POST /api/admin/login — Exchange the admin token for a session cookie
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let key = client_key(&headers);
    if state.limiter.check(&key) == RateLimitDecision::Limited {
        tracing::warn!(action = "rate_limited", endpoint = "admin/login", client_hash = %client_hash(&key), "Rate limit exceeded");
        return Err(AppError::RateLimited);
    }

    // Only a body that is not JSON at all fails here; any other shape just lacks a token.
    let value: serde_json::Value = serde_json::from_slice(&body)?;
    let req = LoginRequest::from_value(&value)?;

    let secret = state
        .admin_token()
        .ok_or_else(|| AppError::Misconfigured("Admin token not configured".to_string()))?;

    let presented = req.token.as_deref().map(str::trim).unwrap_or_default();
    if presented.is_empty() || !token_matches(presented, secret) {
        tracing::warn!(action = "login_failed", client_hash = %client_hash(&key), "Invalid admin token");
        return Err(AppError::Unauthorized("Invalid token".to_string()));
    }

    state.limiter.reset(&key);

    let session = mint(state.clock.now(), secret)
        .ok_or_else(|| AppError::Misconfigured("Failed to create session".to_string()))?;
    let secure = state.config.production || is_secure_request(&headers, &uri);

    tracing::info!(action = "login_success", client_hash = %client_hash(&key), expires_at = session.expires_at, "Admin session created");

    Ok((
        [(SET_COOKIE, session_cookie(&session, secure))],
        Json(OkResponse::ok()),
    ))
}

/// POST /api/admin/logout — Clear the session cookie
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> impl IntoResponse {
    let secure = state.config.production || is_secure_request(&headers, &uri);

    tracing::info!(action = "logout", "Admin session cleared");

    (
        [(SET_COOKIE, clear_session_cookie(secure))],
        Json(OkResponse::ok()),
    )
}

/// GET /api/admin/me — Succeeds only for admin requests
pub async fn me(AdminGuard(grant): AdminGuard) -> impl IntoResponse {
    tracing::debug!(action = "admin_me", grant = ?grant, "Admin check passed");
    Json(OkResponse::ok())
}

/// GET /api/admin/session — Report whether the caller is an admin, without failing
pub async fn session_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let authenticated = is_authenticated(&headers, state.admin_token(), state.clock.now());
    Json(SessionStatus { authenticated })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_hash_is_stable() {
        let a = client_hash("203.0.113.7");
        assert_eq!(a, client_hash("203.0.113.7"));
        assert_ne!(a, client_hash("203.0.113.8"));
    }
}
