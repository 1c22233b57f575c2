//! Admin access decisions.
//!
//! A request is an admin request when it carries the static admin token in a
//! header, or a valid `admin_session` cookie. Cookie-authenticated requests
//! that change state must also look same-origin.

use crate::auth::cookie::cookie_value;
use crate::auth::session::{self, SESSION_COOKIE_NAME};
use crate::error::AppError;
use axum::http::{
    header::{AUTHORIZATION, HOST, ORIGIN, REFERER},
    request::Parts,
    HeaderMap, Method, Uri,
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Alternative to `Authorization` for clients that cannot set it.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Marker sent by the first-party admin UI on state-changing fetches.
///
/// Any client can send this header. It only exempts a request from the
/// origin check; the session cookie itself still has to be valid.
pub const SAME_ORIGIN_MARKER_HEADER: &str = "x-admin-request";

/// How a request proved it is an admin request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessGrant {
    /// Static admin token in a header. Trusted non-browser caller.
    StaticToken,
    /// Valid session cookie.
    Session,
}

/// Token presented in `Authorization` (or `X-Admin-Token`), minus any `Bearer ` prefix.
///
/// `None` means no credential header was sent at all.
pub fn header_token(headers: &HeaderMap) -> Option<String> {
    let raw = [AUTHORIZATION.as_str(), ADMIN_TOKEN_HEADER]
        .into_iter()
        .filter_map(|name| headers.get(name))
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .find(|value| !value.is_empty())?;

    let token = match raw.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => raw[7..].trim(),
        _ => raw,
    };
    Some(token.to_string())
}

/// Constant-time check of a presented token against the admin token.
///
/// Both sides are hashed first so the comparison leaks neither content nor length.
pub fn token_matches(candidate: &str, secret: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let candidate = Sha256::digest(candidate.as_bytes());
    let secret = Sha256::digest(secret.as_bytes());
    candidate.as_slice().ct_eq(secret.as_slice()).into()
}

/// Whether the request reached us over TLS, directly or via a proxy.
pub fn is_secure_request(headers: &HeaderMap, uri: &Uri) -> bool {
    if uri.scheme_str() == Some("https") {
        return true;
    }
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}

/// `scheme://host` of the request itself, if a host is known.
pub fn request_origin(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|a| a.as_str().to_string()))?;
    let scheme = if is_secure_request(headers, uri) {
        "https"
    } else {
        "http"
    };
    Some(format!("{}://{}", scheme, host))
}

/// Whether `headers` contain the same-origin marker.
fn has_same_origin_marker(headers: &HeaderMap) -> bool {
    headers
        .get(SAME_ORIGIN_MARKER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Same-origin check for cookie-authenticated, state-changing requests.
///
/// Passes on the marker header, on an `Origin` equal to our own origin, or,
/// when `Origin` is absent, on a `Referer` under our own origin.
pub fn passes_origin_check(headers: &HeaderMap, uri: &Uri) -> bool {
    if has_same_origin_marker(headers) {
        tracing::debug!(action = "csrf_marker", "Origin check satisfied by marker header");
        return true;
    }
    let Some(own) = request_origin(headers, uri) else {
        return false;
    };

    if let Some(origin) = headers.get(ORIGIN) {
        return origin.to_str().is_ok_and(|o| o.trim() == own);
    }

    headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|referer| referer.trim().strip_prefix(own.as_str()))
        // "https://site.example.evil" must not count as "https://site.example"
        .is_some_and(|rest| {
            rest.is_empty() || rest.starts_with(|c: char| matches!(c, '/' | '?' | '#'))
        })
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn session_cookie_valid(headers: &HeaderMap, secret: &str, now: u64) -> bool {
    cookie_value(headers, SESSION_COOKIE_NAME)
        .is_some_and(|token| session::validate(&token, now, secret))
}

/// Silent admin check. Never errors; a missing secret is simply `false`.
///
/// No origin check is applied.
pub fn is_authenticated(headers: &HeaderMap, secret: Option<&str>, now: u64) -> bool {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        return false;
    };
    if header_token(headers).is_some_and(|token| token_matches(&token, secret)) {
        return true;
    }
    session_cookie_valid(headers, secret, now)
}

/// Admin check used to guard handlers.
///
/// - no admin token configured: 500
/// - header token present: allowed if it matches, otherwise 403 (the cookie is not consulted)
/// - no header token: 401 unless the session cookie is valid
/// - cookie path with a non-safe method: 403 unless the origin check passes
pub fn enforce(parts: &Parts, secret: Option<&str>, now: u64) -> Result<AccessGrant, AppError> {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        return Err(AppError::Misconfigured(
            "Admin token not configured".to_string(),
        ));
    };

    if let Some(token) = header_token(&parts.headers) {
        if token_matches(&token, secret) {
            return Ok(AccessGrant::StaticToken);
        }
        tracing::warn!(action = "header_token_rejected", path = %parts.uri.path(), "Admin token mismatch");
        return Err(AppError::Forbidden("Forbidden".to_string()));
    }

    if !session_cookie_valid(&parts.headers, secret, now) {
        return Err(AppError::Unauthorized("Unauthorized".to_string()));
    }

    if !is_safe_method(&parts.method) && !passes_origin_check(&parts.headers, &parts.uri) {
        tracing::warn!(action = "csrf_rejected", method = %parts.method, path = %parts.uri.path(), "Cross-origin admin request");
        return Err(AppError::Forbidden("Invalid request origin".to_string()));
    }

    Ok(AccessGrant::Session)
}
