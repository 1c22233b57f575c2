//! Signed, expiring admin session tokens and the cookie that carries them.
//!
//! A token is `"{expiry}.{signature}"` where `expiry` is Unix seconds and
//! `signature` is the lowercase hex HMAC-SHA256 of the decimal expiry, keyed
//! with the admin token. Nothing is stored server-side.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of a minted session, also used as the cookie `Max-Age`.
pub const SESSION_TTL_SECS: u64 = 3600;

/// Name of the cookie holding the session token.
pub const SESSION_COOKIE_NAME: &str = "admin_session";

/// A freshly minted session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub value: String,
    pub expires_at: u64,
}

/// Mint a session token valid for [`SESSION_TTL_SECS`] from `now`.
///
/// Returns `None` if `secret` is empty.
pub fn mint(now: u64, secret: &str) -> Option<SessionToken> {
    if secret.is_empty() {
        return None;
    }
    let expires_at = now.checked_add(SESSION_TTL_SECS)?;
    let signature = sign(expires_at, secret)?;
    Some(SessionToken {
        value: format!("{}.{}", expires_at, signature),
        expires_at,
    })
}

/// Check that `token` was minted with `secret` and has not expired at `now`.
///
/// Malformed input of any kind is simply `false`.
pub fn validate(token: &str, now: u64, secret: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Some((expiry_str, signature)) = token.split_once('.') else {
        return false;
    };
    if expiry_str.is_empty() || signature.is_empty() {
        return false;
    }
    let Ok(expiry) = expiry_str.parse::<u64>() else {
        return false;
    };
    if expiry <= now {
        return false;
    }
    let Some(expected) = sign(expiry, secret) else {
        return false;
    };
    // Slices of different length compare unequal without inspecting contents.
    signature.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// `Set-Cookie` value that installs the session on the client.
pub fn session_cookie(token: &SessionToken, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={}; Path=/; HttpOnly; SameSite=Strict; Max-Age={SESSION_TTL_SECS}",
        token.value
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that makes the client discard the session immediately.
pub fn clear_session_cookie(secure: bool) -> String {
    let mut cookie =
        format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn sign(expiry: u64, secret: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(expiry.to_string().as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}
