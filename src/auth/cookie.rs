//! Minimal `Cookie` header parsing.

use axum::http::{header::COOKIE, HeaderMap};
use std::collections::HashMap;

/// Parse a `Cookie` header value into a name → value map.
///
/// Pairs are split on `;`, then on the first `=`. Values are percent-decoded;
/// a value that is not valid percent-encoding is kept as sent. The first
/// occurrence of a name wins.
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for pair in header.split(';') {
        let Some((name, value)) = pair.trim().split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let value = value.trim();
        let decoded = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());
        cookies.entry(name.to_string()).or_insert(decoded);
    }
    cookies
}

/// Look up a single cookie across all `Cookie` headers of a request.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let joined = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");
    if joined.is_empty() {
        return None;
    }
    parse_cookies(&joined).remove(name)
}
