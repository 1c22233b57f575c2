//! Security headers middleware.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

/// Middleware that adds security headers to every API response.
///
/// - **Cache-Control: no-store**
///   Login and session responses carry credentials and must never be cached.
///
/// - **Referrer-Policy: same-origin**
///   Keeps `Referer` on same-origin requests so the origin check can fall back
///   to it, and drops it everywhere else.
///
/// - **X-Content-Type-Options: nosniff**, **X-Frame-Options: DENY**
///
/// # Usage
///
/// ```rust,no_run
/// use axum::Router;
/// use axum::middleware;
/// use admin_gate::middleware::security_headers;
///
/// let app: Router = Router::new()
///     .layer(middleware::from_fn(security_headers));
/// ```
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("cache-control", HeaderValue::from_static("no-store"));
    headers.insert("referrer-policy", HeaderValue::from_static("same-origin"));
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));

    response
}
