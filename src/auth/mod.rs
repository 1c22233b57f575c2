//! Admin authentication: signed session cookies, the access guard and login rate limiting.

pub mod cookie;
pub mod guard;
pub mod middleware;
pub mod rate_limit;
pub mod session;

pub use guard::{enforce, is_authenticated, AccessGrant};
pub use middleware::{AdminGuard, AppState};
pub use rate_limit::{client_key, LoginRateLimiter, RateLimitDecision};
pub use session::{clear_session_cookie, mint, session_cookie, validate, SessionToken};
