//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. CSP nonce (generate per-request nonce for inline scripts)
//! 4. Session layer (tower-sessions, in-memory store)
//! 5. Security headers (CSP, isolation, etc.)
//! 6. Rate limiting (governor, auth routes only)

pub mod auth;
pub mod csp;
pub mod rate_limit;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
pub use csp::{CspNonce, csp_nonce_middleware};
pub use rate_limit::auth_rate_limiter;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
