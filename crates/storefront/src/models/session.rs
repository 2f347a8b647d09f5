//! Session-related types.
//!
//! Types stored in the browser session for authentication and cart state.

use serde::{Deserialize, Serialize};

/// Session-stored user identity.
///
/// Mirror of the identity provider's session: the opaque user id, the
/// email for display, and the provider access token for sign-out and
/// user-info calls. Forgotten wholesale on sign-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Provider-issued opaque user id.
    pub id: String,
    /// Email address for display and order attribution.
    pub email: String,
    /// Provider access token.
    pub access_token: String,
}

/// Session keys for per-browser state.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the backend-issued cart session id.
    pub const CART_SESSION_ID: &str = "cart_session_id";

    /// Key for the backend CSRF token.
    pub const CSRF_TOKEN: &str = "csrf_token";
}
