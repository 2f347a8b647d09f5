//! Hosted identity provider client.
//!
//! Authentication is delegated entirely to a hosted provider speaking a
//! GoTrue-style REST API: password sign-up/sign-in, token-bearing sessions,
//! and a user-info endpoint. The storefront never sees or stores password
//! hashes; it mirrors the provider's session into the browser cookie
//! session and forgets it on sign-out.
//!
//! # Example
//!
//! ```rust,ignore
//! use civil_materials_storefront::auth::AuthClient;
//!
//! let client = AuthClient::new(&config.auth);
//! let session = client.sign_in("foreman@example.com", "password").await?;
//! println!("signed in as {}", session.user.id);
//! ```

mod client;
mod types;

pub use client::AuthClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] civil_materials_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User already exists.
    #[error("an account with this email already exists")]
    UserAlreadyExists,

    /// Password rejected by the provider's policy.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Access token no longer valid.
    #[error("session expired")]
    SessionExpired,

    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Any other provider rejection.
    #[error("{message}")]
    Provider {
        /// HTTP status code returned by the provider.
        status: u16,
        /// The provider's error description.
        message: String,
    },
}

impl AuthError {
    /// Whether this error should be shown to the user as their own mistake
    /// rather than a server fault.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidEmail(_)
                | Self::InvalidCredentials
                | Self::UserAlreadyExists
                | Self::WeakPassword(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_classified() {
        assert!(AuthError::InvalidCredentials.is_user_error());
        assert!(AuthError::UserAlreadyExists.is_user_error());
        assert!(!AuthError::SessionExpired.is_user_error());
        assert!(
            !AuthError::Provider {
                status: 500,
                message: "internal".to_string()
            }
            .is_user_error()
        );
    }
}
