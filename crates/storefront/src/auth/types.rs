//! Identity provider wire types.

use serde::{Deserialize, Serialize};

/// A user as reported by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    /// Opaque provider-issued user id.
    pub id: String,
    /// Email address, if the provider exposes one.
    pub email: Option<String>,
}

/// A provider session returned by sign-up and sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    /// Bearer token for provider calls on this user's behalf.
    pub access_token: String,
    /// Token used to mint a fresh access token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// The signed-in user.
    pub user: AuthUser,
}

/// Sign-up response. Providers with email confirmation enabled return the
/// user without a session; the session appears only after confirmation.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    /// Confirmation disabled: a live session.
    Session(AuthSession),
    /// Confirmation pending: just the user record.
    User(AuthUser),
}

/// Error body returned by the provider.
///
/// GoTrue is inconsistent about field names across endpoints, so all the
/// known spellings are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderError {
    /// OAuth-style error code.
    #[serde(default)]
    pub error: Option<String>,
    /// OAuth-style description.
    #[serde(default)]
    pub error_description: Option<String>,
    /// GoTrue-style message.
    #[serde(default, alias = "msg")]
    pub message: Option<String>,
}

impl ProviderError {
    /// Best available human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        self.error_description
            .as_deref()
            .or(self.message.as_deref())
            .or(self.error.as_deref())
            .unwrap_or("authentication failed")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_deserializes() {
        let json = r#"{
            "access_token": "eyJ...",
            "refresh_token": "r1",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": { "id": "u-1", "email": "foreman@example.com" }
        }"#;
        let session: AuthSession = serde_json::from_str(json).unwrap();
        assert_eq!(session.user.id, "u-1");
        assert_eq!(session.expires_in, Some(3600));
    }

    #[test]
    fn test_signup_without_session_is_user_only() {
        let json = r#"{ "id": "u-2", "email": "new@example.com" }"#;
        let resp: SignUpResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(resp, SignUpResponse::User(_)));
    }

    #[test]
    fn test_provider_error_message_fallbacks() {
        let e: ProviderError =
            serde_json::from_str(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
                .unwrap();
        assert_eq!(e.message(), "Invalid login credentials");

        let e: ProviderError = serde_json::from_str(r#"{"msg":"User already registered"}"#).unwrap();
        assert_eq!(e.message(), "User already registered");

        let e: ProviderError = serde_json::from_str(r"{}").unwrap();
        assert_eq!(e.message(), "authentication failed");
    }
}
