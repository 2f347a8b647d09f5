//! Identity provider client implementation.

use std::sync::Arc;

use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::auth::types::{AuthSession, AuthUser, ProviderError, SignUpResponse};
use crate::auth::AuthError;
use crate::config::AuthProviderConfig;

/// Header carrying the project's publishable API key.
const APIKEY_HEADER: &str = "apikey";

/// Client for the hosted identity provider.
///
/// Cheaply cloneable; holds no per-user state.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<AuthClientInner>,
}

struct AuthClientInner {
    http: reqwest::Client,
    base_url: String,
    publishable_key: String,
}

impl AuthClient {
    /// Create a new identity provider client.
    #[must_use]
    pub fn new(config: &AuthProviderConfig) -> Self {
        Self {
            inner: Arc::new(AuthClientInner {
                http: reqwest::Client::new(),
                base_url: config.base_url.clone(),
                publishable_key: config.publishable_key.expose_secret().to_string(),
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AuthError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_error(status, &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Register a new account.
    ///
    /// Providers with email confirmation enabled return only the user
    /// record; the session arrives on first sign-in after confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UserAlreadyExists`] or [`AuthError::WeakPassword`]
    /// on policy rejections, or a transport/provider error otherwise.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse, AuthError> {
        let response = self
            .inner
            .http
            .post(self.url("/signup"))
            .header(APIKEY_HEADER, &self.inner.publishable_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] when the provider rejects
    /// the login, or a transport/provider error otherwise.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let response = self
            .inner
            .http
            .post(self.url("/token"))
            .query(&[("grant_type", "password")])
            .header(APIKEY_HEADER, &self.inner.publishable_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Revoke the session behind an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; an already-expired token is
    /// not an error worth surfacing and callers typically log and continue.
    #[instrument(skip(self, access_token))]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .inner
            .http
            .post(self.url("/logout"))
            .header(APIKEY_HEADER, &self.inner.publishable_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        let body = response.text().await?;
        Err(classify_error(status, &body))
    }

    /// Fetch the user behind an access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SessionExpired`] if the token is no longer
    /// valid, or a transport/provider error otherwise.
    #[instrument(skip(self, access_token))]
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .inner
            .http
            .get(self.url("/user"))
            .header(APIKEY_HEADER, &self.inner.publishable_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AuthError::SessionExpired);
        }
        Self::decode(response).await
    }
}

/// Map a provider rejection onto [`AuthError`].
fn classify_error(status: StatusCode, body: &str) -> AuthError {
    let message = serde_json::from_str::<ProviderError>(body)
        .map_or_else(|_| body.chars().take(200).collect::<String>(), |e| {
            e.message().to_string()
        });
    let lowered = message.to_lowercase();

    if lowered.contains("invalid login credentials") {
        return AuthError::InvalidCredentials;
    }
    if lowered.contains("already registered") || lowered.contains("already exists") {
        return AuthError::UserAlreadyExists;
    }
    if lowered.contains("password") {
        return AuthError::WeakPassword(message);
    }
    if status == StatusCode::UNAUTHORIZED {
        return AuthError::SessionExpired;
    }

    tracing::warn!(status = %status, "Identity provider rejected request");
    AuthError::Provider {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_invalid_credentials() {
        let err = classify_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[test]
    fn test_classify_already_registered() {
        let err = classify_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"msg":"User already registered"}"#,
        );
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[test]
    fn test_classify_weak_password() {
        let err = classify_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"msg":"Password should be at least 6 characters"}"#,
        );
        match err {
            AuthError::WeakPassword(msg) => {
                assert!(msg.contains("at least 6 characters"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_classify_expired_token() {
        let err = classify_error(StatusCode::UNAUTHORIZED, r#"{"msg":"JWT expired"}"#);
        assert!(matches!(err, AuthError::SessionExpired));
    }

    #[test]
    fn test_classify_unknown_falls_through_to_provider() {
        let err = classify_error(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        match err {
            AuthError::Provider { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
