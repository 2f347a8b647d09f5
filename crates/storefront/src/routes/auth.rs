//! Authentication route handlers.
//!
//! Sign-up, sign-in, and sign-out against the hosted identity provider.
//! On sign-in the provider session is mirrored into the cookie session and
//! the cart is re-fetched once to warm it; the warm-up is best effort and
//! never blocks the login.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use civil_materials_core::Email;

use crate::auth::{AuthError, SignUpResponse};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{CspNonce, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::models::session::keys;
use crate::routes::cart::fetch_cart_view;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub email: String,
    pub user: Option<CurrentUser>,
    pub nonce: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub error: Option<String>,
    pub email: String,
    pub user: Option<CurrentUser>,
    pub nonce: String,
}

/// Registration success page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register_success.html")]
pub struct RegisterSuccessTemplate {
    pub email: String,
    pub user: Option<CurrentUser>,
    pub nonce: String,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(CspNonce(nonce): CspNonce) -> impl IntoResponse {
    LoginTemplate {
        error: None,
        email: String::new(),
        user: None,
        nonce,
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, nonce, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Form(form): Form<LoginForm>,
) -> Response {
    let email = match Email::parse(&form.email) {
        Ok(email) => email,
        Err(e) => {
            return LoginTemplate {
                error: Some(AuthError::from(e).to_string()),
                email: form.email,
                user: None,
                nonce,
            }
            .into_response();
        }
    };

    match state.auth().sign_in(email.as_str(), &form.password).await {
        Ok(auth_session) => {
            let user = CurrentUser {
                id: auth_session.user.id,
                email: auth_session
                    .user
                    .email
                    .unwrap_or_else(|| email.as_str().to_string()),
                access_token: auth_session.access_token,
            };

            if let Err(e) = set_current_user(&session, &user).await {
                tracing::error!("Failed to set session: {e}");
                return LoginTemplate {
                    error: Some("Something went wrong, please try again".to_string()),
                    email: form.email,
                    user: None,
                    nonce,
                }
                .into_response();
            }

            set_sentry_user(&user.id, Some(&user.email));

            // Warm the cart once so the badge is right on the next page
            let _ = fetch_cart_view(&state, &session).await;

            Redirect::to("/account").into_response()
        }
        Err(e) => {
            if !e.is_user_error() {
                tracing::warn!("Login failed: {e}");
            }
            LoginTemplate {
                error: Some(display_message(&e)),
                email: form.email,
                user: None,
                nonce,
            }
            .into_response()
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(CspNonce(nonce): CspNonce) -> impl IntoResponse {
    RegisterTemplate {
        error: None,
        email: String::new(),
        user: None,
        nonce,
    }
}

/// Handle registration form submission.
///
/// Providers with email confirmation enabled return no session; in that
/// case the user is told to check their inbox instead of being signed in.
#[instrument(skip(state, session, nonce, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Form(form): Form<RegisterForm>,
) -> Response {
    if form.password != form.password_confirm {
        return RegisterTemplate {
            error: Some("Passwords do not match".to_string()),
            email: form.email,
            user: None,
            nonce,
        }
        .into_response();
    }

    let email = match Email::parse(&form.email) {
        Ok(email) => email,
        Err(e) => {
            return RegisterTemplate {
                error: Some(AuthError::from(e).to_string()),
                email: form.email,
                user: None,
                nonce,
            }
            .into_response();
        }
    };

    match state.auth().sign_up(email.as_str(), &form.password).await {
        Ok(SignUpResponse::Session(auth_session)) => {
            let user = CurrentUser {
                id: auth_session.user.id,
                email: auth_session
                    .user
                    .email
                    .unwrap_or_else(|| email.as_str().to_string()),
                access_token: auth_session.access_token,
            };

            if let Err(e) = set_current_user(&session, &user).await {
                tracing::error!("Failed to set session after registration: {e}");
                return Redirect::to("/auth/login").into_response();
            }

            set_sentry_user(&user.id, Some(&user.email));
            Redirect::to("/account").into_response()
        }
        Ok(SignUpResponse::User(provider_user)) => RegisterSuccessTemplate {
            email: provider_user
                .email
                .unwrap_or_else(|| email.as_str().to_string()),
            user: None,
            nonce,
        }
        .into_response(),
        Err(e) => {
            if !e.is_user_error() {
                tracing::warn!("Registration failed: {e}");
            }
            RegisterTemplate {
                error: Some(display_message(&e)),
                email: form.email,
                user: None,
                nonce,
            }
            .into_response()
        }
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout.
///
/// Revokes the provider session (best effort), then destroys the cookie
/// session entirely so the cart session id is forgotten with it.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    if let Ok(Some(user)) = session.get::<CurrentUser>(keys::CURRENT_USER).await
        && let Err(e) = state.auth().sign_out(&user.access_token).await
    {
        tracing::warn!("Failed to revoke provider session: {e}");
    }

    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session: {e}");
    }

    if let Err(e) = session.flush().await {
        tracing::error!("Failed to flush session: {e}");
    }

    clear_sentry_user();

    Redirect::to("/").into_response()
}

/// Error text shown on the login/register forms.
fn display_message(error: &AuthError) -> String {
    match error {
        AuthError::InvalidCredentials => "Invalid email or password".to_string(),
        AuthError::UserAlreadyExists => {
            "An account with this email already exists".to_string()
        }
        AuthError::WeakPassword(msg) => msg.clone(),
        AuthError::InvalidEmail(e) => format!("Invalid email: {e}"),
        _ => "Something went wrong, please try again".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_message_hides_internals() {
        let msg = display_message(&AuthError::Provider {
            status: 500,
            message: "upstream database on fire".to_string(),
        });
        assert!(!msg.contains("database"));
    }

    #[test]
    fn test_display_message_keeps_password_policy() {
        let msg = display_message(&AuthError::WeakPassword(
            "Password should be at least 6 characters".to_string(),
        ));
        assert!(msg.contains("6 characters"));
    }
}
