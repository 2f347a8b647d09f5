//! Contact form route handlers.
//!
//! Submission requires a signed-in user; the form pre-fills their email.
//! Messages go straight to the catalog backend, which stores and relays
//! them.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use civil_materials_core::{ContactSubject, Email};

use crate::catalog::ContactRequest;
use crate::error::Result;
use crate::filters;
use crate::middleware::{CspNonce, OptionalAuth, RequireAuth};
use crate::models::CurrentUser;
use crate::routes::cart::cart_credentials;
use crate::state::AppState;

/// Contact form data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
}

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub subjects: [ContactSubject; 5],
    pub form: ContactForm,
    pub error: Option<String>,
    pub sent: bool,
    pub user: Option<CurrentUser>,
    pub nonce: String,
}

impl ContactTemplate {
    fn blank(user: Option<CurrentUser>, nonce: String) -> Self {
        let form = ContactForm {
            email: user.as_ref().map(|u| u.email.clone()).unwrap_or_default(),
            ..ContactForm::default()
        };
        Self {
            subjects: ContactSubject::ALL,
            form,
            error: None,
            sent: false,
            user,
            nonce,
        }
    }
}

/// Display the contact form.
pub async fn show(
    CspNonce(nonce): CspNonce,
    OptionalAuth(user): OptionalAuth,
) -> impl IntoResponse {
    ContactTemplate::blank(user, nonce)
}

/// Handle a contact form submission.
#[instrument(skip(state, session, nonce, form))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ContactForm>,
) -> Result<Response> {
    fn rerender(user: &CurrentUser, form: ContactForm, error: String, nonce: String) -> Response {
        ContactTemplate {
            subjects: ContactSubject::ALL,
            form,
            error: Some(error),
            sent: false,
            user: Some(user.clone()),
            nonce,
        }
        .into_response()
    }

    if form.name.trim().is_empty() || form.message.trim().is_empty() {
        return Ok(rerender(
            &user,
            form,
            "Please fill in your name and a message".to_string(),
            nonce,
        ));
    }

    let email = match Email::parse(&form.email) {
        Ok(email) => email,
        Err(e) => {
            return Ok(rerender(&user, form, format!("Invalid email: {e}"), nonce));
        }
    };

    let Ok(subject) = form.subject.parse::<ContactSubject>() else {
        return Ok(rerender(&user, form, "Please pick a subject".to_string(), nonce));
    };

    let request = ContactRequest {
        name: form.name.trim().to_string(),
        email: email.into_inner(),
        phone: form
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from),
        subject: subject.as_str().to_string(),
        message: form.message.trim().to_string(),
    };

    let creds = cart_credentials(&state, &session).await?;
    match state.catalog().submit_contact(&creds.csrf_token, &request).await {
        Ok(()) => {
            let mut template = ContactTemplate::blank(Some(user), nonce);
            template.sent = true;
            Ok(template.into_response())
        }
        Err(e) => {
            let message = e.backend_message().map_or_else(
                || "Failed to send your message, please try again".to_string(),
                String::from,
            );
            tracing::warn!("Contact submission failed: {e}");
            Ok(rerender(&user, form, message, nonce))
        }
    }
}
