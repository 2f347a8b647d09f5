//! Catalog backend REST client.
//!
//! # Architecture
//!
//! Every piece of commerce state (products, categories, carts, orders)
//! lives in the external catalog backend; this module is a thin typed
//! wrapper over its JSON endpoints using `reqwest`. Product and category
//! reads are cached in-memory via `moka` (5 minute TTL); cart and order
//! reads never are, since the backend's response is the source of truth
//! after every mutation.
//!
//! # Cart session plumbing
//!
//! The backend identifies carts by a `cart_session_id` cookie and guards
//! mutations with Django-style CSRF (a `csrftoken` cookie replayed in the
//! `X-CSRFToken` header). Both values are held per browser session and
//! passed explicitly as [`CartCredentials`]; responses that issue a new
//! cart session id surface it so the caller can persist it.
//!
//! # Example
//!
//! ```rust,ignore
//! use civil_materials_storefront::catalog::{CartCredentials, CatalogClient};
//!
//! let client = CatalogClient::new(&config.catalog);
//! let token = client.csrf_token().await?;
//! let creds = CartCredentials { session_id: None, csrf_token: token };
//!
//! let (cart, issued) = client.add_item(&creds, product_id, 2).await?;
//! println!("{} items, total {}", cart.item_count(), cart.total);
//! ```

mod cache;
mod client;
pub mod types;

pub use client::{CartCredentials, CatalogClient};
pub use types::*;

use thiserror::Error;

/// Errors that can occur when talking to the catalog backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend rejected the request; `message` is its error string,
    /// preserved verbatim for display.
    #[error("{message}")]
    Backend {
        /// HTTP status code returned by the backend.
        status: u16,
        /// The backend's `error` field, verbatim.
        message: String,
    },
}

impl ApiError {
    /// The backend's own error message, when one was returned.
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Backend { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::NotFound("product 123".to_string());
        assert_eq!(err.to_string(), "Not found: product 123");
    }

    #[test]
    fn test_backend_error_is_verbatim() {
        let err = ApiError::Backend {
            status: 400,
            message: "Not enough stock".to_string(),
        };
        assert_eq!(err.to_string(), "Not enough stock");
        assert_eq!(err.backend_message(), Some("Not enough stock"));
    }

    #[test]
    fn test_backend_message_absent_for_transport_errors() {
        let err = ApiError::NotFound("x".to_string());
        assert!(err.backend_message().is_none());
    }
}
