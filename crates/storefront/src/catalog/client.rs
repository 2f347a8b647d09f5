//! Catalog backend client implementation.
//!
//! Plain REST/JSON over `reqwest`. Catalog reads are cached with `moka`
//! (5-minute TTL); cart, order, and contact calls always hit the backend.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, SET_COOKIE};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use civil_materials_core::{CategoryId, ProductId};

use crate::catalog::ApiError;
use crate::catalog::cache::CacheValue;
use crate::catalog::types::{
    AddItemRequest, Cart, Category, ContactRequest, CsrfResponse, ErrorResponse, Order,
    PlaceOrderRequest, Product, UpdateItemRequest,
};
use crate::config::CatalogApiConfig;

/// Cookie name under which the backend issues cart session identifiers.
const CART_SESSION_COOKIE: &str = "cart_session_id";

/// Cookie name Django expects the CSRF token under.
const CSRF_COOKIE: &str = "csrftoken";

/// Header Django expects the CSRF token in on mutations.
const CSRF_HEADER: &str = "X-CSRFToken";

/// Per-session credentials for cart endpoints.
///
/// Built from values held in the browser session; the client never stores
/// these itself, so one shared client serves every visitor.
#[derive(Debug, Clone)]
pub struct CartCredentials {
    /// Backend-issued cart session id, if one has been issued yet.
    pub session_id: Option<String>,
    /// CSRF token from the bootstrap endpoint.
    pub csrf_token: String,
}

impl CartCredentials {
    /// Render the `Cookie` request header for these credentials.
    fn cookie_header(&self) -> String {
        match &self.session_id {
            Some(sid) => format!("{CSRF_COOKIE}={}; {CART_SESSION_COOKIE}={sid}", self.csrf_token),
            None => format!("{CSRF_COOKIE}={}", self.csrf_token),
        }
    }
}

// =============================================================================
// CatalogClient
// =============================================================================

/// Client for the catalog backend REST API.
///
/// Cheaply cloneable; product and category reads are cached for 5 minutes.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    http: reqwest::Client,
    base_url: String,
    cache: Cache<String, CacheValue>,
}

impl CatalogClient {
    /// Create a new catalog client.
    #[must_use]
    pub fn new(config: &CatalogApiConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(CatalogClientInner {
                http: reqwest::Client::new(),
                base_url: config.base_url.clone(),
                cache,
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Execute a GET and decode the JSON body.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self
            .inner
            .http
            .get(self.url(path))
            .query(query)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        decode_body(status, path, &body)
    }

    /// Execute a cart POST with session cookies and CSRF header, returning the
    /// decoded body plus any newly issued cart session id.
    async fn post_cart<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        creds: &CartCredentials,
        body: &B,
    ) -> Result<(T, Option<String>), ApiError> {
        let response = self
            .inner
            .http
            .post(self.url(path))
            .header(reqwest::header::COOKIE, creds.cookie_header())
            .header(CSRF_HEADER, &creds.csrf_token)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let issued = extract_cart_session(response.headers());
        let text = response.text().await?;
        Ok((decode_body(status, path, &text)?, issued))
    }

    // =========================================================================
    // Bootstrap
    // =========================================================================

    /// Fetch a CSRF token for this browser session.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or responds with a
    /// non-success status.
    #[instrument(skip(self))]
    pub async fn csrf_token(&self) -> Result<String, ApiError> {
        let resp: CsrfResponse = self.get("/api/csrf/", &[]).await?;
        Ok(resp.csrf_token)
    }

    // =========================================================================
    // Products & Categories
    // =========================================================================

    /// List all products (cached).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not parse.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Arc<Vec<Product>>, ApiError> {
        self.cached_products("products:all", "/api/products/", &[])
            .await
    }

    /// List products with stock remaining (cached).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not parse.
    #[instrument(skip(self))]
    pub async fn products_in_stock(&self) -> Result<Arc<Vec<Product>>, ApiError> {
        self.cached_products("products:in_stock", "/api/products/in_stock/", &[])
            .await
    }

    /// List products in a category (cached).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not parse.
    #[instrument(skip(self))]
    pub async fn products_by_category(
        &self,
        category: CategoryId,
    ) -> Result<Arc<Vec<Product>>, ApiError> {
        self.cached_products(
            &format!("products:category:{category}"),
            "/api/products/by_category/",
            &[("category_id", category.to_string())],
        )
        .await
    }

    async fn cached_products(
        &self,
        cache_key: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Arc<Vec<Product>>, ApiError> {
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(cache_key).await {
            debug!("Cache hit for product list");
            return Ok(products);
        }

        let products: Arc<Vec<Product>> = Arc::new(self.get(path, query).await?);
        self.inner
            .cache
            .insert(cache_key.to_string(), CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// Get a single product by id (cached).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] if the product does not exist, or an
    /// error if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        let cache_key = format!("product:{id}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self.get(&format!("/api/products/{id}/"), &[]).await?;
        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// List all categories (cached).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not parse.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Arc<Vec<Category>>, ApiError> {
        let cache_key = "categories:all";

        if let Some(CacheValue::Categories(categories)) = self.inner.cache.get(cache_key).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Arc<Vec<Category>> = Arc::new(self.get("/api/categories/", &[]).await?);
        self.inner
            .cache
            .insert(
                cache_key.to_string(),
                CacheValue::Categories(categories.clone()),
            )
            .await;
        Ok(categories)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Fetch the cart for this session.
    ///
    /// Returns the cart plus any newly issued cart session id, which the
    /// caller must persist in the browser session.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not parse.
    #[instrument(skip(self, creds))]
    pub async fn get_cart(
        &self,
        creds: &CartCredentials,
    ) -> Result<(Cart, Option<String>), ApiError> {
        let response = self
            .inner
            .http
            .get(self.url("/api/cart/"))
            .header(reqwest::header::COOKIE, creds.cookie_header())
            .send()
            .await?;
        let status = response.status();
        let issued = extract_cart_session(response.headers());
        let text = response.text().await?;
        Ok((decode_body(status, "/api/cart/", &text)?, issued))
    }

    /// Add units of a product to the cart.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Backend`] with the backend's message (e.g.
    /// "Not enough stock") on rejection.
    #[instrument(skip(self, creds), fields(product_id = %product_id, quantity))]
    pub async fn add_item(
        &self,
        creds: &CartCredentials,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(Cart, Option<String>), ApiError> {
        let body = AddItemRequest {
            product_id,
            quantity,
        };
        self.post_cart("/api/cart/add_item/", creds, &body).await
    }

    /// Set the absolute quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Backend`] with the backend's message on rejection.
    #[instrument(skip(self, creds), fields(product_id = %product_id, quantity))]
    pub async fn update_item(
        &self,
        creds: &CartCredentials,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(Cart, Option<String>), ApiError> {
        let body = UpdateItemRequest {
            product_id,
            quantity,
        };
        self.post_cart("/api/cart/update_item/", creds, &body).await
    }

    /// Remove a product's line from the cart.
    ///
    /// The backend has no dedicated remove endpoint; an update to quantity 0
    /// deletes the line.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Backend`] with the backend's message on rejection.
    #[instrument(skip(self, creds), fields(product_id = %product_id))]
    pub async fn remove_item(
        &self,
        creds: &CartCredentials,
        product_id: ProductId,
    ) -> Result<(Cart, Option<String>), ApiError> {
        self.update_item(creds, product_id, 0).await
    }

    /// Remove every line from the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not parse.
    #[instrument(skip(self, creds))]
    pub async fn clear_cart(
        &self,
        creds: &CartCredentials,
    ) -> Result<(Cart, Option<String>), ApiError> {
        self.post_cart("/api/cart/clear/", creds, &serde_json::json!({}))
            .await
    }

    /// Place an order from the current cart.
    ///
    /// The backend snapshots the cart into an order, decrements stock, and
    /// clears the cart; the next fetch returns an empty cart.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Backend`] carrying the backend's message verbatim
    /// (empty cart, incomplete shipping information, etc.).
    #[instrument(skip(self, creds, request), fields(user_id = %request.user_id))]
    pub async fn place_order(
        &self,
        creds: &CartCredentials,
        request: &PlaceOrderRequest,
    ) -> Result<(Order, Option<String>), ApiError> {
        self.post_cart("/api/cart/place_order/", creds, request).await
    }

    // =========================================================================
    // Orders & Contact
    // =========================================================================

    /// List orders for an identity-provider user id, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not parse.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_orders(&self, user_id: &str) -> Result<Vec<Order>, ApiError> {
        self.get("/api/orders/", &[("user_id", user_id.to_string())])
            .await
    }

    /// Submit a contact-form message.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Backend`] with the backend's message on rejection.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn submit_contact(
        &self,
        csrf_token: &str,
        request: &ContactRequest,
    ) -> Result<(), ApiError> {
        let response = self
            .inner
            .http
            .post(self.url("/api/contact/"))
            .header(reqwest::header::COOKIE, format!("{CSRF_COOKIE}={csrf_token}"))
            .header(CSRF_HEADER, csrf_token)
            .json(request)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            return Ok(());
        }
        // Reuse the error decoding; the Ok arm is unreachable for failures.
        let _: serde_json::Value = decode_body(status, "/api/contact/", &text)?;
        Ok(())
    }
}

// =============================================================================
// Response Decoding
// =============================================================================

/// Decode a backend response body, mapping non-success statuses to errors.
///
/// Rejections carrying the backend's `{"error": ...}` envelope become
/// [`ApiError::Backend`] with the message verbatim, whatever the status:
/// the cart endpoints reject with 404 bodies like "No cart found" that
/// must reach the user unchanged. [`ApiError::NotFound`] is reserved for
/// envelope-less 404s (a missing product detail page).
fn decode_body<T: DeserializeOwned>(
    status: StatusCode,
    path: &str,
    body: &str,
) -> Result<T, ApiError> {
    if !status.is_success() {
        if let Ok(envelope) = serde_json::from_str::<ErrorResponse>(body) {
            tracing::warn!(status = %status, path, "Catalog API rejected request");
            return Err(ApiError::Backend {
                status: status.as_u16(),
                message: envelope.error,
            });
        }

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(path.to_string()));
        }

        tracing::warn!(status = %status, path, "Catalog API rejected request");
        return Err(ApiError::Backend {
            status: status.as_u16(),
            message: body.chars().take(200).collect::<String>(),
        });
    }

    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            path,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse catalog API response"
        );
        ApiError::Parse(e)
    })
}

/// Pull a newly issued cart session id out of `Set-Cookie` headers.
fn extract_cart_session(headers: &HeaderMap) -> Option<String> {
    headers.get_all(SET_COOKIE).iter().find_map(|value| {
        let cookie = value.to_str().ok()?;
        let rest = cookie.strip_prefix(&format!("{CART_SESSION_COOKIE}="))?;
        let id = rest.split(';').next()?.trim();
        if id.is_empty() {
            None
        } else {
            Some(id.to_string())
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_cookie_header_without_session() {
        let creds = CartCredentials {
            session_id: None,
            csrf_token: "tok".to_string(),
        };
        assert_eq!(creds.cookie_header(), "csrftoken=tok");
    }

    #[test]
    fn test_cookie_header_with_session() {
        let creds = CartCredentials {
            session_id: Some("abc".to_string()),
            csrf_token: "tok".to_string(),
        };
        assert_eq!(creds.cookie_header(), "csrftoken=tok; cart_session_id=abc");
    }

    #[test]
    fn test_extract_cart_session() {
        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("cart_session_id=xyz-123; Path=/; HttpOnly"),
        );
        assert_eq!(extract_cart_session(&headers), Some("xyz-123".to_string()));
    }

    #[test]
    fn test_extract_cart_session_ignores_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("csrftoken=tok; Path=/"),
        );
        assert_eq!(extract_cart_session(&headers), None);
    }

    #[test]
    fn test_decode_body_not_found() {
        let result: Result<serde_json::Value, ApiError> =
            decode_body(StatusCode::NOT_FOUND, "/api/products/99/", "");
        assert!(matches!(result.unwrap_err(), ApiError::NotFound(_)));
    }

    #[test]
    fn test_decode_body_404_with_envelope_keeps_message() {
        // The cart endpoints reject with 404 plus an error envelope; the
        // backend's message must survive for display.
        let result: Result<serde_json::Value, ApiError> = decode_body(
            StatusCode::NOT_FOUND,
            "/api/cart/place_order/",
            r#"{"error":"No cart found"}"#,
        );
        match result.unwrap_err() {
            ApiError::Backend { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "No cart found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_body_backend_error_verbatim() {
        let result: Result<serde_json::Value, ApiError> = decode_body(
            StatusCode::BAD_REQUEST,
            "/api/cart/add_item/",
            r#"{"error":"Not enough stock"}"#,
        );
        match result.unwrap_err() {
            ApiError::Backend { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Not enough stock");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_body_backend_error_without_envelope() {
        let result: Result<serde_json::Value, ApiError> =
            decode_body(StatusCode::INTERNAL_SERVER_ERROR, "/api/cart/", "boom");
        match result.unwrap_err() {
            ApiError::Backend { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_body_parse_error() {
        let result: Result<Cart, ApiError> = decode_body(StatusCode::OK, "/api/cart/", "not json");
        assert!(matches!(result.unwrap_err(), ApiError::Parse(_)));
    }
}
