//! Cart and checkout route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The cart itself lives in the catalog backend; the session only carries
//! the backend's cart session id and CSRF token. Every mutation requires a
//! signed-in user and the `RequireAuth` extractor rejects anonymous
//! attempts before any backend call is made.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use civil_materials_core::ProductId;

use crate::catalog::{Cart, CartCredentials, PlaceOrderRequest};
use crate::error::{AppError, Result};
use crate::filters::{self, format_money};
use crate::middleware::{CspNonce, OptionalAuth, RequireAuth};
use crate::models::CurrentUser;
use crate::models::session::keys;
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub product_id: ProductId,
    pub name: String,
    pub price: String,
    pub quantity: u32,
    pub subtotal: String,
    pub image: Option<String>,
}

/// Cart display data for templates.
///
/// `total` is the backend's figure formatted for display; it is never
/// recomputed from the lines.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total: String,
    pub item_count: u32,
}

impl CartView {
    /// The defined empty state, also used when a fetch fails.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: "$0.00".to_string(),
            item_count: 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart
                .items
                .iter()
                .map(|item| CartItemView {
                    product_id: item.product.id,
                    name: item.product.name.clone(),
                    price: format_money(&item.product.price.to_string()),
                    quantity: item.quantity,
                    subtotal: format_money(&item.subtotal.to_string()),
                    image: item.product.image.clone(),
                })
                .collect(),
            total: format_money(&cart.total.to_string()),
            item_count: cart.item_count(),
        }
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Build cart credentials from the session, bootstrapping a CSRF token from
/// the backend on first use.
pub(crate) async fn cart_credentials(
    state: &AppState,
    session: &Session,
) -> Result<CartCredentials> {
    let csrf_token = match session.get::<String>(keys::CSRF_TOKEN).await.ok().flatten() {
        Some(token) => token,
        None => {
            let token = state.catalog().csrf_token().await?;
            if let Err(e) = session.insert(keys::CSRF_TOKEN, &token).await {
                tracing::error!("Failed to save CSRF token to session: {e}");
            }
            token
        }
    };

    let session_id = session
        .get::<String>(keys::CART_SESSION_ID)
        .await
        .ok()
        .flatten();

    Ok(CartCredentials {
        session_id,
        csrf_token,
    })
}

/// Persist a newly issued cart session id, if the backend sent one.
pub(crate) async fn remember_cart_session(session: &Session, issued: Option<String>) {
    if let Some(id) = issued
        && let Err(e) = session.insert(keys::CART_SESSION_ID, &id).await
    {
        tracing::error!("Failed to save cart session id: {e}");
    }
}

/// Fetch the current cart for display; any failure yields the empty state.
pub(crate) async fn fetch_cart_view(state: &AppState, session: &Session) -> CartView {
    let Ok(creds) = cart_credentials(state, session).await else {
        return CartView::empty();
    };
    match state.catalog().get_cart(&creds).await {
        Ok((cart, issued)) => {
            remember_cart_session(session, issued).await;
            CartView::from(&cart)
        }
        Err(e) => {
            tracing::warn!("Failed to fetch cart: {e}");
            CartView::empty()
        }
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

/// Checkout form data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutForm {
    pub full_name: String,
    pub phone: String,
    pub address: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
    pub user: Option<CurrentUser>,
    pub nonce: String,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/checkout.html")]
pub struct CheckoutTemplate {
    pub cart: CartView,
    pub user: Option<CurrentUser>,
    pub nonce: String,
    pub form: CheckoutForm,
    pub error: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page.
#[instrument(skip(state, session, nonce, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    OptionalAuth(user): OptionalAuth,
) -> impl IntoResponse {
    let cart = fetch_cart_view(&state, &session).await;

    CartShowTemplate { cart, user, nonce }
}

/// Add item to cart (HTMX).
///
/// Returns the count badge with an `HX-Trigger: cart-updated` header so
/// other fragments refresh. Backend rejections ("Not enough stock") come
/// back as an error response carrying the backend's message verbatim.
#[instrument(skip(state, session), fields(product_id = %form.product_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(_user): RequireAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let creds = cart_credentials(&state, &session).await?;
    let quantity = form.quantity.unwrap_or(1);

    let (cart, issued) = state.catalog().add_item(&creds, form.product_id, quantity).await?;
    remember_cart_session(&session, issued).await;

    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartCountTemplate {
            count: cart.item_count(),
        },
    )
        .into_response())
}

/// Set a cart line's quantity (HTMX). Quantity 0 removes the line.
#[instrument(skip(state, session), fields(product_id = %form.product_id, quantity = form.quantity))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(_user): RequireAuth,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let creds = cart_credentials(&state, &session).await?;

    let (cart, issued) = state
        .catalog()
        .update_item(&creds, form.product_id, form.quantity)
        .await?;
    remember_cart_session(&session, issued).await;

    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate {
            cart: CartView::from(&cart),
        },
    )
        .into_response())
}

/// Remove a line from the cart (HTMX).
#[instrument(skip(state, session), fields(product_id = %form.product_id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(_user): RequireAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let creds = cart_credentials(&state, &session).await?;

    let (cart, issued) = state.catalog().remove_item(&creds, form.product_id).await?;
    remember_cart_session(&session, issued).await;

    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate {
            cart: CartView::from(&cart),
        },
    )
        .into_response())
}

/// Empty the cart (HTMX).
#[instrument(skip(state, session))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(_user): RequireAuth,
) -> Result<Response> {
    let creds = cart_credentials(&state, &session).await?;

    let (cart, issued) = state.catalog().clear_cart(&creds).await?;
    remember_cart_session(&session, issued).await;

    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate {
            cart: CartView::from(&cart),
        },
    )
        .into_response())
}

/// Get cart count badge (HTMX).
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let cart = fetch_cart_view(&state, &session).await;
    CartCountTemplate {
        count: cart.item_count,
    }
}

/// Display the checkout form.
#[instrument(skip(state, session, nonce, user))]
pub async fn checkout_page(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    RequireAuth(user): RequireAuth,
) -> Response {
    let cart = fetch_cart_view(&state, &session).await;
    if cart.is_empty() {
        return Redirect::to("/cart").into_response();
    }

    CheckoutTemplate {
        cart,
        user: Some(user),
        nonce,
        form: CheckoutForm::default(),
        error: None,
    }
    .into_response()
}

/// Place the order.
///
/// On success the backend snapshots the cart, clears it, and we land on the
/// order history page. On rejection the form is re-rendered with the
/// backend's message verbatim and a freshly fetched cart.
#[instrument(skip(state, session, nonce, form))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    RequireAuth(user): RequireAuth,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let missing_field = form.full_name.trim().is_empty()
        || form.phone.trim().is_empty()
        || form.address.trim().is_empty();
    if missing_field {
        let cart = fetch_cart_view(&state, &session).await;
        return Ok(CheckoutTemplate {
            cart,
            user: Some(user),
            nonce,
            form,
            error: Some("Please fill in all shipping fields".to_string()),
        }
        .into_response());
    }

    let creds = cart_credentials(&state, &session).await?;
    let request = PlaceOrderRequest {
        full_name: form.full_name.trim().to_string(),
        phone: form.phone.trim().to_string(),
        address: form.address.trim().to_string(),
        user_id: user.id.clone(),
        user_email: user.email.clone(),
    };

    match state.catalog().place_order(&creds, &request).await {
        Ok((order, issued)) => {
            remember_cart_session(&session, issued).await;
            tracing::info!(order_number = %order.order_number, "Order placed");
            Ok(Redirect::to("/account/orders").into_response())
        }
        Err(e) => {
            if let Some(message) = e.backend_message().map(String::from) {
                // Backend said no; show its message and the current cart
                let cart = fetch_cart_view(&state, &session).await;
                Ok(CheckoutTemplate {
                    cart,
                    user: Some(user),
                    nonce,
                    form,
                    error: Some(message),
                }
                .into_response())
            } else {
                Err(AppError::from(e))
            }
        }
    }
}
