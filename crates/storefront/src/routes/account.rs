//! Account route handlers.
//!
//! Both pages require a signed-in user. Order history is scoped to the
//! identity-provider user id; the backend returns orders newest first.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::catalog::Order;
use crate::error::Result;
use crate::filters::{self, format_money};
use crate::middleware::{CspNonce, RequireAuth};
use crate::models::CurrentUser;
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// Order line display data.
#[derive(Clone)]
pub struct OrderItemView {
    pub name: String,
    pub price: String,
    pub quantity: u32,
    pub subtotal: String,
}

/// Order display data for the history page.
#[derive(Clone)]
pub struct OrderView {
    pub order_number: String,
    pub placed_at: String,
    pub status: String,
    pub is_final: bool,
    pub total: String,
    pub items: Vec<OrderItemView>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            order_number: order.order_number.clone(),
            placed_at: order
                .created_at
                .map(|t| t.format("%B %-d, %Y").to_string())
                .unwrap_or_default(),
            status: order.status.label().to_string(),
            is_final: order.status.is_final(),
            total: format_money(&order.total_amount.to_string()),
            items: order
                .items
                .iter()
                .map(|item| OrderItemView {
                    name: item.product_name.clone(),
                    price: format_money(&item.product_price.to_string()),
                    quantity: item.quantity,
                    subtotal: format_money(&item.subtotal.to_string()),
                })
                .collect(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountTemplate {
    pub user: Option<CurrentUser>,
    pub nonce: String,
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub orders: Vec<OrderView>,
    pub user: Option<CurrentUser>,
    pub nonce: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the account overview.
#[instrument(skip(nonce, user))]
pub async fn index(
    CspNonce(nonce): CspNonce,
    RequireAuth(user): RequireAuth,
) -> AccountTemplate {
    AccountTemplate {
        user: Some(user),
        nonce,
    }
}

/// Display the order history.
#[instrument(skip(state, nonce, user))]
pub async fn orders(
    State(state): State<AppState>,
    CspNonce(nonce): CspNonce,
    RequireAuth(user): RequireAuth,
) -> Result<OrdersTemplate> {
    let orders = state.catalog().list_orders(&user.id).await?;

    Ok(OrdersTemplate {
        orders: orders.iter().map(OrderView::from).collect(),
        user: Some(user),
        nonce,
    })
}
