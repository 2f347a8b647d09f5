//! Domain types for the catalog backend's JSON API.
//!
//! Field names and shapes mirror the backend's serializers exactly, so these
//! deserialize straight off the wire. Monetary fields arrive as decimal
//! strings and parse into `rust_decimal::Decimal` (the `serde-with-str`
//! feature), never floats.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use civil_materials_core::{CartId, CartItemId, CategoryId, OrderId, OrderItemId, OrderStatus, ProductId};

// =============================================================================
// Catalog Types
// =============================================================================

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Category ID.
    pub id: CategoryId,
    /// Display name (e.g., "Cement & Concrete").
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Creation timestamp.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: Option<DateTime<Utc>>,
}

/// A gallery image attached to a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductImage {
    /// Image record ID.
    pub id: i32,
    /// Raw storage path.
    pub image: Option<String>,
    /// Public URL for the image.
    pub image_url: Option<String>,
}

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// Product name.
    pub name: String,
    /// Plain text description.
    pub description: String,
    /// Unit price (decimal string on the wire).
    pub price: Decimal,
    /// Units in stock; 0 means unavailable.
    pub stock: i32,
    /// Owning category.
    pub category: CategoryId,
    /// Primary image URL.
    pub image: Option<String>,
    /// Additional gallery images.
    #[serde(default)]
    pub product_images: Vec<ProductImage>,
    /// Creation timestamp.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Whether the product can currently be added to a cart.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

// =============================================================================
// Cart Types
// =============================================================================

/// A line item in the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    /// Cart item ID.
    pub id: CartItemId,
    /// The product, embedded in full.
    pub product: Product,
    /// Requested quantity.
    pub quantity: u32,
    /// Server-computed line subtotal.
    pub subtotal: Decimal,
}

/// A shopping cart, replaced wholesale on every fetch.
///
/// `total` is computed by the backend; the storefront renders it verbatim
/// and never recomputes it from the lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    /// Cart ID.
    pub id: CartId,
    /// Backend cart session identifier.
    pub session_id: String,
    /// Identity-provider user id, once the cart is claimed.
    pub user_id: Option<String>,
    /// Identity-provider user email.
    pub user_email: Option<String>,
    /// Cart lines.
    pub items: Vec<CartItem>,
    /// Server-computed cart total.
    pub total: Decimal,
}

impl Cart {
    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

// =============================================================================
// Order Types
// =============================================================================

/// A line item snapshot on an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    /// Order item ID.
    pub id: OrderItemId,
    /// Product name at time of order.
    pub product_name: String,
    /// Unit price at time of order.
    pub product_price: Decimal,
    /// Quantity ordered.
    pub quantity: u32,
    /// Server-computed line subtotal.
    pub subtotal: Decimal,
}

/// An order, created only by the place-order call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order ID.
    pub id: OrderId,
    /// Human-facing order number (e.g., `ORD-20260825-4F2A1C`).
    pub order_number: String,
    /// Identity-provider user id.
    pub user_id: Option<String>,
    /// Identity-provider user email.
    pub user_email: Option<String>,
    /// Shipping recipient.
    pub full_name: String,
    /// Contact phone number.
    pub phone: String,
    /// Delivery address.
    pub address: String,
    /// Server-computed order total.
    pub total_amount: Decimal,
    /// Current fulfillment status.
    pub status: OrderStatus,
    /// Order lines.
    pub items: Vec<OrderItem>,
    /// Creation timestamp.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Request Types
// =============================================================================

/// Body for the add-item mutation.
#[derive(Debug, Clone, Serialize)]
pub struct AddItemRequest {
    /// Product to add.
    pub product_id: ProductId,
    /// Units to add (merged into any existing line).
    pub quantity: u32,
}

/// Body for the update-item mutation. Quantity 0 removes the line.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateItemRequest {
    /// Product whose line to update.
    pub product_id: ProductId,
    /// New absolute quantity; 0 removes.
    pub quantity: u32,
}

/// Body for the place-order mutation: shipping fields plus session identity.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceOrderRequest {
    /// Shipping recipient.
    pub full_name: String,
    /// Contact phone number.
    pub phone: String,
    /// Delivery address.
    pub address: String,
    /// Identity-provider user id.
    pub user_id: String,
    /// Identity-provider user email.
    pub user_email: String,
}

/// Body for a contact-form submission.
#[derive(Debug, Clone, Serialize)]
pub struct ContactRequest {
    /// Sender name.
    pub name: String,
    /// Sender email.
    pub email: String,
    /// Optional phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Subject category (wire value, e.g. `"general"`).
    pub subject: String,
    /// Message body.
    pub message: String,
}

// =============================================================================
// Response Envelopes
// =============================================================================

/// Response from the CSRF bootstrap endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CsrfResponse {
    /// Token to replay as cookie and `X-CSRFToken` header.
    #[serde(rename = "csrfToken")]
    pub csrf_token: String,
}

/// Error body returned by the backend on rejected requests.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cart_fixture() -> &'static str {
        // Shape produced by the backend's cart serializer
        r#"{
            "id": 4,
            "session_id": "1f0d7a62-9f2e-4f8e-a9ce-0b1f61f3b2a7",
            "user_id": "8a61dc0e-6f3e-4f1d-9b57-2f81c9f4a330",
            "user_email": "foreman@example.com",
            "items": [
                {
                    "id": 11,
                    "product": {
                        "id": 2,
                        "name": "Portland Cement 50kg",
                        "description": "Type I general purpose cement.",
                        "price": "12.50",
                        "stock": 240,
                        "category": 1,
                        "image": "/media/products/cement.jpg",
                        "product_images": [],
                        "created_at": "2026-01-05T09:00:00Z",
                        "updated_at": "2026-02-11T10:30:00Z"
                    },
                    "quantity": 4,
                    "subtotal": "50.00"
                },
                {
                    "id": 12,
                    "product": {
                        "id": 7,
                        "name": "Rebar 12mm x 6m",
                        "description": "Deformed steel bar.",
                        "price": "8.75",
                        "stock": 900,
                        "category": 3,
                        "image": null,
                        "product_images": [],
                        "created_at": null,
                        "updated_at": null
                    },
                    "quantity": 10,
                    "subtotal": "87.50"
                }
            ],
            "total": "137.50"
        }"#
    }

    #[test]
    fn test_cart_deserializes_from_backend_shape() {
        let cart: Cart = serde_json::from_str(cart_fixture()).unwrap();
        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.item_count(), 14);
        assert_eq!(cart.user_email.as_deref(), Some("foreman@example.com"));
        assert_eq!(cart.total, Decimal::new(13750, 2));
    }

    #[test]
    fn test_cart_total_is_server_value_not_recomputed() {
        // A cart whose server total deliberately disagrees with the line sums:
        // the client must carry the server's figure, not its own arithmetic.
        let json = r#"{
            "id": 1,
            "session_id": "s",
            "user_id": null,
            "user_email": null,
            "items": [
                {
                    "id": 1,
                    "product": {
                        "id": 1, "name": "Gravel", "description": "",
                        "price": "10.00", "stock": 5, "category": 1,
                        "image": null, "product_images": [],
                        "created_at": null, "updated_at": null
                    },
                    "quantity": 1,
                    "subtotal": "10.00"
                }
            ],
            "total": "9.00"
        }"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        assert_eq!(cart.total, Decimal::new(900, 2));
    }

    #[test]
    fn test_order_deserializes_with_status() {
        let json = r#"{
            "id": 3,
            "order_number": "ORD-20260825-4F2A1C",
            "user_id": "u-1",
            "user_email": "foreman@example.com",
            "full_name": "Dana Reyes",
            "phone": "555-0142",
            "address": "12 Quarry Rd",
            "total_amount": "137.50",
            "status": "pending",
            "items": [
                {
                    "id": 9,
                    "product_name": "Portland Cement 50kg",
                    "product_price": "12.50",
                    "quantity": 4,
                    "subtotal": "50.00"
                }
            ],
            "created_at": "2026-08-25T12:00:00Z",
            "updated_at": "2026-08-25T12:00:00Z"
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, Decimal::new(13750, 2));
        assert_eq!(order.items.len(), 1);
    }

    #[test]
    fn test_csrf_response_field_rename() {
        let resp: CsrfResponse = serde_json::from_str(r#"{"csrfToken":"abc123"}"#).unwrap();
        assert_eq!(resp.csrf_token, "abc123");
    }

    #[test]
    fn test_product_in_stock() {
        let json = r#"{
            "id": 1, "name": "Sand", "description": "", "price": "4.00",
            "stock": 0, "category": 2, "image": null, "product_images": [],
            "created_at": null, "updated_at": null
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert!(!product.in_stock());
    }
}
