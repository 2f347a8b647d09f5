//! Newtype wrappers shared across the storefront.

pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::{CartId, CartItemId, CategoryId, OrderId, OrderItemId, ProductId};
pub use price::{Currency, Price};
pub use status::{ContactSubject, OrderStatus};
