//! Cache types for catalog read responses.

use std::sync::Arc;

use crate::catalog::types::{Category, Product};

/// Cached value types. Lists are shared via `Arc` so a cache hit never
/// clones the whole catalog.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Arc<Vec<Product>>),
    Categories(Arc<Vec<Category>>),
}
