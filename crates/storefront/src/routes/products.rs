//! Product route handlers.
//!
//! Listing supports a category filter and a name search. Both operate on
//! the backend's product lists; search narrows the fetched list by a
//! case-insensitive substring match, the same contract the backend's own
//! clients use.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::instrument;

use civil_materials_core::{CategoryId, ProductId};

use crate::catalog::Product;
use crate::error::Result;
use crate::filters::{self, format_money};
use crate::middleware::{CspNonce, OptionalAuth};
use crate::models::CurrentUser;
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// Product card display data for listing pages.
#[derive(Clone)]
pub struct ProductCardView {
    pub id: ProductId,
    pub name: String,
    pub price: String,
    pub image: Option<String>,
    pub in_stock: bool,
}

impl From<&Product> for ProductCardView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: format_money(&product.price.to_string()),
            image: product.image.clone(),
            in_stock: product.in_stock(),
        }
    }
}

/// Category filter option display data.
#[derive(Clone)]
pub struct CategoryOption {
    pub id: i32,
    pub name: String,
    pub selected: bool,
}

/// Product detail display data.
#[derive(Clone)]
pub struct ProductDetailView {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: String,
    pub stock: i32,
    pub in_stock: bool,
    pub image: Option<String>,
    pub gallery: Vec<String>,
}

impl From<&Product> for ProductDetailView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: format_money(&product.price.to_string()),
            stock: product.stock,
            in_stock: product.in_stock(),
            image: product.image.clone(),
            gallery: product
                .product_images
                .iter()
                .filter_map(|img| img.image_url.clone())
                .collect(),
        }
    }
}

// =============================================================================
// Query & Filtering
// =============================================================================

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    /// Category filter.
    pub category: Option<i32>,
    /// Name search term.
    pub q: Option<String>,
}

/// Narrow a product list by a case-insensitive name substring match.
fn search_products<'a>(products: &'a [Product], term: &str) -> Vec<&'a Product> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return products.iter().collect();
    }
    products
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&needle))
        .collect()
}

// =============================================================================
// Templates
// =============================================================================

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductIndexTemplate {
    pub products: Vec<ProductCardView>,
    pub categories: Vec<CategoryOption>,
    pub search: String,
    pub user: Option<CurrentUser>,
    pub nonce: String,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub product: ProductDetailView,
    pub user: Option<CurrentUser>,
    pub nonce: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the product listing.
#[instrument(skip(state, nonce, user))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
    CspNonce(nonce): CspNonce,
    OptionalAuth(user): OptionalAuth,
) -> Result<ProductIndexTemplate> {
    let categories = state.catalog().list_categories().await?;

    let products = match query.category {
        Some(id) => {
            state
                .catalog()
                .products_by_category(CategoryId::new(id))
                .await?
        }
        None => state.catalog().list_products().await?,
    };

    let search = query.q.unwrap_or_default();
    let cards = search_products(&products, &search)
        .into_iter()
        .map(ProductCardView::from)
        .collect();

    let categories = categories
        .iter()
        .map(|c| CategoryOption {
            id: c.id.as_i32(),
            name: c.name.clone(),
            selected: query.category == Some(c.id.as_i32()),
        })
        .collect();

    Ok(ProductIndexTemplate {
        products: cards,
        categories,
        search,
        user,
        nonce,
    })
}

/// Display a product detail page.
#[instrument(skip(state, nonce, user), fields(product_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    CspNonce(nonce): CspNonce,
    OptionalAuth(user): OptionalAuth,
) -> Result<ProductShowTemplate> {
    let product = state.catalog().get_product(ProductId::new(id)).await?;

    Ok(ProductShowTemplate {
        product: ProductDetailView::from(&product),
        user,
        nonce,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str) -> Product {
        Product {
            id: ProductId::new(1),
            name: name.to_string(),
            description: String::new(),
            price: rust_decimal::Decimal::ONE,
            stock: 1,
            category: CategoryId::new(1),
            image: None,
            product_images: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let products = vec![
            product("Portland Cement 50kg"),
            product("Rebar 12mm"),
            product("White cement 25kg"),
        ];
        let hits = search_products(&products, "CEMENT");
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_blank_search_returns_everything() {
        let products = vec![product("Sand"), product("Gravel")];
        assert_eq!(search_products(&products, "  ").len(), 2);
    }
}
