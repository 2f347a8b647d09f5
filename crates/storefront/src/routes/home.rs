//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::catalog::Category;
use crate::error::Result;
use crate::filters;
use crate::middleware::{CspNonce, OptionalAuth};
use crate::models::CurrentUser;
use crate::routes::products::ProductCardView;
use crate::state::AppState;

/// Number of in-stock products highlighted on the home page.
const FEATURED_COUNT: usize = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub categories: Vec<Category>,
    pub featured: Vec<ProductCardView>,
    pub user: Option<CurrentUser>,
    pub nonce: String,
}

/// Display the home page: category tiles plus in-stock highlights.
#[instrument(skip(state, nonce, user))]
pub async fn home(
    State(state): State<AppState>,
    CspNonce(nonce): CspNonce,
    OptionalAuth(user): OptionalAuth,
) -> Result<HomeTemplate> {
    let categories = state.catalog().list_categories().await?;
    let featured = state.catalog().products_in_stock().await?;

    Ok(HomeTemplate {
        categories: categories.as_ref().clone(),
        featured: featured
            .iter()
            .take(FEATURED_COUNT)
            .map(ProductCardView::from)
            .collect(),
        user,
        nonce,
    })
}
