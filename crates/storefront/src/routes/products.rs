//! Catalog read handlers.

use axum::{
    Json,
    extract::{Path, State},
};

use ambra_core::ProductId;

use crate::db::catalog;
use crate::error::{AppError, Result};
use crate::models::product::{FeaturedProduct, Product};
use crate::state::AppState;

/// GET /api/products/featured
///
/// The cached featured shelf; refreshed on stock-affecting commits and
/// catalog edits.
pub async fn featured(State(state): State<AppState>) -> Result<Json<Vec<FeaturedProduct>>> {
    let products = state.featured().get(state.pool()).await?;
    Ok(Json(products.as_ref().clone()))
}

/// GET /api/products/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = catalog::get_product(state.pool(), product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_owned()))?;

    Ok(Json(product))
}
