//! Cart resolution handler.
//!
//! The client polls this with its persisted cart lines, passed as indexed
//! JSON query parameters (`items[0]={"productId":...}&items[1]=...`), and
//! reconciles its store from the response: `removed` lines are pruned,
//! clamped quantities adopted.

use axum::{
    Json,
    extract::{Query, State},
};

use crate::error::{AppError, Result};
use crate::services::cart::{self, CartLine, CartResolution};
use crate::state::AppState;

/// GET /api/cart/resolve
pub async fn resolve(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<CartResolution>> {
    let mut lines: Vec<CartLine> = Vec::new();

    for (key, value) in &params {
        if !key.starts_with("items") {
            continue;
        }
        match serde_json::from_str::<CartLine>(value) {
            Ok(line) => lines.push(line),
            Err(err) => tracing::warn!(error = %err, "failed to parse cart item"),
        }
    }

    if lines.is_empty() || lines.iter().any(|line| line.qty < 1) {
        return Err(AppError::Validation("Invalid cart data".to_owned()));
    }

    let resolution = cart::resolve_cart(state.pool(), &lines).await?;
    Ok(Json(resolution))
}
