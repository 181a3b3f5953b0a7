//! Read-only cart resolution.
//!
//! Pre-checkout, the client polls with its cart lines and gets back
//! authoritative price/stock data. Unlike the checkout resolver this never
//! fails a request over availability; instead it self-heals:
//!
//! - lines whose product/size no longer resolves (deleted, archived,
//!   soft-deleted) are dropped and reported in `removed` so the client
//!   store can prune them;
//! - a quantity above the available stock is clamped down to it;
//! - zero-stock lines are kept untouched so the UI can render them as
//!   out-of-stock.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use ambra_core::{ProductId, SizeId};
use rust_decimal::Decimal;

use crate::db::catalog::{self, CartRow};
use crate::db::RepositoryError;
use crate::models::product::ProductImage;

/// A cart line as the client submits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub size_id: SizeId,
    pub qty: i32,
}

/// A cart line after server-side resolution.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCartLine {
    pub product_id: ProductId,
    pub size_id: SizeId,
    pub title: String,
    pub images: Vec<ProductImage>,
    /// Size in millilitres.
    pub value: i32,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub stock: i32,
    /// Requested quantity, clamped to `stock` when stock is positive.
    pub qty: i32,
}

/// The reconciled cart returned to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResolution {
    pub items: Vec<ResolvedCartLine>,
    /// Lines that no longer resolve; the client removes them from its
    /// persisted cart state.
    pub removed: Vec<CartLine>,
}

/// Resolve cart lines against the live catalog.
///
/// # Errors
///
/// Returns `RepositoryError` if the lookup fails.
pub async fn resolve_cart(
    pool: &PgPool,
    requested: &[CartLine],
) -> Result<CartResolution, RepositoryError> {
    if requested.is_empty() {
        return Ok(CartResolution {
            items: Vec::new(),
            removed: Vec::new(),
        });
    }

    let product_ids: Vec<ProductId> = requested.iter().map(|line| line.product_id).collect();
    let size_ids: Vec<SizeId> = requested.iter().map(|line| line.size_id).collect();

    let rows = catalog::cart_rows(pool, &product_ids, &size_ids).await?;

    Ok(reconcile(requested, rows))
}

/// Pure reconciliation of requested lines against resolved rows.
fn reconcile(requested: &[CartLine], rows: Vec<CartRow>) -> CartResolution {
    let mut items = Vec::with_capacity(requested.len());
    let mut removed = Vec::new();

    for line in requested {
        let row = rows
            .iter()
            .find(|row| row.product_id == line.product_id && row.size_id == line.size_id);

        match row {
            Some(row) => {
                let qty = if row.stock > 0 {
                    line.qty.min(row.stock)
                } else {
                    line.qty
                };

                items.push(ResolvedCartLine {
                    product_id: row.product_id,
                    size_id: row.size_id,
                    title: row.title.clone(),
                    images: row.images.clone(),
                    value: row.value,
                    price: row.price,
                    compare_at_price: row.compare_at_price,
                    stock: row.stock,
                    qty,
                });
            }
            None => removed.push(*line),
        }
    }

    CartResolution { items, removed }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(line: CartLine, stock: i32) -> CartRow {
        CartRow {
            product_id: line.product_id,
            title: "Oud Royale".to_owned(),
            images: Vec::new(),
            size_id: line.size_id,
            value: 50,
            price: Decimal::new(10_00, 2),
            compare_at_price: None,
            stock,
        }
    }

    fn line(qty: i32) -> CartLine {
        CartLine {
            product_id: ProductId::generate(),
            size_id: SizeId::generate(),
            qty,
        }
    }

    #[test]
    fn test_unresolvable_lines_are_dropped_and_reported() {
        let kept = line(1);
        let gone = line(2);

        let resolution = reconcile(&[kept, gone], vec![row(kept, 4)]);

        assert_eq!(resolution.items.len(), 1);
        assert_eq!(resolution.removed, vec![gone]);
    }

    #[test]
    fn test_qty_clamped_to_available_stock() {
        let requested = line(9);
        let resolution = reconcile(&[requested], vec![row(requested, 3)]);

        assert_eq!(resolution.items[0].qty, 3);
        assert_eq!(resolution.items[0].stock, 3);
    }

    #[test]
    fn test_zero_stock_lines_are_kept_unclamped() {
        let requested = line(2);
        let resolution = reconcile(&[requested], vec![row(requested, 0)]);

        assert!(resolution.removed.is_empty());
        assert_eq!(resolution.items[0].qty, 2);
        assert_eq!(resolution.items[0].stock, 0);
    }

    #[test]
    fn test_qty_within_stock_is_untouched() {
        let requested = line(2);
        let resolution = reconcile(&[requested], vec![row(requested, 5)]);

        assert_eq!(resolution.items[0].qty, 2);
    }
}
