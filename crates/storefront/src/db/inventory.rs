//! Inventory ledger: atomic, floor-guarded stock adjustments.
//!
//! Stock never goes below zero: every adjustment is a single conditional
//! UPDATE of the form `stock = GREATEST(stock + delta, 0)`, so the read and
//! the write happen inside the row lock the database takes. There is no
//! separate read-then-write step to lose under concurrent checkouts.
//!
//! The batch variant folds all affected rows into one CASE-per-id statement
//! (one round trip); ids with no matching row are skipped silently, which
//! covers sizes deleted after the order was placed.

use sqlx::{PgConnection, Postgres, QueryBuilder};

use ambra_core::SizeId;

use super::RepositoryError;

/// One row of a stock adjustment batch. Negative `delta` reserves stock
/// (purchase), positive `delta` restores it (cancellation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockAdjustment {
    pub size_id: SizeId,
    pub delta: i32,
}

/// Adjust a single size's stock, clamped at zero.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn adjust_stock(
    conn: &mut PgConnection,
    size_id: SizeId,
    delta: i32,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE product_sizes
        SET stock = GREATEST(stock + $1, 0), updated_at = now()
        WHERE id = $2
        ",
    )
    .bind(delta)
    .bind(size_id.as_uuid())
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Adjust many sizes' stock in one statement, each row clamped at zero.
///
/// Duplicate size ids are summed into one CASE arm before building the
/// statement. Returns the number of rows actually updated, which may be
/// less than the batch size when some ids no longer exist.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn adjust_stock_batch(
    conn: &mut PgConnection,
    adjustments: &[StockAdjustment],
) -> Result<u64, RepositoryError> {
    let merged = merge_adjustments(adjustments);
    if merged.is_empty() {
        return Ok(0);
    }

    let mut builder = build_batch_update(&merged);
    let result = builder.build().execute(conn).await?;

    Ok(result.rows_affected())
}

/// Sum deltas per size id, preserving first-seen order.
fn merge_adjustments(adjustments: &[StockAdjustment]) -> Vec<StockAdjustment> {
    let mut merged: Vec<StockAdjustment> = Vec::with_capacity(adjustments.len());

    for adjustment in adjustments {
        match merged.iter_mut().find(|m| m.size_id == adjustment.size_id) {
            Some(existing) => existing.delta += adjustment.delta,
            None => merged.push(*adjustment),
        }
    }

    merged
}

/// Build the CASE-per-id batch statement. Must only be called with a
/// non-empty, deduplicated set.
fn build_batch_update(merged: &[StockAdjustment]) -> QueryBuilder<'static, Postgres> {
    let mut builder =
        QueryBuilder::<Postgres>::new("UPDATE product_sizes SET stock = (CASE");

    for adjustment in merged {
        builder.push(" WHEN id = ");
        builder.push_bind(adjustment.size_id.as_uuid());
        builder.push(" THEN GREATEST(stock + ");
        builder.push_bind(adjustment.delta);
        builder.push(", 0)");
    }

    builder.push(" END), updated_at = now() WHERE id IN (");
    let mut ids = builder.separated(", ");
    for adjustment in merged {
        ids.push_bind(adjustment.size_id.as_uuid());
    }
    builder.push(")");

    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjustment(size_id: SizeId, delta: i32) -> StockAdjustment {
        StockAdjustment { size_id, delta }
    }

    #[test]
    fn test_merge_sums_duplicate_size_ids() {
        let a = SizeId::generate();
        let b = SizeId::generate();

        let merged = merge_adjustments(&[
            adjustment(a, -2),
            adjustment(b, 5),
            adjustment(a, -1),
        ]);

        assert_eq!(merged, vec![adjustment(a, -3), adjustment(b, 5)]);
    }

    #[test]
    fn test_merge_of_empty_batch_is_empty() {
        assert!(merge_adjustments(&[]).is_empty());
    }

    #[test]
    fn test_batch_statement_shape() {
        let a = SizeId::generate();
        let b = SizeId::generate();
        let builder = build_batch_update(&[adjustment(a, -3), adjustment(b, 2)]);

        let sql = builder.sql();
        assert_eq!(sql.matches("WHEN id = ").count(), 2);
        assert_eq!(sql.matches("GREATEST(stock + ").count(), 2, "every arm is floor-guarded");
        assert!(sql.ends_with("WHERE id IN ($5, $6)"), "unexpected sql: {sql}");
        assert!(sql.contains("updated_at = now()"));
    }

    #[test]
    fn test_batch_statement_has_one_arm_per_size() {
        let a = SizeId::generate();
        let merged = merge_adjustments(&[adjustment(a, -1), adjustment(a, -1)]);
        let builder = build_batch_update(&merged);

        assert_eq!(builder.sql().matches("WHEN id = ").count(), 1);
    }
}
