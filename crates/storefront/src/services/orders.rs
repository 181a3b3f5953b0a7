//! Status transition engine.
//!
//! Applies a new lifecycle status to one or many orders. For each order the
//! engine looks at the status it held *before* the transition and derives
//! the stock consequence:
//!
//! | previous → new                  | stock action                     |
//! |---------------------------------|----------------------------------|
//! | X → cancelled (X ≠ cancelled)   | restore purchased qty per line   |
//! | cancelled → Y (Y ≠ cancelled)   | re-reserve purchased qty per line|
//! | anything else                   | none                             |
//!
//! Re-applying an order's current status performs no stock change but still
//! re-stamps that status's timeline entry (an intentional idempotent
//! refresh). The order-row batch and the resulting stock-ledger batch
//! commit inside one transaction, so a crash can never leave statuses
//! flipped with stock unreconciled.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{info, instrument};

use ambra_core::{OrderId, OrderStatus, OrderTimeline, SizeId};

use crate::db::inventory::{self, StockAdjustment};
use crate::db::orders::{self, LineSnapshot, RestockCandidate};
use crate::db::RepositoryError;
use crate::models::order::OrderSnapshot;

/// Stock consequence of a single order's transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockAction {
    /// No stock movement.
    None,
    /// Return the purchased quantities to stock (order leaves circulation).
    Restore,
    /// Take the purchased quantities out of stock again (order re-enters
    /// circulation after a cancellation).
    Reserve,
}

/// Decide the stock action for one order, from its previous status.
#[must_use]
pub fn stock_action(previous: OrderStatus, next: OrderStatus) -> StockAction {
    if previous == next {
        return StockAction::None;
    }

    if next == OrderStatus::Cancelled {
        return StockAction::Restore;
    }

    if previous == OrderStatus::Cancelled {
        return StockAction::Reserve;
    }

    StockAction::None
}

/// The auto-generated, customer-facing description for a status change.
///
/// Used when the caller supplies no explicit description (the
/// cancel-with-reason flow does).
#[must_use]
pub fn event_description(status: OrderStatus, city: &str) -> String {
    match status {
        OrderStatus::Processing => "Your order is being processed".to_owned(),
        OrderStatus::Dispatched => "Your order has been dispatched from our facility".to_owned(),
        OrderStatus::Shipped => format!("Your order has been shipped to {city}"),
        OrderStatus::Delivered => format!("Your order has been delivered in {city}"),
        OrderStatus::OnHold => "Your order has been put on hold".to_owned(),
        OrderStatus::Cancelled => "Your order has been cancelled".to_owned(),
    }
}

/// What a status update did, for the caller's cache decision and response.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusUpdateOutcome {
    /// Order rows written.
    pub orders_updated: u64,
    /// Size rows whose stock moved.
    pub stock_rows_adjusted: u64,
    /// Whether any order in the batch required a stock adjustment; the
    /// featured-products cache must be invalidated once when true.
    pub stock_touched: bool,
}

/// Apply `new_status` to every order in `snapshots`.
///
/// `description` overrides the auto-generated timeline text for all orders
/// in the batch. The whole operation - status rows, merged timelines, and
/// the derived stock batch - commits in one transaction.
///
/// # Errors
///
/// Returns `RepositoryError` if any statement fails; nothing is applied in
/// that case.
#[instrument(skip(pool, snapshots, description), fields(orders = snapshots.len(), status = %new_status))]
pub async fn update_status(
    pool: &PgPool,
    snapshots: &[OrderSnapshot],
    new_status: OrderStatus,
    description: Option<&str>,
) -> Result<StatusUpdateOutcome, RepositoryError> {
    if snapshots.is_empty() {
        return Ok(StatusUpdateOutcome::default());
    }

    let now = Utc::now();
    let updates = merged_timelines(snapshots, new_status, now, description);

    let restore_by_order: HashMap<OrderId, bool> = snapshots
        .iter()
        .filter_map(|snap| match stock_action(snap.status, new_status) {
            StockAction::None => None,
            StockAction::Restore => Some((snap.id, true)),
            StockAction::Reserve => Some((snap.id, false)),
        })
        .collect();

    let mut tx = pool.begin().await?;

    let orders_updated = match updates.as_slice() {
        [(order_id, events)] => {
            orders::apply_status_single(&mut tx, *order_id, new_status, events).await?
        }
        _ => orders::apply_status_batch(&mut tx, &updates, new_status).await?,
    };

    let mut stock_rows_adjusted = 0;
    if !restore_by_order.is_empty() {
        let affected: Vec<OrderId> = restore_by_order.keys().copied().collect();
        let lines = orders::items_for_orders(&mut tx, &affected).await?;

        if !lines.is_empty() {
            let product_ids: Vec<_> = lines.iter().map(|line| line.product_id).collect();
            let values: Vec<i32> = lines.iter().map(|line| line.size).collect();
            let candidates = orders::restock_candidates(&mut tx, &product_ids, &values).await?;

            let adjustments = line_adjustments(&lines, &candidates, &restore_by_order);
            if !adjustments.is_empty() {
                stock_rows_adjusted =
                    inventory::adjust_stock_batch(&mut tx, &adjustments).await?;
            }
        }
    }

    tx.commit().await?;

    let stock_touched = !restore_by_order.is_empty();
    info!(
        orders_updated,
        stock_rows_adjusted, stock_touched, "order status updated"
    );

    Ok(StatusUpdateOutcome {
        orders_updated,
        stock_rows_adjusted,
        stock_touched,
    })
}

/// Merge the new status's event into each order's existing timeline.
fn merged_timelines(
    snapshots: &[OrderSnapshot],
    new_status: OrderStatus,
    now: DateTime<Utc>,
    description: Option<&str>,
) -> Vec<(OrderId, OrderTimeline)> {
    snapshots
        .iter()
        .map(|snap| {
            let description = description
                .map_or_else(|| event_description(new_status, &snap.city), str::to_owned);

            let mut events = snap.events.clone();
            events.record(new_status, now, description);
            (snap.id, events)
        })
        .collect()
}

/// Turn line items into ledger adjustments by matching each (product, size
/// value) pair back to a live size row. Lines whose size was deleted find
/// no candidate and are skipped.
fn line_adjustments(
    lines: &[LineSnapshot],
    candidates: &[RestockCandidate],
    restore_by_order: &HashMap<OrderId, bool>,
) -> Vec<StockAdjustment> {
    let size_by_key: HashMap<(ambra_core::ProductId, i32), SizeId> = candidates
        .iter()
        .map(|candidate| ((candidate.product_id, candidate.value), candidate.id))
        .collect();

    lines
        .iter()
        .filter_map(|line| {
            let size_id = size_by_key.get(&(line.product_id, line.size))?;
            let restore = restore_by_order.get(&line.order_id)?;
            let delta = if *restore {
                line.quantity
            } else {
                -line.quantity
            };

            Some(StockAdjustment {
                size_id: *size_id,
                delta,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ambra_core::ProductId;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 2, hour, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn snapshot(status: OrderStatus) -> OrderSnapshot {
        OrderSnapshot {
            id: OrderId::generate(),
            status,
            city: "Lahore".to_owned(),
            events: OrderTimeline::seeded(OrderStatus::Processing, at(9), "placed"),
        }
    }

    #[test]
    fn test_decision_table() {
        use OrderStatus::{Cancelled, Delivered, Dispatched, OnHold, Processing, Shipped};

        // X -> cancelled restores
        for previous in [Processing, Dispatched, Shipped, Delivered, OnHold] {
            assert_eq!(stock_action(previous, Cancelled), StockAction::Restore);
        }

        // cancelled -> Y re-reserves
        for next in [Processing, Dispatched, Shipped, Delivered, OnHold] {
            assert_eq!(stock_action(Cancelled, next), StockAction::Reserve);
        }

        // same status never moves stock, including cancelled -> cancelled
        for status in [Processing, Dispatched, Shipped, Delivered, OnHold, Cancelled] {
            assert_eq!(stock_action(status, status), StockAction::None);
        }

        // ordinary forward transitions never move stock
        assert_eq!(stock_action(Processing, Dispatched), StockAction::None);
        assert_eq!(stock_action(Dispatched, Shipped), StockAction::None);
        assert_eq!(stock_action(Shipped, Delivered), StockAction::None);
        assert_eq!(stock_action(OnHold, Processing), StockAction::None);
    }

    #[test]
    fn test_merged_timeline_preserves_existing_keys() {
        let snap = snapshot(OrderStatus::Processing);
        let updates = merged_timelines(&[snap.clone()], OrderStatus::Shipped, at(17), None);

        let (order_id, events) = updates.first().expect("one update");
        assert_eq!(*order_id, snap.id);
        assert!(events.contains(OrderStatus::Processing), "old key preserved");
        assert_eq!(
            events
                .get(OrderStatus::Shipped)
                .map(|e| e.description.as_str()),
            Some("Your order has been shipped to Lahore")
        );
    }

    #[test]
    fn test_same_status_reapply_refreshes_timestamp() {
        let snap = snapshot(OrderStatus::Processing);
        let updates = merged_timelines(&[snap], OrderStatus::Processing, at(16), None);

        let (_, events) = updates.first().expect("one update");
        assert_eq!(events.len(), 1);
        assert_eq!(
            events.get(OrderStatus::Processing).map(|e| e.date),
            Some(at(16)),
            "timestamp re-stamped even though status did not change"
        );
    }

    #[test]
    fn test_caller_description_overrides_generated_one() {
        let snap = snapshot(OrderStatus::Processing);
        let updates = merged_timelines(
            &[snap],
            OrderStatus::Cancelled,
            at(12),
            Some("wrong size ordered"),
        );

        let (_, events) = updates.first().expect("one update");
        assert_eq!(
            events
                .get(OrderStatus::Cancelled)
                .map(|e| e.description.as_str()),
            Some("wrong size ordered")
        );
    }

    #[test]
    fn test_line_adjustments_signs_and_skips() {
        let product = ProductId::generate();
        let size_50 = SizeId::generate();
        let restored_order = OrderId::generate();
        let reserved_order = OrderId::generate();

        let lines = vec![
            LineSnapshot {
                order_id: restored_order,
                product_id: product,
                size: 50,
                quantity: 3,
            },
            LineSnapshot {
                order_id: reserved_order,
                product_id: product,
                size: 50,
                quantity: 2,
            },
            // size row deleted since purchase: no candidate, skipped
            LineSnapshot {
                order_id: restored_order,
                product_id: product,
                size: 100,
                quantity: 1,
            },
        ];
        let candidates = vec![RestockCandidate {
            id: size_50,
            product_id: product,
            value: 50,
        }];
        let restore_by_order =
            HashMap::from([(restored_order, true), (reserved_order, false)]);

        let adjustments = line_adjustments(&lines, &candidates, &restore_by_order);

        assert_eq!(
            adjustments,
            vec![
                StockAdjustment {
                    size_id: size_50,
                    delta: 3
                },
                StockAdjustment {
                    size_id: size_50,
                    delta: -2
                },
            ]
        );
    }

    #[test]
    fn test_cancel_reinstate_is_symmetric() {
        let product = ProductId::generate();
        let size = SizeId::generate();
        let order = OrderId::generate();

        let lines = vec![LineSnapshot {
            order_id: order,
            product_id: product,
            size: 50,
            quantity: 3,
        }];
        let candidates = vec![RestockCandidate {
            id: size,
            product_id: product,
            value: 50,
        }];

        let restored =
            line_adjustments(&lines, &candidates, &HashMap::from([(order, true)]));
        let reserved =
            line_adjustments(&lines, &candidates, &HashMap::from([(order, false)]));

        let net: i32 = restored
            .iter()
            .chain(reserved.iter())
            .map(|adjustment| adjustment.delta)
            .sum();
        assert_eq!(net, 0, "restore then re-reserve leaves net stock unchanged");
    }
}
