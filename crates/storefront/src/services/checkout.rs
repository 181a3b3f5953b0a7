//! Order placement: cart to durable order aggregate.
//!
//! `place_order` runs one transaction covering the availability check, the
//! order/items/payment inserts, and the batched stock decrement. Prices are
//! always re-resolved server-side inside that transaction; a client-supplied
//! price never reaches the subtotal. The confirmation email and the
//! featured-cache invalidation happen after commit and cannot roll the
//! order back.

use std::collections::HashMap;

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use ambra_core::{OrderId, OrderStatus, OrderTimeline, PaymentMethod, ProductId, ShippingType, SizeId, UserId};

use crate::db::catalog::{self, ResolvedSize};
use crate::db::inventory::{self, StockAdjustment};
use crate::db::orders::{self, NewOrder, NewOrderItem};
use crate::db::RepositoryError;
use crate::models::order::CustomerDetails;
use crate::models::shipping::ShippingRate;
use crate::services::catalog_cache::FeaturedCache;
use crate::services::email::{EmailService, OrderConfirmation};

/// Timeline text seeded with every new order.
const SEED_EVENT_DESCRIPTION: &str = "Your order is on its way";

/// How many tracking ids to try before giving up on the collision lottery.
const TRACKING_ID_ATTEMPTS: usize = 5;

/// A requested cart line at checkout.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutItem {
    pub product_id: ProductId,
    pub size_id: SizeId,
    pub qty: i32,
}

/// Everything checkout needs to build the order aggregate.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub customer: CustomerDetails,
    pub shipping_type: ShippingType,
    pub payment_method: PaymentMethod,
    pub items: Vec<CheckoutItem>,
}

/// Errors raised by the checkout workflow.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A requested size is out of stock or gone; the whole checkout aborts.
    #[error("You've selected some unavailable products")]
    Unavailable,

    /// Malformed input, rejected before the transaction starts.
    #[error("{0}")]
    Validation(String),

    /// Database failure; nothing was persisted.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Place an order. Returns the new order's id on success.
///
/// # Errors
///
/// - [`CheckoutError::Validation`] for malformed input (no transaction is
///   started).
/// - [`CheckoutError::Unavailable`] when any requested size fails the
///   stock-positive resolution; the transaction rolls back with no order,
///   items, payment, or stock change persisted.
/// - [`CheckoutError::Repository`] for any other database failure, with the
///   same all-or-nothing guarantee.
#[instrument(skip(pool, featured, mailer, input), fields(items = input.items.len()))]
pub async fn place_order(
    pool: &PgPool,
    featured: &FeaturedCache,
    mailer: Option<&EmailService>,
    user_id: Option<UserId>,
    input: PlaceOrder,
) -> Result<OrderId, CheckoutError> {
    validate(&input)?;

    let order_id = OrderId::generate();
    let now = Utc::now();
    let rate = ShippingRate::for_type(input.shipping_type);

    let mut tx = pool.begin().await.map_err(RepositoryError::from)?;

    // Availability + price snapshot, inside the transaction.
    let size_ids: Vec<SizeId> = input.items.iter().map(|item| item.size_id).collect();
    let resolved = catalog::resolve_checkout_sizes(&mut tx, &size_ids).await?;
    let resolved_by_id: HashMap<SizeId, &ResolvedSize> =
        resolved.iter().map(|size| (size.id, size)).collect();

    let subtotal = subtotal(&input.items, &resolved_by_id)?;

    let tracking_id = unique_tracking_id(&mut tx).await?;

    orders::insert_order(
        &mut tx,
        &NewOrder {
            id: order_id,
            tracking_id: tracking_id.clone(),
            customer: input.customer.clone(),
            shipping_type: input.shipping_type,
            est_delivery_date: now + rate.delivery_offset,
            events: OrderTimeline::seeded(OrderStatus::Processing, now, SEED_EVENT_DESCRIPTION),
            user_id,
        },
    )
    .await?;

    let items: Vec<NewOrderItem> = input
        .items
        .iter()
        .map(|item| {
            let size = resolved_by_id
                .get(&item.size_id)
                .ok_or(CheckoutError::Unavailable)?;
            Ok(NewOrderItem {
                product_id: item.product_id,
                size: size.value,
                price: size.price,
                quantity: item.qty,
            })
        })
        .collect::<Result<_, CheckoutError>>()?;

    orders::insert_order_items(&mut tx, order_id, &items).await?;

    orders::insert_payment(&mut tx, order_id, input.payment_method, subtotal, rate.fee).await?;

    let adjustments: Vec<StockAdjustment> = input
        .items
        .iter()
        .map(|item| StockAdjustment {
            size_id: item.size_id,
            delta: -item.qty,
        })
        .collect();
    inventory::adjust_stock_batch(&mut tx, &adjustments).await?;

    tx.commit().await.map_err(RepositoryError::from)?;

    info!(order_id = %order_id, tracking_id = %tracking_id, "order placed");

    // Stock changed, so displayed availability may have too.
    featured.invalidate().await;

    // Fire-and-forget: a failed confirmation mail never unwinds the order.
    if let (Some(mailer), Some(email)) = (mailer, input.customer.email.as_ref()) {
        let mailer = mailer.clone();
        let to = email.as_str().to_owned();
        let confirmation = OrderConfirmation {
            customer_name: input.customer.customer_name.clone(),
            tracking_id,
            subtotal: subtotal.to_string(),
            shipping_fee: rate.fee.to_string(),
            total: (subtotal + rate.fee).to_string(),
            est_delivery_date: (now + rate.delivery_offset).format("%B %e, %Y").to_string(),
        };
        tokio::spawn(async move {
            if let Err(err) = mailer.send_order_confirmation(&to, &confirmation).await {
                warn!(error = %err, "failed to send order confirmation");
            }
        });
    }

    Ok(order_id)
}

/// Reject malformed input before any transaction starts.
fn validate(input: &PlaceOrder) -> Result<(), CheckoutError> {
    if input.items.is_empty() {
        return Err(CheckoutError::Validation(
            "Please add at least one item".to_owned(),
        ));
    }
    if input.items.iter().any(|item| item.qty < 1) {
        return Err(CheckoutError::Validation(
            "Item quantity must be at least 1".to_owned(),
        ));
    }

    let required = [
        (&input.customer.customer_name, "Please enter your name"),
        (&input.customer.phone_number, "Please enter your phone number"),
        (&input.customer.state, "Please select your state"),
        (&input.customer.city, "Please enter your city name"),
        (&input.customer.address, "Please enter your complete address"),
    ];
    for (value, message) in required {
        if value.trim().is_empty() {
            return Err(CheckoutError::Validation((*message).to_owned()));
        }
    }

    Ok(())
}

/// Server-side subtotal over the resolved snapshot. A requested size
/// missing from the snapshot means it was out of stock (or gone) and fails
/// the whole checkout.
fn subtotal(
    items: &[CheckoutItem],
    resolved_by_id: &HashMap<SizeId, &ResolvedSize>,
) -> Result<Decimal, CheckoutError> {
    items.iter().try_fold(Decimal::ZERO, |acc, item| {
        let size = resolved_by_id
            .get(&item.size_id)
            .ok_or(CheckoutError::Unavailable)?;
        Ok(acc + size.price * Decimal::from(item.qty))
    })
}

/// Generate a tracking id and re-roll on collision, bounded.
async fn unique_tracking_id(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
) -> Result<String, CheckoutError> {
    for _ in 0..TRACKING_ID_ATTEMPTS {
        let candidate = generate_tracking_id();
        if !orders::tracking_id_exists(tx, &candidate).await? {
            return Ok(candidate);
        }
    }

    // Twelve digits make this practically unreachable; the UNIQUE index is
    // the final backstop if two checkouts race the same id.
    Err(CheckoutError::Repository(RepositoryError::Conflict(
        "could not allocate a tracking id".to_owned(),
    )))
}

/// A 12-digit tracking id with a nonzero leading digit.
fn generate_tracking_id() -> String {
    let mut rng = rand::rng();
    let mut id = String::with_capacity(12);
    id.push(char::from(b'1' + rng.random_range(0..9u8)));
    for _ in 1..12 {
        id.push(char::from(b'0' + rng.random_range(0..10u8)));
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> CustomerDetails {
        CustomerDetails {
            customer_name: "Nadia Khan".to_owned(),
            email: None,
            phone_number: "+923001234567".to_owned(),
            state: "Punjab".to_owned(),
            city: "Lahore".to_owned(),
            address: "14-B Gulberg III".to_owned(),
        }
    }

    fn order_with_items(items: Vec<CheckoutItem>) -> PlaceOrder {
        PlaceOrder {
            customer: customer(),
            shipping_type: ShippingType::Standard,
            payment_method: PaymentMethod::CashOnDelivery,
            items,
        }
    }

    fn item(qty: i32) -> CheckoutItem {
        CheckoutItem {
            product_id: ProductId::generate(),
            size_id: SizeId::generate(),
            qty,
        }
    }

    #[test]
    fn test_validate_rejects_empty_cart() {
        let result = validate(&order_with_items(Vec::new()));
        assert!(matches!(result, Err(CheckoutError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_zero_quantity() {
        let result = validate(&order_with_items(vec![item(0)]));
        assert!(matches!(result, Err(CheckoutError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_blank_address() {
        let mut order = order_with_items(vec![item(1)]);
        order.customer.address = "  ".to_owned();
        assert!(matches!(
            validate(&order),
            Err(CheckoutError::Validation(_))
        ));
    }

    #[test]
    fn test_subtotal_uses_resolved_prices() {
        let line = item(3);
        let resolved = ResolvedSize {
            id: line.size_id,
            value: 50,
            price: Decimal::new(10_00, 2),
        };
        let by_id = HashMap::from([(line.size_id, &resolved)]);

        let subtotal = subtotal(&[line], &by_id).expect("resolves");
        assert_eq!(subtotal.to_string(), "30.00");
    }

    #[test]
    fn test_subtotal_fails_when_a_size_is_unresolved() {
        let line = item(2);
        let by_id = HashMap::new();

        assert!(matches!(
            subtotal(&[line], &by_id),
            Err(CheckoutError::Unavailable)
        ));
    }

    #[test]
    fn test_tracking_id_shape() {
        for _ in 0..100 {
            let id = generate_tracking_id();
            assert_eq!(id.len(), 12);
            assert!(id.chars().all(|c| c.is_ascii_digit()));
            assert!(!id.starts_with('0'));
        }
    }
}
