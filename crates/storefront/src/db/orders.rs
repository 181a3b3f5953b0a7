//! Order repository: aggregate persistence and status/payment updates.
//!
//! The checkout path inserts the order, its line-item snapshots, and the
//! payment inside the caller's transaction. The status path reads previous
//! statuses, then writes the merged timelines and the new status as a
//! single statement (one UPDATE for one order, one CASE-per-id UPDATE for a
//! batch).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use ambra_core::{
    OrderId, OrderItemId, OrderStatus, OrderTimeline, PaymentId, PaymentMethod, PaymentStatus,
    ProductId, ShippingType, SizeId, UserId,
};

use super::RepositoryError;
use crate::models::order::{
    CustomerDetails, Order, OrderDetail, OrderItemView, OrderSnapshot, PaymentView, ProductRef,
};
use crate::models::product::ProductImage;

/// A fully assembled order ready for insertion.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub tracking_id: String,
    pub customer: CustomerDetails,
    pub shipping_type: ShippingType,
    pub est_delivery_date: DateTime<Utc>,
    pub events: OrderTimeline,
    pub user_id: Option<UserId>,
}

/// A line-item snapshot: size value and unit price copied at purchase time.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub size: i32,
    pub price: Decimal,
    pub quantity: i32,
}

/// A line item as the status engine needs it to re-derive stock deltas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSnapshot {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub size: i32,
    pub quantity: i32,
}

/// A size row matched back from a line item's (product, size value) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct RestockCandidate {
    pub id: SizeId,
    pub product_id: ProductId,
    pub value: i32,
}

/// Insert the order row.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the tracking id collides with an
/// existing order, `RepositoryError::Database` for other failures.
pub async fn insert_order(
    conn: &mut PgConnection,
    order: &NewOrder,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO orders (id, tracking_id, customer_name, email, phone_number,
                            state, city, address, shipping_type, est_delivery_date,
                            events, user_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ",
    )
    .bind(order.id.as_uuid())
    .bind(&order.tracking_id)
    .bind(&order.customer.customer_name)
    .bind(order.customer.email.as_ref().map(|e| e.as_str().to_owned()))
    .bind(&order.customer.phone_number)
    .bind(&order.customer.state)
    .bind(&order.customer.city)
    .bind(&order.customer.address)
    .bind(order.shipping_type)
    .bind(order.est_delivery_date)
    .bind(Json(&order.events))
    .bind(order.user_id.map(|id| id.as_uuid()))
    .execute(conn)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict("tracking id already in use".to_owned());
        }
        RepositoryError::Database(e)
    })?;

    Ok(())
}

/// Whether a tracking id is already taken.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn tracking_id_exists(
    conn: &mut PgConnection,
    tracking_id: &str,
) -> Result<bool, RepositoryError> {
    let row: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM orders WHERE tracking_id = $1)")
            .bind(tracking_id)
            .fetch_one(conn)
            .await?;

    Ok(row.0)
}

/// Insert all line items for an order in one statement.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_order_items(
    conn: &mut PgConnection,
    order_id: OrderId,
    items: &[NewOrderItem],
) -> Result<(), RepositoryError> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO order_items (id, order_id, product_id, size, price, quantity) ",
    );

    builder.push_values(items, |mut row, item| {
        row.push_bind(OrderItemId::generate().as_uuid())
            .push_bind(order_id.as_uuid())
            .push_bind(item.product_id.as_uuid())
            .push_bind(item.size)
            .push_bind(item.price)
            .push_bind(item.quantity);
    });

    builder.build().execute(conn).await?;
    Ok(())
}

/// Insert the payment record for a freshly placed order.
///
/// Status starts `unpaid` (cash on delivery until a gateway exists), taxes
/// are zero and the discount NULL; amounts are captured here and never
/// recomputed later.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_payment(
    conn: &mut PgConnection,
    order_id: OrderId,
    method: PaymentMethod,
    subtotal: Decimal,
    shipping_fee: Decimal,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO payments (id, order_id, method, subtotal, shipping_fee, taxes)
        VALUES ($1, $2, $3, $4, $5, 0)
        ",
    )
    .bind(PaymentId::generate().as_uuid())
    .bind(order_id.as_uuid())
    .bind(method)
    .bind(subtotal)
    .bind(shipping_fee)
    .execute(conn)
    .await?;

    Ok(())
}

/// Resolve a tracking id to the order it belongs to.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_id_by_tracking(
    pool: &PgPool,
    tracking_id: &str,
) -> Result<Option<OrderId>, RepositoryError> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM orders WHERE tracking_id = $1")
        .bind(tracking_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|(id,)| OrderId::new(id)))
}

#[derive(sqlx::FromRow)]
struct SnapshotRecord {
    id: Uuid,
    status: OrderStatus,
    city: String,
    events: Json<OrderTimeline>,
}

impl From<SnapshotRecord> for OrderSnapshot {
    fn from(record: SnapshotRecord) -> Self {
        Self {
            id: OrderId::new(record.id),
            status: record.status,
            city: record.city,
            events: record.events.0,
        }
    }
}

/// Read the status/timeline snapshots the transition engine works from.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn status_snapshots(
    conn: &mut PgConnection,
    order_ids: &[OrderId],
) -> Result<Vec<OrderSnapshot>, RepositoryError> {
    let ids: Vec<Uuid> = order_ids.iter().map(|id| id.as_uuid()).collect();

    let records = sqlx::query_as::<_, SnapshotRecord>(
        "SELECT id, status, city, events FROM orders WHERE id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(conn)
    .await?;

    Ok(records.into_iter().map(OrderSnapshot::from).collect())
}

/// Read one order's snapshot, optionally scoped to its owning user (a
/// customer may only touch their own orders; guests are unscoped).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn snapshot_scoped(
    pool: &PgPool,
    order_id: OrderId,
    scope: Option<UserId>,
) -> Result<Option<OrderSnapshot>, RepositoryError> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT id, status, city, events FROM orders WHERE id = ",
    );
    builder.push_bind(order_id.as_uuid());
    if let Some(user_id) = scope {
        builder.push(" AND user_id = ");
        builder.push_bind(user_id.as_uuid());
    }

    let record = builder
        .build_query_as::<SnapshotRecord>()
        .fetch_optional(pool)
        .await?;

    Ok(record.map(OrderSnapshot::from))
}

/// Write one order's new status and merged timeline.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn apply_status_single(
    conn: &mut PgConnection,
    order_id: OrderId,
    status: OrderStatus,
    events: &OrderTimeline,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        "UPDATE orders SET status = $1, events = $2, updated_at = now() WHERE id = $3",
    )
    .bind(status)
    .bind(Json(events))
    .bind(order_id.as_uuid())
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Write the new status plus each order's merged timeline as one
/// CASE-per-id statement.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn apply_status_batch(
    conn: &mut PgConnection,
    updates: &[(OrderId, OrderTimeline)],
    status: OrderStatus,
) -> Result<u64, RepositoryError> {
    if updates.is_empty() {
        return Ok(0);
    }

    let mut builder = QueryBuilder::<Postgres>::new("UPDATE orders SET status = ");
    builder.push_bind(status);
    builder.push(", events = (CASE");
    for (order_id, events) in updates {
        builder.push(" WHEN id = ");
        builder.push_bind(order_id.as_uuid());
        builder.push(" THEN ");
        builder.push_bind(Json(events));
    }
    builder.push(" END), updated_at = now() WHERE id IN (");
    let mut ids = builder.separated(", ");
    for (order_id, _) in updates {
        ids.push_bind(order_id.as_uuid());
    }
    builder.push(")");

    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}

/// Line items of the given orders, for stock re-derivation.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn items_for_orders(
    conn: &mut PgConnection,
    order_ids: &[OrderId],
) -> Result<Vec<LineSnapshot>, RepositoryError> {
    #[derive(sqlx::FromRow)]
    struct Record {
        order_id: Uuid,
        product_id: Uuid,
        size: i32,
        quantity: i32,
    }

    let ids: Vec<Uuid> = order_ids.iter().map(|id| id.as_uuid()).collect();

    let records = sqlx::query_as::<_, Record>(
        "SELECT order_id, product_id, size, quantity FROM order_items WHERE order_id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(conn)
    .await?;

    Ok(records
        .into_iter()
        .map(|r| LineSnapshot {
            order_id: OrderId::new(r.order_id),
            product_id: ProductId::new(r.product_id),
            size: r.size,
            quantity: r.quantity,
        })
        .collect())
}

/// Candidate size rows for restock/re-reserve matching.
///
/// Matched in memory by exact (product, size value) pair afterwards: the
/// ANY-filters here may cross-match pairs from different line items, and a
/// line whose size row was deleted simply finds no candidate.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn restock_candidates(
    conn: &mut PgConnection,
    product_ids: &[ProductId],
    values: &[i32],
) -> Result<Vec<RestockCandidate>, RepositoryError> {
    let products: Vec<Uuid> = product_ids.iter().map(|id| id.as_uuid()).collect();

    let candidates = sqlx::query_as::<_, RestockCandidate>(
        r"
        SELECT id, product_id, value
        FROM product_sizes
        WHERE product_id = ANY($1) AND value = ANY($2)
        ",
    )
    .bind(&products)
    .bind(values)
    .fetch_all(conn)
    .await?;

    Ok(candidates)
}

#[derive(sqlx::FromRow)]
struct OrderDetailRecord {
    id: Uuid,
    tracking_id: String,
    customer_name: String,
    email: Option<String>,
    phone_number: String,
    state: String,
    city: String,
    address: String,
    shipping_type: ShippingType,
    status: OrderStatus,
    est_delivery_date: Option<DateTime<Utc>>,
    events: Json<OrderTimeline>,
    user_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    payment_id: Uuid,
    payment_status: PaymentStatus,
    method: PaymentMethod,
    subtotal: Decimal,
    shipping_fee: Decimal,
    taxes: Decimal,
    discount: Option<Decimal>,
}

/// Fetch an order with its payment and line items, optionally scoped to an
/// owning user.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
#[instrument(skip(pool))]
pub async fn order_detail(
    pool: &PgPool,
    order_id: OrderId,
    scope: Option<UserId>,
) -> Result<Option<OrderDetail>, RepositoryError> {
    let mut builder = QueryBuilder::<Postgres>::new(
        r"
        SELECT o.id, o.tracking_id, o.customer_name, o.email, o.phone_number,
               o.state, o.city, o.address, o.shipping_type, o.status,
               o.est_delivery_date, o.events, o.user_id, o.created_at,
               p.id AS payment_id, p.status AS payment_status, p.method,
               p.subtotal, p.shipping_fee, p.taxes, p.discount
        FROM orders o
        INNER JOIN payments p ON p.order_id = o.id
        WHERE o.id = ",
    );
    builder.push_bind(order_id.as_uuid());
    if let Some(user_id) = scope {
        builder.push(" AND o.user_id = ");
        builder.push_bind(user_id.as_uuid());
    }

    let Some(record) = builder
        .build_query_as::<OrderDetailRecord>()
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    let items = order_items_with_product(pool, order_id).await?;

    Ok(Some(OrderDetail {
        order: Order {
            id: OrderId::new(record.id),
            tracking_id: record.tracking_id,
            customer_name: record.customer_name,
            email: record.email,
            phone_number: record.phone_number,
            state: record.state,
            city: record.city,
            address: record.address,
            shipping_type: record.shipping_type,
            status: record.status,
            est_delivery_date: record.est_delivery_date,
            events: record.events.0,
            user_id: record.user_id.map(UserId::new),
            created_at: record.created_at,
        },
        payment: PaymentView {
            id: PaymentId::new(record.payment_id),
            status: record.payment_status,
            method: record.method,
            subtotal: record.subtotal,
            shipping_fee: record.shipping_fee,
            taxes: record.taxes,
            discount: record.discount,
        },
        items,
    }))
}

/// Line items of one order joined with their product's title and images.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn order_items_with_product(
    pool: &PgPool,
    order_id: OrderId,
) -> Result<Vec<OrderItemView>, RepositoryError> {
    #[derive(sqlx::FromRow)]
    struct Record {
        id: Uuid,
        product_id: Uuid,
        size: i32,
        price: Decimal,
        quantity: i32,
        title: String,
        images: Json<Vec<ProductImage>>,
    }

    let records = sqlx::query_as::<_, Record>(
        r"
        SELECT i.id, i.product_id, i.size, i.price, i.quantity, p.title, p.images
        FROM order_items i
        INNER JOIN products p ON p.id = i.product_id
        WHERE i.order_id = $1
        ",
    )
    .bind(order_id.as_uuid())
    .fetch_all(pool)
    .await?;

    Ok(records
        .into_iter()
        .map(|r| OrderItemView {
            id: OrderItemId::new(r.id),
            product_id: ProductId::new(r.product_id),
            size: r.size,
            price: r.price,
            quantity: r.quantity,
            product: ProductRef {
                title: r.title,
                images: r.images.0,
            },
        })
        .collect())
}

/// Hard-delete orders (dashboard bulk action, distinct from cancellation:
/// no stock restoration happens here).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn delete_orders(pool: &PgPool, order_ids: &[OrderId]) -> Result<u64, RepositoryError> {
    let ids: Vec<Uuid> = order_ids.iter().map(|id| id.as_uuid()).collect();

    let result = sqlx::query("DELETE FROM orders WHERE id = ANY($1)")
        .bind(&ids)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Set the payment status for one or many orders. Independent of the
/// fulfillment status: touches neither the order row, the timeline, nor
/// stock.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn set_payment_status(
    pool: &PgPool,
    order_ids: &[OrderId],
    status: PaymentStatus,
) -> Result<u64, RepositoryError> {
    let ids: Vec<Uuid> = order_ids.iter().map(|id| id.as_uuid()).collect();

    let result = sqlx::query(
        "UPDATE payments SET status = $1, updated_at = now() WHERE order_id = ANY($2)",
    )
    .bind(status)
    .bind(&ids)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
