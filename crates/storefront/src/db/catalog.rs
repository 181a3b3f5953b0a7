//! Catalog repository: products, size variants, and the checkout resolver.
//!
//! Two resolution modes exist for cart lines:
//!
//! - [`resolve_checkout_sizes`] runs inside the checkout transaction with a
//!   `stock > 0` constraint; a requested size missing from the result set
//!   makes the whole checkout abort with a conflict.
//! - [`cart_rows`] backs the read-only cart display: no stock filter, so
//!   zero-stock rows come back and the reconciliation layer decides what to
//!   drop or clamp.

use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use ambra_core::{ProductId, ProductLabel, ProductStatus, SizeId, UserId};

use super::RepositoryError;
use crate::models::product::{
    FeaturedProduct, NewProduct, Product, ProductImage, ProductPatch, ProductSize, SizeInput,
};

/// A size as the checkout resolver sees it: current price and size value,
/// guaranteed in stock at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ResolvedSize {
    pub id: SizeId,
    pub value: i32,
    pub price: Decimal,
}

/// A cart line joined with its live product and size data.
#[derive(Debug, Clone)]
pub struct CartRow {
    pub product_id: ProductId,
    pub title: String,
    pub images: Vec<ProductImage>,
    pub size_id: SizeId,
    pub value: i32,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub stock: i32,
}

#[derive(sqlx::FromRow)]
struct CartRowRecord {
    product_id: Uuid,
    title: String,
    images: Json<Vec<ProductImage>>,
    size_id: Uuid,
    value: i32,
    price: Decimal,
    compare_at_price: Option<Decimal>,
    stock: i32,
}

impl From<CartRowRecord> for CartRow {
    fn from(record: CartRowRecord) -> Self {
        Self {
            product_id: ProductId::new(record.product_id),
            title: record.title,
            images: record.images.0,
            size_id: SizeId::new(record.size_id),
            value: record.value,
            price: record.price,
            compare_at_price: record.compare_at_price,
            stock: record.stock,
        }
    }
}

/// Resolve the requested sizes for checkout: current price and size value,
/// restricted to rows with positive stock.
///
/// Sizes that are out of stock or deleted are simply absent from the
/// result; the caller decides whether that aborts the checkout.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn resolve_checkout_sizes(
    conn: &mut PgConnection,
    size_ids: &[SizeId],
) -> Result<Vec<ResolvedSize>, RepositoryError> {
    let ids: Vec<Uuid> = size_ids.iter().map(|id| id.as_uuid()).collect();

    let resolved = sqlx::query_as::<_, ResolvedSize>(
        r"
        SELECT id, value, price
        FROM product_sizes
        WHERE id = ANY($1) AND stock > 0
        ",
    )
    .bind(&ids)
    .fetch_all(conn)
    .await?;

    Ok(resolved)
}

/// Fetch live product/size data for the cart display (read-only mode: no
/// stock filter, but hidden and soft-deleted products drop out).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn cart_rows(
    pool: &PgPool,
    product_ids: &[ProductId],
    size_ids: &[SizeId],
) -> Result<Vec<CartRow>, RepositoryError> {
    let products: Vec<Uuid> = product_ids.iter().map(|id| id.as_uuid()).collect();
    let sizes: Vec<Uuid> = size_ids.iter().map(|id| id.as_uuid()).collect();

    let rows = sqlx::query_as::<_, CartRowRecord>(
        r"
        SELECT p.id AS product_id, p.title, p.images,
               s.id AS size_id, s.value, s.price, s.compare_at_price, s.stock
        FROM products p
        INNER JOIN product_sizes s ON s.product_id = p.id AND s.id = ANY($2)
        WHERE p.id = ANY($1) AND p.status = $3 AND p.is_deleted = FALSE
        ",
    )
    .bind(&products)
    .bind(&sizes)
    .bind(ProductStatus::Active)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(CartRow::from).collect())
}

#[derive(sqlx::FromRow)]
struct ProductRecord {
    id: Uuid,
    title: String,
    description: Option<String>,
    notes: Option<String>,
    category: String,
    images: Json<Vec<ProductImage>>,
    tags: Vec<String>,
    status: ProductStatus,
    label: ProductLabel,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

/// The featured-products shelf: active, featured, not deleted, newest
/// first. Backs the cached view; call through `FeaturedCache` outside of
/// admin flows.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
#[instrument(skip(pool))]
pub async fn featured_products(pool: &PgPool) -> Result<Vec<FeaturedProduct>, RepositoryError> {
    #[derive(sqlx::FromRow)]
    struct FeaturedRecord {
        id: Uuid,
        title: String,
        images: Json<Vec<ProductImage>>,
    }

    let records = sqlx::query_as::<_, FeaturedRecord>(
        r"
        SELECT id, title, images
        FROM products
        WHERE label = $1 AND status = $2 AND is_deleted = FALSE
        ORDER BY created_at DESC
        LIMIT 8
        ",
    )
    .bind(ProductLabel::Featured)
    .bind(ProductStatus::Active)
    .fetch_all(pool)
    .await?;

    let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
    let mut sizes = sizes_for_products(pool, &ids).await?;

    Ok(records
        .into_iter()
        .map(|record| {
            let product_id = ProductId::new(record.id);
            FeaturedProduct {
                id: product_id,
                title: record.title,
                images: record.images.0,
                sizes: sizes.remove(&product_id).unwrap_or_default(),
            }
        })
        .collect())
}

/// Fetch a single product with its sizes, restricted to the publicly
/// visible set (active, not deleted).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn get_product(
    pool: &PgPool,
    product_id: ProductId,
) -> Result<Option<Product>, RepositoryError> {
    let record = sqlx::query_as::<_, ProductRecord>(
        r"
        SELECT id, title, description, notes, category, images, tags,
               status, label, created_at, updated_at
        FROM products
        WHERE id = $1 AND status = $2 AND is_deleted = FALSE
        ",
    )
    .bind(product_id.as_uuid())
    .bind(ProductStatus::Active)
    .fetch_optional(pool)
    .await?;

    let Some(record) = record else {
        return Ok(None);
    };

    let mut sizes = sizes_for_products(pool, &[record.id]).await?;
    let id = ProductId::new(record.id);

    Ok(Some(Product {
        id,
        title: record.title,
        description: record.description,
        notes: record.notes,
        category: record.category,
        images: record.images.0,
        tags: record.tags,
        status: record.status,
        label: record.label,
        created_at: record.created_at,
        updated_at: record.updated_at,
        sizes: sizes.remove(&id).unwrap_or_default(),
    }))
}

async fn sizes_for_products(
    pool: &PgPool,
    product_ids: &[Uuid],
) -> Result<std::collections::HashMap<ProductId, Vec<ProductSize>>, RepositoryError> {
    if product_ids.is_empty() {
        return Ok(std::collections::HashMap::new());
    }

    let sizes = sqlx::query_as::<_, ProductSize>(
        r"
        SELECT id, product_id, value, price, compare_at_price, stock
        FROM product_sizes
        WHERE product_id = ANY($1)
        ORDER BY value
        ",
    )
    .bind(product_ids)
    .fetch_all(pool)
    .await?;

    let mut grouped: std::collections::HashMap<ProductId, Vec<ProductSize>> =
        std::collections::HashMap::new();
    for size in sizes {
        grouped.entry(size.product_id).or_default().push(size);
    }

    Ok(grouped)
}

/// Create a product with its initial sizes in one transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if an insert fails.
#[instrument(skip(pool, input), fields(title = %input.title))]
pub async fn create_product(
    pool: &PgPool,
    created_by: Option<UserId>,
    input: &NewProduct,
) -> Result<ProductId, RepositoryError> {
    let product_id = ProductId::generate();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r"
        INSERT INTO products (id, title, description, notes, category, images, tags, status, label, user_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ",
    )
    .bind(product_id.as_uuid())
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.notes)
    .bind(&input.category)
    .bind(Json(&input.images))
    .bind(&input.tags)
    .bind(input.status)
    .bind(input.label)
    .bind(created_by.map(|id| id.as_uuid()))
    .execute(&mut *tx)
    .await?;

    if !input.sizes.is_empty() {
        insert_sizes(&mut tx, product_id, &input.sizes).await?;
    }

    tx.commit().await?;
    Ok(product_id)
}

/// Apply a partial product update, diffing the submitted sizes against the
/// existing rows (create / update / delete-missing) in one transaction.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the product does not exist, or
/// `RepositoryError::Database` if a statement fails.
#[instrument(skip(pool, patch))]
pub async fn update_product(
    pool: &PgPool,
    product_id: ProductId,
    patch: &ProductPatch,
) -> Result<(), RepositoryError> {
    let mut tx = pool.begin().await?;

    if patch.has_field_changes() {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE products SET updated_at = now()");
        push_patch_fields(&mut builder, patch);
        builder.push(" WHERE id = ");
        builder.push_bind(product_id.as_uuid());

        let result = builder.build().execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
    } else {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                .bind(product_id.as_uuid())
                .fetch_one(&mut *tx)
                .await?;
        if !exists.0 {
            return Err(RepositoryError::NotFound);
        }
    }

    if let Some(sizes) = &patch.sizes {
        diff_sizes(&mut tx, product_id, sizes).await?;
    }

    tx.commit().await?;
    Ok(())
}

fn push_patch_fields<'a>(builder: &mut QueryBuilder<'a, Postgres>, patch: &'a ProductPatch) {
    if let Some(title) = &patch.title {
        builder.push(", title = ");
        builder.push_bind(title);
    }
    if let Some(description) = &patch.description {
        builder.push(", description = ");
        builder.push_bind(description);
    }
    if let Some(notes) = &patch.notes {
        builder.push(", notes = ");
        builder.push_bind(notes);
    }
    if let Some(category) = &patch.category {
        builder.push(", category = ");
        builder.push_bind(category);
    }
    if let Some(images) = &patch.images {
        builder.push(", images = ");
        builder.push_bind(Json(images));
    }
    if let Some(tags) = &patch.tags {
        builder.push(", tags = ");
        builder.push_bind(tags);
    }
    if let Some(status) = patch.status {
        builder.push(", status = ");
        builder.push_bind(status);
    }
    if let Some(label) = patch.label {
        builder.push(", label = ");
        builder.push_bind(label);
    }
}

async fn insert_sizes(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    product_id: ProductId,
    sizes: &[SizeInput],
) -> Result<(), RepositoryError> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO product_sizes (id, product_id, value, price, compare_at_price, stock) ",
    );

    builder.push_values(sizes, |mut row, size| {
        let id = size.id.unwrap_or_else(SizeId::generate);
        row.push_bind(id.as_uuid())
            .push_bind(product_id.as_uuid())
            .push_bind(size.value)
            .push_bind(size.price)
            .push_bind(size.compare_at_price)
            .push_bind(size.stock);
    });

    builder.build().execute(&mut **tx).await?;
    Ok(())
}

async fn diff_sizes(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    product_id: ProductId,
    sizes: &[SizeInput],
) -> Result<(), RepositoryError> {
    let existing: Vec<(Uuid,)> =
        sqlx::query_as("SELECT id FROM product_sizes WHERE product_id = $1")
            .bind(product_id.as_uuid())
            .fetch_all(&mut **tx)
            .await?;

    let submitted: std::collections::HashSet<Uuid> = sizes
        .iter()
        .filter_map(|size| size.id.map(|id| id.as_uuid()))
        .collect();

    let to_create: Vec<SizeInput> = sizes.iter().filter(|s| s.id.is_none()).cloned().collect();
    if !to_create.is_empty() {
        insert_sizes(tx, product_id, &to_create).await?;
    }

    for size in sizes.iter().filter(|s| s.id.is_some()) {
        let Some(id) = size.id else { continue };
        sqlx::query(
            r"
            UPDATE product_sizes
            SET value = $1, price = $2, compare_at_price = $3, stock = $4, updated_at = now()
            WHERE id = $5 AND product_id = $6
            ",
        )
        .bind(size.value)
        .bind(size.price)
        .bind(size.compare_at_price)
        .bind(size.stock)
        .bind(id.as_uuid())
        .bind(product_id.as_uuid())
        .execute(&mut **tx)
        .await?;
    }

    let to_delete: Vec<Uuid> = existing
        .iter()
        .map(|(id,)| *id)
        .filter(|id| !submitted.contains(id))
        .collect();
    if !to_delete.is_empty() {
        sqlx::query("DELETE FROM product_sizes WHERE id = ANY($1) AND product_id = $2")
            .bind(&to_delete)
            .bind(product_id.as_uuid())
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

/// Bulk status/label update for the dashboard table.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn set_products_status_label(
    pool: &PgPool,
    product_ids: &[ProductId],
    status: Option<ProductStatus>,
    label: Option<ProductLabel>,
) -> Result<u64, RepositoryError> {
    if status.is_none() && label.is_none() {
        return Ok(0);
    }

    let ids: Vec<Uuid> = product_ids.iter().map(|id| id.as_uuid()).collect();

    let mut builder = QueryBuilder::<Postgres>::new("UPDATE products SET updated_at = now()");
    if let Some(status) = status {
        builder.push(", status = ");
        builder.push_bind(status);
    }
    if let Some(label) = label {
        builder.push(", label = ");
        builder.push_bind(label);
    }
    builder.push(" WHERE id = ANY(");
    builder.push_bind(ids);
    builder.push(")");

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}

/// Soft-delete products: flagged out of every public query but kept on
/// disk so historical order items stay referentially intact.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn soft_delete_products(
    pool: &PgPool,
    product_ids: &[ProductId],
) -> Result<u64, RepositoryError> {
    let ids: Vec<Uuid> = product_ids.iter().map(|id| id.as_uuid()).collect();

    let result = sqlx::query(
        "UPDATE products SET is_deleted = TRUE, updated_at = now() WHERE id = ANY($1)",
    )
    .bind(&ids)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
