//! Catalog domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ambra_core::{ProductId, ProductLabel, ProductStatus, SizeId};

/// An image reference stored in the `products.images` JSONB column.
///
/// Upload itself happens through the object-storage collaborator; the
/// catalog only records the resulting URL and storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub url: String,
    pub key: String,
    pub name: String,
    pub order: i32,
}

/// A purchasable size variant of a product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductSize {
    pub id: SizeId,
    pub product_id: ProductId,
    /// Size in millilitres.
    pub value: i32,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub stock: i32,
}

/// A catalog product with its size variants.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub category: String,
    pub images: Vec<ProductImage>,
    pub tags: Vec<String>,
    pub status: ProductStatus,
    pub label: ProductLabel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sizes: Vec<ProductSize>,
}

/// A card on the featured-products shelf.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedProduct {
    pub id: ProductId,
    pub title: String,
    pub images: Vec<ProductImage>,
    pub sizes: Vec<ProductSize>,
}

/// Size variant input for product create/update.
///
/// `id` is `None` for a size that should be created; on update, existing
/// sizes missing from the submitted set are deleted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeInput {
    pub id: Option<SizeId>,
    pub value: i32,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub stock: i32,
}

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub title: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub category: String,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: ProductStatus,
    pub label: ProductLabel,
    pub sizes: Vec<SizeInput>,
}

/// Partial update for a product; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub category: Option<String>,
    pub images: Option<Vec<ProductImage>>,
    pub tags: Option<Vec<String>>,
    pub status: Option<ProductStatus>,
    pub label: Option<ProductLabel>,
    /// Full replacement set for the product's sizes (diffed against the
    /// existing rows); `None` leaves sizes untouched.
    pub sizes: Option<Vec<SizeInput>>,
}

impl ProductPatch {
    /// Whether the patch carries any product-row change.
    #[must_use]
    pub const fn has_field_changes(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.notes.is_some()
            || self.category.is_some()
            || self.images.is_some()
            || self.tags.is_some()
            || self.status.is_some()
            || self.label.is_some()
    }

    /// Whether the patch changes anything at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.has_field_changes() && self.sizes.is_none()
    }
}
