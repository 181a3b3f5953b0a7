//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use ambra_core::{
    Email, OrderId, OrderItemId, OrderStatus, OrderTimeline, PaymentId, PaymentMethod,
    PaymentStatus, ProductId, ShippingType, UserId,
};

use super::product::ProductImage;

/// Contact and shipping details captured at checkout.
#[derive(Debug, Clone)]
pub struct CustomerDetails {
    pub customer_name: String,
    pub email: Option<Email>,
    pub phone_number: String,
    pub state: String,
    pub city: String,
    pub address: String,
}

/// A placed order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    /// Customer-facing tracking identifier, distinct from `id`.
    pub tracking_id: String,
    pub customer_name: String,
    pub email: Option<String>,
    pub phone_number: String,
    pub state: String,
    pub city: String,
    pub address: String,
    pub shipping_type: ShippingType,
    pub status: OrderStatus,
    pub est_delivery_date: Option<DateTime<Utc>>,
    pub events: OrderTimeline,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Payment details shown alongside an order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub id: PaymentId,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub taxes: Decimal,
    pub discount: Option<Decimal>,
}

/// Product info attached to a line item for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    pub title: String,
    pub images: Vec<ProductImage>,
}

/// A line item joined with its (possibly since-edited) product.
///
/// `size` and `price` are the values copied at purchase time, not live
/// catalog data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub size: i32,
    pub price: Decimal,
    pub quantity: i32,
    pub product: ProductRef,
}

/// Full order view: order + payment + items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub payment: PaymentView,
    pub items: Vec<OrderItemView>,
}

/// The slice of an order the status engine needs: its identity, the status
/// it held *before* this transition, and its current timeline.
#[derive(Debug, Clone)]
pub struct OrderSnapshot {
    pub id: OrderId,
    pub status: OrderStatus,
    pub city: String,
    pub events: OrderTimeline,
}
