//! Customer-facing order handlers: placement, tracking, detail, cancel.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use ambra_core::{Email, OrderId, OrderStatus, PaymentMethod, ProductId, ShippingType, SizeId, UserRole};

use crate::db::orders as orders_repo;
use crate::error::{AppError, Result};
use crate::middleware::auth::OptionalAuth;
use crate::models::order::{CustomerDetails, OrderDetail, OrderItemView};
use crate::services::checkout::{self, CheckoutItem, PlaceOrder};
use crate::services::orders as status_engine;
use crate::state::AppState;

/// One cart line in the checkout payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItemRequest {
    pub product_id: ProductId,
    pub size_id: SizeId,
    pub qty: i32,
}

/// POST /api/orders body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub customer_name: String,
    pub email: Option<String>,
    pub phone_number: String,
    pub state: String,
    pub city: String,
    pub address: String,
    #[serde(default)]
    pub shipping_type: ShippingType,
    pub payment_method: PaymentMethod,
    pub items: Vec<CheckoutItemRequest>,
}

/// POST /api/orders response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub order_id: OrderId,
}

/// POST /api/orders
pub async fn place(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<Json<PlaceOrderResponse>> {
    let email = request
        .email
        .filter(|value| !value.trim().is_empty())
        .map(|value| {
            Email::parse(&value)
                .map_err(|_| AppError::Validation("Please enter a valid email".to_owned()))
        })
        .transpose()?;

    let input = PlaceOrder {
        customer: CustomerDetails {
            customer_name: request.customer_name,
            email,
            phone_number: request.phone_number,
            state: request.state,
            city: request.city,
            address: request.address,
        },
        shipping_type: request.shipping_type,
        payment_method: request.payment_method,
        items: request
            .items
            .iter()
            .map(|item| CheckoutItem {
                product_id: item.product_id,
                size_id: item.size_id,
                qty: item.qty,
            })
            .collect(),
    };

    let order_id = checkout::place_order(
        state.pool(),
        state.featured(),
        state.email(),
        user.map(|u| u.id),
        input,
    )
    .await?;

    Ok(Json(PlaceOrderResponse { order_id }))
}

/// POST /api/orders/track body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackOrderRequest {
    pub tracking_id: String,
}

/// POST /api/orders/track response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackOrderResponse {
    pub order_id: OrderId,
}

/// POST /api/orders/track
pub async fn track(
    State(state): State<AppState>,
    Json(request): Json<TrackOrderRequest>,
) -> Result<Json<TrackOrderResponse>> {
    let tracking_id = request.tracking_id.trim();
    if tracking_id.is_empty() || !tracking_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation("Invalid tracking id".to_owned()));
    }

    let order_id = orders_repo::find_id_by_tracking(state.pool(), tracking_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("No order found with this tracking id".to_owned())
        })?;

    Ok(Json(TrackOrderResponse { order_id }))
}

/// GET /api/orders/{id}
///
/// Customers only see their own orders; staff and guests (who know the
/// opaque order id) are unscoped.
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let scope = user
        .filter(|u| u.role == UserRole::Customer)
        .map(|u| u.id);

    let detail = orders_repo::order_detail(state.pool(), order_id, scope)
        .await?
        .ok_or_else(|| AppError::NotFound("No order found".to_owned()))?;

    Ok(Json(detail))
}

/// GET /api/orders/{id}/items response.
#[derive(Debug, Serialize)]
pub struct OrderItemsResponse {
    pub data: Vec<OrderItemView>,
}

/// GET /api/orders/{id}/items
pub async fn items(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderItemsResponse>> {
    let data = orders_repo::order_items_with_product(state.pool(), order_id).await?;
    Ok(Json(OrderItemsResponse { data }))
}

/// POST /api/orders/{id}/cancel body.
#[derive(Debug, Deserialize)]
pub struct CancelOrderRequest {
    pub reason: String,
}

/// POST /api/orders/{id}/cancel
///
/// Customer-initiated cancellation, only while the order is still
/// processing. The reason becomes the cancelled-event description; stock
/// returns via the status engine's decision table.
pub async fn cancel(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(order_id): Path<OrderId>,
    Json(request): Json<CancelOrderRequest>,
) -> Result<StatusCode> {
    let reason = request.reason.trim();
    if reason.is_empty() {
        return Err(AppError::Validation("Please provide a reason".to_owned()));
    }

    let scope = user.map(|u| u.id);
    let snapshot = orders_repo::snapshot_scoped(state.pool(), order_id, scope)
        .await?
        .ok_or_else(|| AppError::NotFound("No order found".to_owned()))?;

    if snapshot.status != OrderStatus::Processing {
        return Err(AppError::Forbidden(
            "Order can't be canceled once processed. Please contact support.".to_owned(),
        ));
    }

    let outcome = status_engine::update_status(
        state.pool(),
        std::slice::from_ref(&snapshot),
        OrderStatus::Cancelled,
        Some(reason),
    )
    .await?;

    if outcome.stock_touched {
        state.featured().invalidate().await;
    }

    Ok(StatusCode::NO_CONTENT)
}
