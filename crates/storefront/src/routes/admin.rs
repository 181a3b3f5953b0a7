//! Staff-only handlers: bulk order status changes, deletes, and catalog
//! management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use ambra_core::{OrderId, OrderStatus, PaymentStatus, ProductId, ProductLabel, ProductStatus};

use crate::db::{catalog, orders as orders_repo, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::auth::RequireStaff;
use crate::models::product::{NewProduct, ProductPatch};
use crate::services::orders as status_engine;
use crate::state::AppState;

/// PATCH /api/admin/orders/status body. `status` and `paymentStatus` are
/// independent: either or both may be present.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrdersStatusRequest {
    pub ids: Vec<OrderId>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

/// PATCH /api/admin/orders/status
pub async fn update_orders_status(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Json(request): Json<UpdateOrdersStatusRequest>,
) -> Result<StatusCode> {
    if request.ids.is_empty() {
        return Err(AppError::Validation(
            "Select at least one order".to_owned(),
        ));
    }
    if request.status.is_none() && request.payment_status.is_none() {
        return Err(AppError::Validation("Nothing to update".to_owned()));
    }

    if let Some(status) = request.status {
        let mut conn = state.pool().acquire().await.map_err(RepositoryError::from)?;
        let snapshots = orders_repo::status_snapshots(&mut conn, &request.ids).await?;
        drop(conn);

        let outcome =
            status_engine::update_status(state.pool(), &snapshots, status, None).await?;
        if outcome.stock_touched {
            state.featured().invalidate().await;
        }
    }

    if let Some(payment_status) = request.payment_status {
        orders_repo::set_payment_status(state.pool(), &request.ids, payment_status).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/admin/orders body.
#[derive(Debug, Deserialize)]
pub struct DeleteOrdersRequest {
    pub ids: Vec<OrderId>,
}

/// DELETE /api/admin/orders
///
/// Hard delete, distinct from cancellation: no stock is restored.
pub async fn delete_orders(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Json(request): Json<DeleteOrdersRequest>,
) -> Result<StatusCode> {
    if request.ids.is_empty() {
        return Err(AppError::Validation(
            "Select at least one order".to_owned(),
        ));
    }

    orders_repo::delete_orders(state.pool(), &request.ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/products response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductResponse {
    pub id: ProductId,
}

/// POST /api/admin/products
pub async fn create_product(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Json(request): Json<NewProduct>,
) -> Result<(StatusCode, Json<CreateProductResponse>)> {
    validate_new_product(&request)?;

    let id = catalog::create_product(state.pool(), Some(staff.id), &request).await?;

    if request.label == ProductLabel::Featured && request.status == ProductStatus::Active {
        state.featured().invalidate().await;
    }

    Ok((StatusCode::CREATED, Json(CreateProductResponse { id })))
}

/// PATCH /api/admin/products/{id}
pub async fn update_product(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(product_id): Path<ProductId>,
    Json(patch): Json<ProductPatch>,
) -> Result<StatusCode> {
    if patch.is_empty() {
        return Err(AppError::Validation("Nothing to update".to_owned()));
    }
    if let Some(sizes) = &patch.sizes {
        validate_sizes(sizes)?;
    }

    catalog::update_product(state.pool(), product_id, &patch).await?;
    state.featured().invalidate().await;

    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/admin/products body (bulk status/label).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductsRequest {
    pub ids: Vec<ProductId>,
    pub status: Option<ProductStatus>,
    pub label: Option<ProductLabel>,
}

/// PATCH /api/admin/products
pub async fn update_products(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Json(request): Json<UpdateProductsRequest>,
) -> Result<StatusCode> {
    if request.ids.is_empty() {
        return Err(AppError::Validation(
            "Select at least one product".to_owned(),
        ));
    }
    if request.status.is_none() && request.label.is_none() {
        return Err(AppError::Validation("Nothing to update".to_owned()));
    }

    catalog::set_products_status_label(
        state.pool(),
        &request.ids,
        request.status,
        request.label,
    )
    .await?;
    state.featured().invalidate().await;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/admin/products body.
#[derive(Debug, Deserialize)]
pub struct DeleteProductsRequest {
    pub ids: Vec<ProductId>,
}

/// DELETE /api/admin/products
///
/// Soft delete: historical orders keep their product references.
pub async fn delete_products(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Json(request): Json<DeleteProductsRequest>,
) -> Result<StatusCode> {
    if request.ids.is_empty() {
        return Err(AppError::Validation(
            "Select at least one product".to_owned(),
        ));
    }

    catalog::soft_delete_products(state.pool(), &request.ids).await?;
    state.featured().invalidate().await;

    Ok(StatusCode::NO_CONTENT)
}

fn validate_new_product(product: &NewProduct) -> Result<()> {
    if product.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_owned()));
    }
    if product.category.trim().is_empty() {
        return Err(AppError::Validation(
            "Please select a category".to_owned(),
        ));
    }
    if product.sizes.is_empty() {
        return Err(AppError::Validation(
            "Please add at least one size".to_owned(),
        ));
    }
    validate_sizes(&product.sizes)
}

fn validate_sizes(sizes: &[crate::models::product::SizeInput]) -> Result<()> {
    for size in sizes {
        if size.value < 1 {
            return Err(AppError::Validation(
                "Size must be greater than 1 ml".to_owned(),
            ));
        }
        if size.price.is_sign_negative() {
            return Err(AppError::Validation(
                "Price must be greater than 0".to_owned(),
            ));
        }
        if size.stock < 0 {
            return Err(AppError::Validation(
                "Stock must be greater than 0".to_owned(),
            ));
        }
        if let Some(compare_at) = size.compare_at_price
            && compare_at < size.price
        {
            return Err(AppError::Validation(
                "Compare-at price must be greater than or equal to price".to_owned(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::product::SizeInput;
    use rust_decimal::Decimal;

    fn size(value: i32, price: i64, stock: i32) -> SizeInput {
        SizeInput {
            id: None,
            value,
            price: Decimal::new(price, 2),
            compare_at_price: None,
            stock,
        }
    }

    #[test]
    fn test_valid_sizes_pass() {
        assert!(validate_sizes(&[size(50, 10_00, 5)]).is_ok());
    }

    #[test]
    fn test_zero_ml_size_rejected() {
        assert!(validate_sizes(&[size(0, 10_00, 5)]).is_err());
    }

    #[test]
    fn test_negative_stock_rejected() {
        assert!(validate_sizes(&[size(50, 10_00, -1)]).is_err());
    }

    #[test]
    fn test_compare_at_below_price_rejected() {
        let mut discounted = size(50, 10_00, 5);
        discounted.compare_at_price = Some(Decimal::new(5_00, 2));
        assert!(validate_sizes(&[discounted]).is_err());
    }
}
