//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Health check (in main)
//!
//! # Catalog
//! GET  /api/products/featured       - Cached featured-products shelf
//! GET  /api/products/{id}           - Product detail with sizes
//!
//! # Cart
//! GET  /api/cart/resolve            - Live price/stock for cart lines
//!                                     (items[0]=json&items[1]=json...)
//!
//! # Orders
//! POST /api/orders                  - Place an order (guest or logged in)
//! POST /api/orders/track            - Tracking id -> order id
//! GET  /api/orders/{id}             - Order with payment and items
//! GET  /api/orders/{id}/items       - Line items with product info
//! POST /api/orders/{id}/cancel      - Customer cancel (processing only)
//!
//! # Staff (bearer token, moderator/admin role)
//! PATCH  /api/admin/orders/status   - Bulk status / payment-status update
//! DELETE /api/admin/orders          - Bulk hard delete
//! POST   /api/admin/products        - Create product with sizes
//! PATCH  /api/admin/products        - Bulk status/label update
//! DELETE /api/admin/products        - Bulk soft delete
//! PATCH  /api/admin/products/{id}   - Update product + diff sizes
//! ```

pub mod admin;
pub mod cart;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/featured", get(products::featured))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new().route("/resolve", get(cart::resolve))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::place))
        .route("/track", post(orders::track))
        .route("/{id}", get(orders::show))
        .route("/{id}/items", get(orders::items))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create the staff-only routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/orders/status", patch(admin::update_orders_status))
        .route("/orders", delete(admin::delete_orders))
        .route(
            "/products",
            post(admin::create_product)
                .patch(admin::update_products)
                .delete(admin::delete_products),
        )
        .route("/products/{id}", patch(admin::update_product))
}

/// Create all API routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .nest("/admin", admin_routes())
}
