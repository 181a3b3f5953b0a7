//! Status enums for catalog, order, and payment entities.
//!
//! Every enum here is persisted as a `PostgreSQL` enum type (with the
//! `postgres` feature) and serialized with snake_case names, so the JSON
//! wire form and the database form match.

use serde::{Deserialize, Serialize};

/// Order fulfillment lifecycle status.
///
/// `Processing` is the initial state set at checkout. `Delivered` and
/// `Cancelled` are terminal for stock purposes, but staff may force any
/// transition from the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Processing,
    Dispatched,
    Shipped,
    Delivered,
    OnHold,
    Cancelled,
}

impl OrderStatus {
    /// The snake_case name used in JSON and in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Dispatched => "dispatched",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::OnHold => "on_hold",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status, independent of the fulfillment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
}

/// Payment method selected at checkout.
///
/// Only cash on delivery is live; card payment is accepted at the API
/// boundary as a stub for a future gateway integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    CashOnDelivery,
    CreditCard,
}

/// Shipping service level selected at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shipping_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ShippingType {
    #[default]
    Standard,
    Express,
}

/// Catalog visibility status of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "product_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

/// Merchandising label attached to a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "product_label", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProductLabel {
    #[default]
    None,
    Featured,
    NewArrival,
}

/// Role attached to a user account.
///
/// `Moderator` and `Admin` may call the staff-only order and catalog
/// mutations; `Customer` may not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Customer,
    Moderator,
    Admin,
}

impl UserRole {
    /// Whether this role may use the staff-only entry points.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Moderator | Self::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_json_names() {
        let json = serde_json::to_string(&OrderStatus::OnHold).expect("serialize");
        assert_eq!(json, "\"on_hold\"");

        let parsed: OrderStatus = serde_json::from_str("\"cancelled\"").expect("deserialize");
        assert_eq!(parsed, OrderStatus::Cancelled);
    }

    #[test]
    fn test_order_status_display_matches_json() {
        for status in [
            OrderStatus::Processing,
            OrderStatus::Dispatched,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::OnHold,
            OrderStatus::Cancelled,
        ] {
            let json = serde_json::to_string(&status).expect("serialize");
            assert_eq!(json, format!("\"{status}\""));
        }
    }

    #[test]
    fn test_staff_roles() {
        assert!(!UserRole::Customer.is_staff());
        assert!(UserRole::Moderator.is_staff());
        assert!(UserRole::Admin.is_staff());
    }
}
