//! Domain types for the storefront.
//!
//! These are validated domain objects, separate from database row types.

pub mod order;
pub mod product;
pub mod shipping;
pub mod user;

pub use order::{
    CustomerDetails, Order, OrderDetail, OrderItemView, OrderSnapshot, PaymentView, ProductRef,
};
pub use product::{
    FeaturedProduct, NewProduct, Product, ProductImage, ProductPatch, ProductSize, SizeInput,
};
pub use shipping::ShippingRate;
pub use user::CurrentUser;
