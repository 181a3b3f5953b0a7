//! Business services for the storefront.
//!
//! Service modules own the transactional workflows; the `db` modules stay
//! single-statement repositories.
//!
//! - [`checkout`] - Order placement (cart → durable order aggregate)
//! - [`orders`] - Status transition engine with stock reconciliation
//! - [`cart`] - Read-only cart resolution (drop/clamp reconciliation)
//! - [`catalog_cache`] - Cached featured-products view
//! - [`email`] - Transactional mail via SMTP

pub mod cart;
pub mod catalog_cache;
pub mod checkout;
pub mod email;
pub mod orders;

pub use catalog_cache::FeaturedCache;
pub use email::EmailService;
