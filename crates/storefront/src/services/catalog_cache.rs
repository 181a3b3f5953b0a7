//! Cached featured-products view.
//!
//! The featured shelf is read on every storefront visit but only changes
//! when an admin edits the catalog or a stock-affecting commit lands, so it
//! is cached with a long TTL and invalidated explicitly by those paths.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use crate::db::{self, RepositoryError};
use crate::models::product::FeaturedProduct;

const FEATURED_KEY: &str = "featured-products";

/// One week; matches how rarely the shelf changes without an explicit
/// invalidation.
const FEATURED_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// In-memory cache for the featured-products shelf.
#[derive(Clone)]
pub struct FeaturedCache {
    cache: Cache<&'static str, Arc<Vec<FeaturedProduct>>>,
}

impl Default for FeaturedCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FeaturedCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(FEATURED_TTL)
            .build();

        Self { cache }
    }

    /// Get the featured products, loading from the database on a miss.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the underlying query fails.
    pub async fn get(&self, pool: &PgPool) -> Result<Arc<Vec<FeaturedProduct>>, RepositoryError> {
        if let Some(hit) = self.cache.get(FEATURED_KEY).await {
            return Ok(hit);
        }

        let fresh = Arc::new(db::catalog::featured_products(pool).await?);
        self.cache.insert(FEATURED_KEY, Arc::clone(&fresh)).await;
        debug!(count = fresh.len(), "featured products cache refreshed");

        Ok(fresh)
    }

    /// Drop the cached view. Called after any commit that may change
    /// displayed availability (checkout, cancellation, catalog edits).
    pub async fn invalidate(&self) {
        self.cache.invalidate(FEATURED_KEY).await;
        debug!("featured products cache invalidated");
    }
}
