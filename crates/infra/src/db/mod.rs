//! Database adapters: the in-stock product query.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use stocksync_inventory::Product;

pub use in_memory::InMemoryProductRepository;
pub use postgres::PostgresProductRepository;

/// Query or row decoding failure.
#[derive(Debug, Error)]
pub enum DataAccessError {
    #[error("can't collect products: {0}")]
    Query(String),

    #[error("can't decode product row: {0}")]
    Decode(String),
}

/// Source of in-stock products.
///
/// Implementations must return pages in a stable order so that offset paging
/// within one pass neither repeats nor skips rows of an unchanged table.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Products with strictly positive stock, `page_size` rows from `offset`.
    async fn collect_products(
        &self,
        page_size: u32,
        offset: u64,
    ) -> Result<Vec<Product>, DataAccessError>;
}

#[async_trait]
impl<R> ProductRepository for Arc<R>
where
    R: ProductRepository + ?Sized,
{
    async fn collect_products(
        &self,
        page_size: u32,
        offset: u64,
    ) -> Result<Vec<Product>, DataAccessError> {
        (**self).collect_products(page_size, offset).await
    }
}
