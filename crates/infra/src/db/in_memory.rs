use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use stocksync_inventory::Product;

use super::{DataAccessError, ProductRepository};

/// In-memory product repository.
///
/// Intended for tests/dev. Rows are ordered by external id, the same stable
/// order the Postgres query uses.
#[derive(Debug, Default)]
pub struct InMemoryProductRepository {
    products: RwLock<Vec<Product>>,
    fetches: AtomicUsize,
    fail_on_fetch: RwLock<Option<usize>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: Vec<Product>) -> Self {
        let repo = Self::new();
        repo.replace(products);
        repo
    }

    /// Replace the table content.
    pub fn replace(&self, mut products: Vec<Product>) {
        products.sort_by_key(|p| p.external_id);
        if let Ok(mut guard) = self.products.write() {
            *guard = products;
        }
    }

    /// Number of page fetches served so far.
    pub fn page_fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Make the `n`-th fetch (1-based, counted from now on) fail.
    pub fn fail_on_fetch(&self, n: usize) {
        if let Ok(mut guard) = self.fail_on_fetch.write() {
            *guard = Some(self.page_fetches() + n);
        }
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn collect_products(
        &self,
        page_size: u32,
        offset: u64,
    ) -> Result<Vec<Product>, DataAccessError> {
        let call = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;

        let failing = self
            .fail_on_fetch
            .read()
            .map_err(|_| DataAccessError::Query("lock poisoned".to_string()))?
            .is_some_and(|n| n == call);
        if failing {
            return Err(DataAccessError::Query("injected failure".to_string()));
        }

        let products = self
            .products
            .read()
            .map_err(|_| DataAccessError::Query("lock poisoned".to_string()))?;

        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(products
            .iter()
            .filter(|p| p.stock_quantity > 0.0)
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect())
    }
}
