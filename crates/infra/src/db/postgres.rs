//! Postgres-backed product repository.
//!
//! Reads the inventory mapping table (`moysklad.products`) joined to the
//! provider catalogue (`public.provider_product`).
//!
//! ## Error Mapping
//!
//! | SQLx Error | DataAccessError | Scenario |
//! |------------|-----------------|----------|
//! | Database | `Query` | SQL error reported by the server |
//! | PoolClosed / PoolTimedOut / Io / Tls | `Query` | Connection could not be used |
//! | ColumnDecode / ColumnNotFound | `Decode` | Row does not have the product shape |
//! | Other | `Query` | Anything else |

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Row};
use tracing::{Span, instrument};

use stocksync_core::AssortmentId;
use stocksync_inventory::{MarketplaceId, Product};

use super::{DataAccessError, ProductRepository};
use crate::config::{StartupError, SyncConfig};

const COLLECT_PRODUCTS: &str = r#"
    SELECT
        mp.id::text AS id,
        mp.product_id::int8 AS product_id,
        pp.marketplace_id::int8 AS marketplace_id,
        pp.stock_quantity::float8 AS stock_quantity
    FROM
        moysklad.products AS mp
    JOIN
        public.provider_product AS pp ON mp.product_id = pp.id
    WHERE
        pp.stock_quantity > 0
    ORDER BY
        mp.id ASC
    LIMIT $1
    OFFSET $2
"#;

/// Open the connection pool and prove the database is reachable.
pub async fn connect(config: &SyncConfig) -> Result<PgPool, StartupError> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| StartupError::Database(e.to_string()))
}

/// Product repository over a shared SQLx pool.
///
/// `PgPool` is internally reference-counted, so clones share connections.
#[derive(Debug, Clone)]
pub struct PostgresProductRepository {
    pool: PgPool,
}

impl PostgresProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ProductRepository for PostgresProductRepository {
    #[instrument(skip(self), fields(row_count))]
    async fn collect_products(
        &self,
        page_size: u32,
        offset: u64,
    ) -> Result<Vec<Product>, DataAccessError> {
        let offset = i64::try_from(offset)
            .map_err(|e| DataAccessError::Query(format!("offset {offset} out of range: {e}")))?;

        let rows = sqlx::query(COLLECT_PRODUCTS)
            .bind(i64::from(page_size))
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("collect_products", e))?;

        let mut products = Vec::with_capacity(rows.len());
        for row in &rows {
            let product_row = ProductRow::from_row(row)
                .map_err(|e| map_sqlx_error("decode_product_row", e))?;
            products.push(Product::try_from(product_row)?);
        }

        Span::current().record("row_count", products.len());
        Ok(products)
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> DataAccessError {
    match err {
        sqlx::Error::Database(db_err) => DataAccessError::Query(format!(
            "database error in {}: {}",
            operation,
            db_err.message()
        )),
        sqlx::Error::ColumnDecode { index, source } => {
            DataAccessError::Decode(format!("column {index} in {operation}: {source}"))
        }
        sqlx::Error::ColumnNotFound(column) => {
            DataAccessError::Decode(format!("column {column} missing in {operation}"))
        }
        sqlx::Error::PoolClosed => {
            DataAccessError::Query(format!("connection pool closed in {operation}"))
        }
        _ => DataAccessError::Query(format!("sqlx error in {operation}: {err}")),
    }
}

// SQLx row types

#[derive(Debug, Clone, PartialEq)]
struct ProductRow {
    id: String,
    product_id: i64,
    marketplace_id: i64,
    stock_quantity: f64,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            marketplace_id: row.try_get("marketplace_id")?,
            stock_quantity: row.try_get("stock_quantity")?,
        })
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = DataAccessError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let external_id: AssortmentId = row
            .id
            .parse()
            .map_err(|e| DataAccessError::Decode(format!("product {}: {e}", row.product_id)))?;

        Product::new(
            external_id,
            row.product_id,
            MarketplaceId(row.marketplace_id),
            row.stock_quantity,
        )
        .map_err(|e| DataAccessError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, quantity: f64) -> ProductRow {
        ProductRow {
            id: id.to_string(),
            product_id: 42,
            marketplace_id: 3,
            stock_quantity: quantity,
        }
    }

    #[test]
    fn row_converts_into_product() {
        let product =
            Product::try_from(row("6f237006-1eff-11ef-0a80-0665001bf5c6", 12.0)).unwrap();
        assert_eq!(
            product.external_id.to_string(),
            "6f237006-1eff-11ef-0a80-0665001bf5c6"
        );
        assert_eq!(product.product_id, 42);
        assert_eq!(product.marketplace_id, MarketplaceId(3));
        assert_eq!(product.stock_quantity, 12.0);
    }

    #[test]
    fn malformed_mapping_id_is_a_decode_error() {
        let err = Product::try_from(row("sku-42", 1.0)).unwrap_err();
        assert!(matches!(err, DataAccessError::Decode(_)));
    }

    #[test]
    fn negative_quantity_is_a_decode_error() {
        let err = Product::try_from(row("6f237006-1eff-11ef-0a80-0665001bf5c6", -2.0)).unwrap_err();
        assert!(matches!(err, DataAccessError::Decode(_)));
    }

    #[test]
    fn query_filters_stock_and_pages_in_stable_order() {
        assert!(COLLECT_PRODUCTS.contains("pp.stock_quantity > 0"));
        assert!(COLLECT_PRODUCTS.contains("ORDER BY"));
        assert!(COLLECT_PRODUCTS.contains("LIMIT $1"));
        assert!(COLLECT_PRODUCTS.contains("OFFSET $2"));
    }
}
