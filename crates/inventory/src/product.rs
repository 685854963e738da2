//! In-stock products read from the inventory table.

use serde::{Deserialize, Serialize};

use stocksync_core::{AssortmentId, DomainError, DomainResult};

/// Marketplace a product is sold on (selects the receiving store).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketplaceId(pub i64);

impl core::fmt::Display for MarketplaceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// In-stock product snapshot collected from the database.
///
/// Taken once per page and never mutated by the reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Remote assortment id (the mapping row id).
    pub external_id: AssortmentId,
    /// Local provider product id.
    pub product_id: i64,
    pub marketplace_id: MarketplaceId,
    pub stock_quantity: f64,
}

impl Product {
    /// Build a snapshot, rejecting quantities that cannot be sent as stock.
    pub fn new(
        external_id: AssortmentId,
        product_id: i64,
        marketplace_id: MarketplaceId,
        stock_quantity: f64,
    ) -> DomainResult<Self> {
        if !stock_quantity.is_finite() {
            return Err(DomainError::validation(format!(
                "stock quantity of product {product_id} is not finite"
            )));
        }
        if stock_quantity < 0.0 {
            return Err(DomainError::validation(format!(
                "stock quantity of product {product_id} is negative ({stock_quantity})"
            )));
        }

        Ok(Self {
            external_id,
            product_id,
            marketplace_id,
            stock_quantity,
        })
    }
}
