//! Deployment constants of the synchronisation.

use stocksync_core::{OrganizationId, StoreId};
use uuid::Uuid;

use crate::product::MarketplaceId;

/// Maximum number of positions the remote service accepts in one stock entry.
pub const DOCUMENT_CAPACITY: usize = 999;

/// Organization every created stock entry belongs to.
pub const ORGANIZATION_ID: OrganizationId =
    OrganizationId::from_uuid(Uuid::from_u128(0xbe54bdc2_1448_11ef_0a80_16c50012f572));

/// Store receiving stock for every marketplace without a dedicated store (Trendyol).
pub const TRENDYOL_STORE_ID: StoreId =
    StoreId::from_uuid(Uuid::from_u128(0x640078d9_1eff_11ef_0a80_0c94001ca0fc));

/// Store dedicated to the Toyzz Shop marketplace.
pub const TOYZZSHOP_STORE_ID: StoreId =
    StoreId::from_uuid(Uuid::from_u128(0x6f237006_1eff_11ef_0a80_0665001bf5c6));

pub const TOYZZSHOP_MARKETPLACE_ID: MarketplaceId = MarketplaceId(3);

/// Organization, stores and capacity used by the reconciliation.
///
/// `default_store` is listed first in `stores()`, which is also the order in
/// which bootstrap documents are created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub organization: OrganizationId,
    pub default_store: StoreId,
    /// Marketplaces with a dedicated store; anything else goes to `default_store`.
    pub marketplace_stores: Vec<(MarketplaceId, StoreId)>,
    pub document_capacity: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            organization: ORGANIZATION_ID,
            default_store: TRENDYOL_STORE_ID,
            marketplace_stores: vec![(TOYZZSHOP_MARKETPLACE_ID, TOYZZSHOP_STORE_ID)],
            document_capacity: DOCUMENT_CAPACITY,
        }
    }
}

impl SyncSettings {
    pub fn with_document_capacity(mut self, capacity: usize) -> Self {
        self.document_capacity = capacity;
        self
    }

    /// Store a product of `marketplace` is received into.
    pub fn store_for(&self, marketplace: MarketplaceId) -> StoreId {
        self.marketplace_stores
            .iter()
            .find(|(m, _)| *m == marketplace)
            .map(|(_, store)| *store)
            .unwrap_or(self.default_store)
    }

    /// Every known store, default first, without duplicates.
    pub fn stores(&self) -> Vec<StoreId> {
        let mut stores = vec![self.default_store];
        for (_, store) in &self.marketplace_stores {
            if !stores.contains(store) {
                stores.push(*store);
            }
        }
        stores
    }
}
