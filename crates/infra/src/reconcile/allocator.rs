use tracing::{debug, info};

use stocksync_core::{DocumentId, StoreId};
use stocksync_inventory::{DocumentSet, MatchOutcome, PositionMatch, Product, SyncSettings};

use super::ReconcileError;
use crate::external::DocumentClient;

/// Remote writes performed while allocating one page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocationSummary {
    pub positions_updated: usize,
    pub positions_created: usize,
    pub documents_created: usize,
}

/// Applies a classified page to the remote documents.
///
/// Every remote write is mirrored into the page's `DocumentSet`, so a product
/// later in the same page finds a position created for an earlier one and a
/// document filled up by this page is not offered again.
pub struct DocumentAllocator<'a, C: ?Sized> {
    client: &'a C,
    settings: &'a SyncSettings,
}

impl<'a, C> DocumentAllocator<'a, C>
where
    C: DocumentClient + ?Sized,
{
    pub fn new(client: &'a C, settings: &'a SyncSettings) -> Self {
        Self { client, settings }
    }

    /// Create one empty document per known store, default store first.
    pub async fn bootstrap(
        &self,
        documents: &mut DocumentSet,
    ) -> Result<AllocationSummary, ReconcileError> {
        let mut summary = AllocationSummary::default();

        for store in self.settings.stores() {
            let document = self
                .client
                .create_document(self.settings.organization, store)
                .await?;
            info!(document_id = %document.id, store = %store, "bootstrap document created");
            documents.record_document(document);
            summary.documents_created += 1;
        }

        Ok(summary)
    }

    /// Push quantities of matched products, then place unmatched ones, both in
    /// page order.
    pub async fn apply(
        &self,
        documents: &mut DocumentSet,
        outcome: MatchOutcome,
    ) -> Result<AllocationSummary, ReconcileError> {
        let mut summary = AllocationSummary::default();

        for matched in outcome.matched {
            let at = PositionMatch {
                document_id: matched.document_id,
                position_id: matched.position_id,
            };
            self.update(documents, at, &matched.product).await?;
            summary.positions_updated += 1;
        }

        for product in outcome.unmatched {
            self.place(documents, &product, &mut summary).await?;
        }

        Ok(summary)
    }

    async fn update(
        &self,
        documents: &mut DocumentSet,
        at: PositionMatch,
        product: &Product,
    ) -> Result<(), ReconcileError> {
        self.client
            .update_position(
                at.document_id,
                at.position_id,
                product.external_id,
                product.stock_quantity,
            )
            .await?;
        documents.record_quantity(at, product.stock_quantity);
        debug!(
            position_id = %at.position_id,
            quantity = product.stock_quantity,
            "position quantity pushed"
        );
        Ok(())
    }

    async fn place(
        &self,
        documents: &mut DocumentSet,
        product: &Product,
        summary: &mut AllocationSummary,
    ) -> Result<(), ReconcileError> {
        // A duplicate row earlier in the page may already own a position.
        if let Some(at) = documents.find_position(product.external_id) {
            self.update(documents, at, product).await?;
            summary.positions_updated += 1;
            return Ok(());
        }

        let store = self.settings.store_for(product.marketplace_id);
        let document_id = match documents.first_with_capacity(store) {
            Some(id) => id,
            None => {
                let id = self.open_document(documents, store).await?;
                summary.documents_created += 1;
                id
            }
        };

        let position = self
            .client
            .create_position(document_id, product.external_id, product.stock_quantity)
            .await?;
        debug!(
            document_id = %document_id,
            position_id = %position.id,
            assortment = %product.external_id,
            "position created"
        );
        documents.record_position(position)?;
        summary.positions_created += 1;
        Ok(())
    }

    async fn open_document(
        &self,
        documents: &mut DocumentSet,
        store: StoreId,
    ) -> Result<DocumentId, ReconcileError> {
        let document = self
            .client
            .create_document(self.settings.organization, store)
            .await?;
        info!(document_id = %document.id, store = %store, "document created, no capacity left");
        let id = document.id;
        documents.record_document(document);
        Ok(id)
    }
}
