use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use stocksync_inventory::{DocumentSet, MatchOutcome, PositionMatcher, Product, SyncSettings};

use super::allocator::DocumentAllocator;
use super::{PassReport, ReconcileError};
use crate::db::ProductRepository;
use crate::external::DocumentClient;

/// Where a pass currently is.
///
/// `Idle → Paging → Matching → Allocating → Paging(next offset)` until a page
/// comes back empty, then `Done`.
#[derive(Debug)]
pub enum PassPhase {
    Idle,
    Paging {
        offset: u64,
    },
    Matching {
        offset: u64,
        products: Vec<Product>,
    },
    Allocating {
        offset: u64,
        documents: DocumentSet,
        outcome: MatchOutcome,
    },
    Done,
}

impl PassPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Paging { .. } => "paging",
            Self::Matching { .. } => "matching",
            Self::Allocating { .. } => "allocating",
            Self::Done => "done",
        }
    }
}

/// Drives convergence passes between the product table and the remote
/// stock-entry documents.
///
/// The repository and client are owned and reused by every pass.
pub struct Reconciler<R, C> {
    products: R,
    client: C,
    settings: SyncSettings,
    page_size: u32,
}

impl<R, C> Reconciler<R, C>
where
    R: ProductRepository,
    C: DocumentClient,
{
    pub fn new(products: R, client: C, settings: SyncSettings, page_size: u32) -> Self {
        Self {
            products,
            client,
            settings,
            page_size: page_size.max(1),
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Run one pass from offset 0 to the first empty page.
    ///
    /// The token is checked before every page fetch. A failure aborts the pass
    /// where it happened; nothing already written remotely is undone.
    #[instrument(skip_all, fields(page_size = self.page_size))]
    pub async fn run_pass(&self, cancel: &CancellationToken) -> Result<PassReport, ReconcileError> {
        let mut report = PassReport::started(Utc::now());
        let mut phase = PassPhase::Idle;

        loop {
            debug!(phase = phase.name(), "pass step");
            phase = match phase {
                PassPhase::Idle => PassPhase::Paging { offset: 0 },

                PassPhase::Paging { offset } => {
                    if cancel.is_cancelled() {
                        return Err(ReconcileError::Cancelled);
                    }

                    let products = self
                        .products
                        .collect_products(self.page_size, offset)
                        .await?;
                    report.pages_fetched += 1;

                    if products.is_empty() {
                        PassPhase::Done
                    } else {
                        report.products_seen += products.len();
                        PassPhase::Matching { offset, products }
                    }
                }

                PassPhase::Matching { offset, products } => {
                    let documents = self.snapshot(&mut report).await?;
                    let outcome = PositionMatcher::classify(&documents, products);
                    debug!(
                        offset,
                        matched = outcome.matched.len(),
                        unmatched = outcome.unmatched.len(),
                        "page classified"
                    );
                    PassPhase::Allocating {
                        offset,
                        documents,
                        outcome,
                    }
                }

                PassPhase::Allocating {
                    offset,
                    mut documents,
                    outcome,
                } => {
                    let summary = DocumentAllocator::new(&self.client, &self.settings)
                        .apply(&mut documents, outcome)
                        .await?;
                    report.absorb(summary);
                    PassPhase::Paging {
                        offset: offset + u64::from(self.page_size),
                    }
                }

                PassPhase::Done => break,
            };
        }

        report.finished_at = Utc::now();
        info!(
            pages_fetched = report.pages_fetched,
            products_seen = report.products_seen,
            positions_updated = report.positions_updated,
            positions_created = report.positions_created,
            documents_created = report.documents_created,
            duration_ms = report.duration().num_milliseconds(),
            "reconciliation pass finished"
        );
        Ok(report)
    }

    /// Fresh view of every document and its positions, bootstrapping the
    /// per-store documents when the remote listing is empty.
    async fn snapshot(&self, report: &mut PassReport) -> Result<DocumentSet, ReconcileError> {
        let listed = self.client.list_documents().await?;
        let mut documents = DocumentSet::new(self.settings.document_capacity);

        if listed.is_empty() {
            let summary = DocumentAllocator::new(&self.client, &self.settings)
                .bootstrap(&mut documents)
                .await?;
            report.absorb(summary);
            return Ok(documents);
        }

        for document in listed {
            let positions = self.client.get_positions(document.id).await?;
            documents.push(document, positions);
        }
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryProductRepository;
    use crate::external::InMemoryDocumentClient;
    use crate::external::in_memory::LIST_DOCUMENTS;
    use std::sync::Arc;
    use stocksync_core::AssortmentId;
    use stocksync_inventory::MarketplaceId;

    #[tokio::test]
    async fn empty_table_finishes_after_one_fetch_without_remote_calls() {
        let repo = Arc::new(InMemoryProductRepository::new());
        let client = Arc::new(InMemoryDocumentClient::new());
        let reconciler = Reconciler::new(repo.clone(), client.clone(), SyncSettings::default(), 10);

        let report = reconciler.run_pass(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.pages_fetched, 1);
        assert_eq!(report.products_seen, 0);
        assert_eq!(repo.page_fetches(), 1);
        assert_eq!(client.calls(LIST_DOCUMENTS), 0);
        assert!(client.documents().is_empty());
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_the_first_page() {
        let product = Product::new(AssortmentId::new(), 1, MarketplaceId(1), 1.0).unwrap();
        let repo = Arc::new(InMemoryProductRepository::with_products(vec![product]));
        let reconciler = Reconciler::new(
            repo.clone(),
            InMemoryDocumentClient::new(),
            SyncSettings::default(),
            1,
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = reconciler.run_pass(&cancel).await.unwrap_err();

        assert!(matches!(err, ReconcileError::Cancelled));
        assert_eq!(repo.page_fetches(), 0);
    }

    #[test]
    fn zero_page_size_is_raised_to_one() {
        let reconciler = Reconciler::new(
            InMemoryProductRepository::new(),
            InMemoryDocumentClient::new(),
            SyncSettings::default(),
            0,
        );
        assert_eq!(reconciler.page_size(), 1);
    }
}
