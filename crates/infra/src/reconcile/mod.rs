//! One convergence pass: page products, match them against the remote
//! documents, then update or place positions.

mod allocator;
mod reconciler;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use stocksync_core::DomainError;

use crate::db::DataAccessError;
use crate::external::RemoteServiceError;

pub use allocator::{AllocationSummary, DocumentAllocator};
pub use reconciler::{PassPhase, Reconciler};

/// Why a pass stopped before reaching its last page.
///
/// Nothing is rolled back: work done before the failure stays applied and the
/// next pass converges from there.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    DataAccess(#[from] DataAccessError),

    #[error(transparent)]
    Remote(#[from] RemoteServiceError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("pass cancelled")]
    Cancelled,
}

/// Counters of one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassReport {
    pub pages_fetched: usize,
    pub products_seen: usize,
    pub positions_updated: usize,
    pub positions_created: usize,
    pub documents_created: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PassReport {
    pub(crate) fn started(at: DateTime<Utc>) -> Self {
        Self {
            pages_fetched: 0,
            products_seen: 0,
            positions_updated: 0,
            positions_created: 0,
            documents_created: 0,
            started_at: at,
            finished_at: at,
        }
    }

    pub(crate) fn absorb(&mut self, summary: AllocationSummary) {
        self.positions_updated += summary.positions_updated;
        self.positions_created += summary.positions_created;
        self.documents_created += summary.documents_created;
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
