//! Stock-entry documents, their positions, and the per-page document index.

use serde::{Deserialize, Serialize};

use stocksync_core::{
    AssortmentId, DocumentId, DomainError, DomainResult, OrganizationId, PositionId, StoreId,
};

/// A remote stock-entry ("enter") document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntryDocument {
    pub id: DocumentId,
    pub organization: OrganizationId,
    pub store: StoreId,
}

/// A line item of a stock-entry document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub document_id: DocumentId,
    pub assortment: AssortmentId,
    pub quantity: f64,
}

/// Location of the position that represents a product.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PositionMatch {
    pub document_id: DocumentId,
    pub position_id: PositionId,
}

/// A document together with its positions, in listing order.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentEntry {
    pub document: StockEntryDocument,
    pub positions: Vec<Position>,
}

impl DocumentEntry {
    pub fn position_count(&self) -> usize {
        self.positions.len()
    }
}

/// Snapshot of every listed document and its positions.
///
/// Built once per page. Documents and positions created while allocating the
/// page are recorded here so later products of the same page see them.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSet {
    entries: Vec<DocumentEntry>,
    capacity: usize,
}

impl DocumentSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[DocumentEntry] {
        &self.entries
    }

    pub fn total_positions(&self) -> usize {
        self.entries.iter().map(DocumentEntry::position_count).sum()
    }

    /// Append a listed document with the positions fetched for it.
    ///
    /// Listed documents are taken as-is, even when they already exceed the
    /// capacity; such documents simply never receive new positions.
    pub fn push(&mut self, document: StockEntryDocument, positions: Vec<Position>) {
        self.entries.push(DocumentEntry {
            document,
            positions,
        });
    }

    /// Find "the" position of an assortment item.
    ///
    /// Documents are scanned in listing order and positions within a document
    /// in listing order; the first hit wins.
    pub fn find_position(&self, assortment: AssortmentId) -> Option<PositionMatch> {
        self.entries.iter().find_map(|entry| {
            entry
                .positions
                .iter()
                .find(|p| p.assortment == assortment)
                .map(|p| PositionMatch {
                    document_id: entry.document.id,
                    position_id: p.id,
                })
        })
    }

    /// First document of `store` (listing order) that can take another position.
    pub fn first_with_capacity(&self, store: StoreId) -> Option<DocumentId> {
        self.entries
            .iter()
            .find(|e| e.document.store == store && e.position_count() < self.capacity)
            .map(|e| e.document.id)
    }

    /// Record a document created during allocation (it starts empty).
    pub fn record_document(&mut self, document: StockEntryDocument) {
        self.push(document, Vec::new());
    }

    /// Record a position created during allocation.
    ///
    /// Fails when the owning document is unknown or already full, which would
    /// mean the allocator placed a position without checking capacity.
    pub fn record_position(&mut self, position: Position) -> DomainResult<()> {
        let capacity = self.capacity;
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.document.id == position.document_id)
            .ok_or_else(|| {
                DomainError::invariant(format!(
                    "position {} targets unknown document {}",
                    position.id, position.document_id
                ))
            })?;

        if entry.position_count() >= capacity {
            return Err(DomainError::invariant(format!(
                "document {} already holds {} positions",
                entry.document.id,
                entry.position_count()
            )));
        }

        entry.positions.push(position);
        Ok(())
    }

    /// Refresh the quantity of a known position.
    pub fn record_quantity(&mut self, at: PositionMatch, quantity: f64) {
        if let Some(position) = self
            .entries
            .iter_mut()
            .filter(|e| e.document.id == at.document_id)
            .flat_map(|e| e.positions.iter_mut())
            .find(|p| p.id == at.position_id)
        {
            position.quantity = quantity;
        }
    }
}
