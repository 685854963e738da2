//! Product-to-position matching.

use stocksync_core::{DocumentId, PositionId};

use crate::document::DocumentSet;
use crate::product::Product;

/// A product that already has a position.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedProduct {
    pub product: Product,
    pub document_id: DocumentId,
    pub position_id: PositionId,
}

/// Partition of one page of products.
///
/// Both halves keep page order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    pub matched: Vec<MatchedProduct>,
    pub unmatched: Vec<Product>,
}

impl MatchOutcome {
    pub fn len(&self) -> usize {
        self.matched.len() + self.unmatched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matched.is_empty() && self.unmatched.is_empty()
    }
}

/// Classifies a page of products against the current document snapshot.
///
/// The scan is products × documents × positions. Document counts are small and
/// a document holds at most 999 positions, so no index is built.
#[derive(Debug)]
pub struct PositionMatcher;

impl PositionMatcher {
    pub fn classify(documents: &DocumentSet, products: Vec<Product>) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();

        for product in products {
            match documents.find_position(product.external_id) {
                Some(hit) => outcome.matched.push(MatchedProduct {
                    product,
                    document_id: hit.document_id,
                    position_id: hit.position_id,
                }),
                None => outcome.unmatched.push(product),
            }
        }

        outcome
    }
}
