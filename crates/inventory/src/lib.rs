//! Inventory reconciliation domain.
//!
//! This crate contains the deterministic part of the synchronisation: products,
//! stock-entry documents and their positions, store selection and the
//! product-to-position matching scan (no IO, no HTTP, no storage).

pub mod document;
pub mod matcher;
pub mod product;
pub mod settings;

pub use document::{DocumentEntry, DocumentSet, Position, PositionMatch, StockEntryDocument};
pub use matcher::{MatchOutcome, MatchedProduct, PositionMatcher};
pub use product::{MarketplaceId, Product};
pub use settings::{
    DOCUMENT_CAPACITY, ORGANIZATION_ID, SyncSettings, TOYZZSHOP_MARKETPLACE_ID, TOYZZSHOP_STORE_ID,
    TRENDYOL_STORE_ID,
};
