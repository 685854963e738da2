//! `stocksync-core` — identifiers and error model shared by every crate.
//!
//! This crate contains **pure** primitives (no IO, no storage, no HTTP).

pub mod error;
pub mod id;
pub mod reference;

pub use error::{DomainError, DomainResult};
pub use id::{AssortmentId, DocumentId, OrganizationId, PositionId, StoreId};
pub use reference::{EntityKind, EntityRef};
