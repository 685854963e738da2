//! JSON shapes of the remote service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stocksync_core::{DocumentId, DomainResult, EntityKind, EntityRef, PositionId};
use stocksync_inventory::{Position, StockEntryDocument};

use super::ApiErrorDetail;

pub const MEDIA_TYPE_JSON: &str = "application/json";

/// `meta` object: link plus, for collections, paging counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EntityKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing)]
    pub size: Option<u64>,
    #[serde(default, skip_serializing)]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing)]
    pub offset: Option<u64>,
}

/// An entity reference as it appears in request and response bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaRef {
    pub meta: Meta,
}

impl MetaRef {
    pub fn to(reference: EntityRef, base_url: &str) -> Self {
        Self {
            meta: Meta {
                href: reference.href(base_url),
                kind: Some(reference.kind),
                media_type: Some(MEDIA_TYPE_JSON.to_string()),
                size: None,
                limit: None,
                offset: None,
            },
        }
    }

    pub fn resolve(&self) -> DomainResult<EntityRef> {
        EntityRef::parse_href(&self.meta.href)
    }
}

/// One page of a collection.
#[derive(Debug, Clone, Deserialize)]
pub struct ListPage<T> {
    pub meta: Meta,
    #[serde(default = "Vec::new")]
    pub rows: Vec<T>,
}

/// Stock-entry ("enter") document.
#[derive(Debug, Clone, Deserialize)]
pub struct Enter {
    pub id: Uuid,
    pub organization: MetaRef,
    pub store: MetaRef,
}

impl Enter {
    pub fn into_document(self) -> DomainResult<StockEntryDocument> {
        Ok(StockEntryDocument {
            id: DocumentId::from_uuid(self.id),
            organization: self.organization.resolve()?.id.into(),
            store: self.store.resolve()?.id.into(),
        })
    }
}

/// Body of a document creation.
#[derive(Debug, Clone, Serialize)]
pub struct NewEnter {
    pub organization: MetaRef,
    pub store: MetaRef,
}

/// Position of a stock-entry document.
#[derive(Debug, Clone, Deserialize)]
pub struct EnterPosition {
    pub id: Uuid,
    #[serde(default)]
    pub quantity: f64,
    pub assortment: MetaRef,
}

impl EnterPosition {
    pub fn into_position(self, document_id: DocumentId) -> DomainResult<Position> {
        Ok(Position {
            id: PositionId::from_uuid(self.id),
            document_id,
            assortment: self.assortment.resolve()?.id.into(),
            quantity: self.quantity,
        })
    }
}

/// Body of a position creation or update.
#[derive(Debug, Clone, Serialize)]
pub struct PositionBody {
    pub quantity: f64,
    pub assortment: MetaRef,
}

/// Error payload of a failed request.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}
