//! Resource references.
//!
//! The remote service links entities through `meta.href` URLs shaped like
//! `{base}/entity/{kind}/{uuid}`. The last path segment is always the UUID of
//! the referenced entity; the segment before it names its kind.

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Kind of a referenced entity (the `type` of a `meta` object).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Product,
    Variant,
    Service,
    Bundle,
    Consignment,
    Organization,
    Store,
    Enter,
    /// Any kind this system does not emit itself.
    #[serde(other)]
    Other,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Product => "product",
            EntityKind::Variant => "variant",
            EntityKind::Service => "service",
            EntityKind::Bundle => "bundle",
            EntityKind::Consignment => "consignment",
            EntityKind::Organization => "organization",
            EntityKind::Store => "store",
            EntityKind::Enter => "enter",
            EntityKind::Other => "other",
        }
    }

    fn from_segment(segment: &str) -> Self {
        match segment {
            "product" => EntityKind::Product,
            "variant" => EntityKind::Variant,
            "service" => EntityKind::Service,
            "bundle" => EntityKind::Bundle,
            "consignment" => EntityKind::Consignment,
            "organization" => EntityKind::Organization,
            "store" => EntityKind::Store,
            "enter" => EntityKind::Enter,
            _ => EntityKind::Other,
        }
    }
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed link to a remote entity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: Uuid,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<Uuid>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// Render the `href` of this reference against the service base URL.
    pub fn href(&self, base_url: &str) -> String {
        format!(
            "{}/entity/{}/{}",
            base_url.trim_end_matches('/'),
            self.kind,
            self.id
        )
    }

    /// Parse an `href` back into a reference.
    ///
    /// Query strings (`?expand=...`) and trailing slashes are ignored.
    pub fn parse_href(href: &str) -> DomainResult<Self> {
        let url = Url::parse(href)
            .map_err(|e| DomainError::invalid_reference(format!("{href}: {e}")))?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let (id_segment, kind_segment) = match segments.as_slice() {
            [.., kind, id] => (*id, Some(*kind)),
            [id] => (*id, None),
            [] => {
                return Err(DomainError::invalid_reference(format!(
                    "{href}: no path segments"
                )));
            }
        };

        let id = Uuid::parse_str(id_segment)
            .map_err(|e| DomainError::invalid_reference(format!("{href}: {e}")))?;

        Ok(Self {
            kind: kind_segment
                .map(EntityKind::from_segment)
                .unwrap_or(EntityKind::Other),
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://api.moysklad.ru/api/remap/1.2";

    #[test]
    fn href_embeds_kind_and_id() {
        let id = Uuid::parse_str("be54bdc2-1448-11ef-0a80-16c50012f572").unwrap();
        let r = EntityRef::new(EntityKind::Organization, id);
        assert_eq!(
            r.href(BASE),
            "https://api.moysklad.ru/api/remap/1.2/entity/organization/be54bdc2-1448-11ef-0a80-16c50012f572"
        );
        assert_eq!(r.href(&format!("{BASE}/")), r.href(BASE));
    }

    #[test]
    fn parse_takes_last_segment_as_id() {
        let href =
            format!("{BASE}/entity/variant/6f237006-1eff-11ef-0a80-0665001bf5c6?expand=product");
        let r = EntityRef::parse_href(&href).unwrap();
        assert_eq!(r.kind, EntityKind::Variant);
        assert_eq!(r.id.to_string(), "6f237006-1eff-11ef-0a80-0665001bf5c6");
    }

    #[test]
    fn parse_tolerates_unknown_kind() {
        let href = format!("{BASE}/entity/customentity/6f237006-1eff-11ef-0a80-0665001bf5c6/");
        let r = EntityRef::parse_href(&href).unwrap();
        assert_eq!(r.kind, EntityKind::Other);
    }

    #[test]
    fn parse_rejects_non_uuid_tail() {
        let err = EntityRef::parse_href(&format!("{BASE}/entity/product/metadata")).unwrap_err();
        assert!(matches!(err, DomainError::InvalidReference(_)));
    }

    #[test]
    fn parse_rejects_relative_href() {
        assert!(EntityRef::parse_href("entity/product/abc").is_err());
    }
}
