//! MoySklad JSON API client for stock-entry ("enter") documents.

use async_trait::async_trait;
use reqwest::RequestBuilder;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use stocksync_core::{
    AssortmentId, DocumentId, EntityKind, EntityRef, OrganizationId, PositionId, StoreId,
};
use stocksync_inventory::{Position, StockEntryDocument};

use super::wire::{Enter, EnterPosition, ListPage, MetaRef, NewEnter, PositionBody};
use super::{DocumentClient, RemoteServiceError};
use crate::config::{StartupError, SyncConfig, base_url_value};

/// Largest page the service returns for a collection.
pub const MAX_PAGE_LIMIT: u64 = 1000;

const ACCEPT: &str = "application/json;charset=utf-8";

/// Authenticated client of the remote inventory service.
///
/// `reqwest::Client` pools connections internally; clones share them.
#[derive(Debug, Clone)]
pub struct MoySkladClient {
    http: reqwest::Client,
    base_url: String,
    page_limit: u64,
}

impl MoySkladClient {
    /// Build a client authenticating with the configured bearer token.
    pub fn new(config: &SyncConfig) -> Result<Self, StartupError> {
        let base_url = base_url_value(&config.base_url)?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.access_token))
            .map_err(|e| StartupError::HttpClient(format!("access token: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.http_timeout)
            .gzip(true)
            .build()
            .map_err(|e| StartupError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            page_limit: MAX_PAGE_LIMIT,
        })
    }

    /// Override the collection page size (clamped to `1..=1000`).
    pub fn with_page_limit(mut self, limit: u64) -> Self {
        self.page_limit = limit.clamp(1, MAX_PAGE_LIMIT);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn reference(&self, kind: EntityKind, id: impl Into<uuid::Uuid>) -> MetaRef {
        MetaRef::to(EntityRef::new(kind, id), &self.base_url)
    }

    fn position_body(&self, assortment: AssortmentId, quantity: f64) -> PositionBody {
        PositionBody {
            quantity,
            assortment: self.reference(EntityKind::Product, assortment),
        }
    }

    /// Send a request and decode a success body.
    ///
    /// The body is read as text first so that a failure keeps it verbatim.
    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, RemoteServiceError> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteServiceError::transport(operation, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteServiceError::transport(operation, e))?;

        if !status.is_success() {
            return Err(RemoteServiceError::from_response(
                operation,
                status.as_u16(),
                body,
            ));
        }

        serde_json::from_str(&body).map_err(|e| RemoteServiceError::decode(operation, e))
    }

    /// Collect every row of a collection, following `limit`/`offset` pages
    /// until `meta.size` rows were seen.
    async fn list_all<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
    ) -> Result<Vec<T>, RemoteServiceError> {
        let url = self.url(path);
        let mut rows = Vec::new();
        let mut offset = 0u64;

        loop {
            let page: ListPage<T> = self
                .send(
                    operation,
                    self.http
                        .get(&url)
                        .query(&[("limit", self.page_limit), ("offset", offset)]),
                )
                .await?;

            let received = page.rows.len() as u64;
            let total = page.meta.size.unwrap_or(0);
            rows.extend(page.rows);
            offset += received;

            debug!(operation, offset, total, "collection page received");

            if received == 0 || offset >= total {
                break;
            }
        }

        Ok(rows)
    }
}

#[async_trait]
impl DocumentClient for MoySkladClient {
    #[instrument(skip(self))]
    async fn list_documents(&self) -> Result<Vec<StockEntryDocument>, RemoteServiceError> {
        let rows: Vec<Enter> = self.list_all("list_documents", "entity/enter").await?;

        rows.into_iter()
            .map(|enter| {
                enter
                    .into_document()
                    .map_err(|e| RemoteServiceError::decode("list_documents", e))
            })
            .collect()
    }

    #[instrument(skip(self), fields(document_id = %document_id))]
    async fn get_positions(
        &self,
        document_id: DocumentId,
    ) -> Result<Vec<Position>, RemoteServiceError> {
        let path = format!("entity/enter/{document_id}/positions");
        let rows: Vec<EnterPosition> = self.list_all("get_positions", &path).await?;

        rows.into_iter()
            .map(|p| {
                p.into_position(document_id)
                    .map_err(|e| RemoteServiceError::decode("get_positions", e))
            })
            .collect()
    }

    #[instrument(skip(self), fields(organization = %organization, store = %store))]
    async fn create_document(
        &self,
        organization: OrganizationId,
        store: StoreId,
    ) -> Result<StockEntryDocument, RemoteServiceError> {
        let body = NewEnter {
            organization: self.reference(EntityKind::Organization, organization),
            store: self.reference(EntityKind::Store, store),
        };

        let enter: Enter = self
            .send(
                "create_document",
                self.http.post(self.url("entity/enter")).json(&body),
            )
            .await?;

        enter
            .into_document()
            .map_err(|e| RemoteServiceError::decode("create_document", e))
    }

    #[instrument(skip(self), fields(document_id = %document_id, assortment = %assortment))]
    async fn create_position(
        &self,
        document_id: DocumentId,
        assortment: AssortmentId,
        quantity: f64,
    ) -> Result<Position, RemoteServiceError> {
        // The positions endpoint takes and returns an array.
        let body = [self.position_body(assortment, quantity)];
        let created: Vec<EnterPosition> = self
            .send(
                "create_position",
                self.http
                    .post(self.url(&format!("entity/enter/{document_id}/positions")))
                    .json(&body),
            )
            .await?;

        created
            .into_iter()
            .next()
            .ok_or_else(|| RemoteServiceError::decode("create_position", "empty position list"))?
            .into_position(document_id)
            .map_err(|e| RemoteServiceError::decode("create_position", e))
    }

    #[instrument(
        skip(self),
        fields(document_id = %document_id, position_id = %position_id, assortment = %assortment)
    )]
    async fn update_position(
        &self,
        document_id: DocumentId,
        position_id: PositionId,
        assortment: AssortmentId,
        quantity: f64,
    ) -> Result<Position, RemoteServiceError> {
        let body = self.position_body(assortment, quantity);
        let updated: EnterPosition = self
            .send(
                "update_position",
                self.http
                    .put(self.url(&format!(
                        "entity/enter/{document_id}/positions/{position_id}"
                    )))
                    .json(&body),
            )
            .await?;

        updated
            .into_position(document_id)
            .map_err(|e| RemoteServiceError::decode("update_position", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ORG: &str = "be54bdc2-1448-11ef-0a80-16c50012f572";
    const STORE: &str = "640078d9-1eff-11ef-0a80-0c94001ca0fc";
    const PRODUCT: &str = "6f237006-1eff-11ef-0a80-0665001bf5c6";

    fn client(server: &MockServer) -> MoySkladClient {
        let config = SyncConfig::new("test-token", "postgres://unused").with_base_url(server.uri());
        MoySkladClient::new(&config).unwrap()
    }

    fn enter_json(base: &str, id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "organization": { "meta": { "href": format!("{base}/entity/organization/{ORG}"), "type": "organization" } },
            "store": { "meta": { "href": format!("{base}/entity/store/{STORE}"), "type": "store" } }
        })
    }

    fn position_json(base: &str, id: &str, quantity: f64) -> serde_json::Value {
        json!({
            "id": id,
            "quantity": quantity,
            "assortment": { "meta": { "href": format!("{base}/entity/product/{PRODUCT}"), "type": "product" } }
        })
    }

    #[test]
    fn malformed_base_url_fails_at_construction() {
        let config = SyncConfig::new("test-token", "postgres://unused").with_base_url("not a url");
        let err = MoySkladClient::new(&config).unwrap_err();
        assert!(matches!(err, StartupError::InvalidVar { .. }));
    }

    #[tokio::test]
    async fn list_documents_follows_pages_with_bearer_token() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(method("GET"))
            .and(path("/entity/enter"))
            .and(query_param("offset", "0"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": { "href": format!("{base}/entity/enter"), "size": 3, "limit": 2, "offset": 0 },
                "rows": [
                    enter_json(&base, "00000000-0000-0000-0000-000000000001"),
                    enter_json(&base, "00000000-0000-0000-0000-000000000002")
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/entity/enter"))
            .and(query_param("offset", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": { "href": format!("{base}/entity/enter"), "size": 3, "limit": 2, "offset": 2 },
                "rows": [ enter_json(&base, "00000000-0000-0000-0000-000000000003") ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let documents = client(&server)
            .with_page_limit(2)
            .list_documents()
            .await
            .unwrap();

        assert_eq!(documents.len(), 3);
        assert_eq!(
            documents[2].id.to_string(),
            "00000000-0000-0000-0000-000000000003"
        );
        assert_eq!(documents[0].store.to_string(), STORE);
    }

    #[tokio::test]
    async fn get_positions_maps_assortment_to_product_id() {
        let server = MockServer::start().await;
        let base = server.uri();
        let document = "00000000-0000-0000-0000-0000000000d1";

        Mock::given(method("GET"))
            .and(path(format!("/entity/enter/{document}/positions")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": { "href": "x", "size": 1 },
                "rows": [ position_json(&base, "00000000-0000-0000-0000-0000000000a1", 5.0) ]
            })))
            .mount(&server)
            .await;

        let positions = client(&server)
            .get_positions(document.parse().unwrap())
            .await
            .unwrap();

        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].assortment.to_string(), PRODUCT);
        assert_eq!(positions[0].quantity, 5.0);
        assert_eq!(positions[0].document_id.to_string(), document);
    }

    #[tokio::test]
    async fn create_document_sends_organization_and_store_refs() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(method("POST"))
            .and(path("/entity/enter"))
            .and(body_json(json!({
                "organization": { "meta": {
                    "href": format!("{base}/entity/organization/{ORG}"),
                    "type": "organization",
                    "mediaType": "application/json"
                }},
                "store": { "meta": {
                    "href": format!("{base}/entity/store/{STORE}"),
                    "type": "store",
                    "mediaType": "application/json"
                }}
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(enter_json(&base, "00000000-0000-0000-0000-0000000000d2")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let doc = client(&server)
            .create_document(ORG.parse().unwrap(), STORE.parse().unwrap())
            .await
            .unwrap();

        assert_eq!(doc.id.to_string(), "00000000-0000-0000-0000-0000000000d2");
        assert_eq!(doc.organization.to_string(), ORG);
    }

    #[tokio::test]
    async fn create_position_posts_single_element_array() {
        let server = MockServer::start().await;
        let base = server.uri();
        let document = "00000000-0000-0000-0000-0000000000d3";

        Mock::given(method("POST"))
            .and(path(format!("/entity/enter/{document}/positions")))
            .and(body_json(json!([{
                "quantity": 8.0,
                "assortment": { "meta": {
                    "href": format!("{base}/entity/product/{PRODUCT}"),
                    "type": "product",
                    "mediaType": "application/json"
                }}
            }])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                position_json(&base, "00000000-0000-0000-0000-0000000000a2", 8.0)
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let position = client(&server)
            .create_position(document.parse().unwrap(), PRODUCT.parse().unwrap(), 8.0)
            .await
            .unwrap();

        assert_eq!(position.id.to_string(), "00000000-0000-0000-0000-0000000000a2");
        assert_eq!(position.quantity, 8.0);
    }

    #[tokio::test]
    async fn update_position_puts_to_position_resource() {
        let server = MockServer::start().await;
        let base = server.uri();
        let document = "00000000-0000-0000-0000-0000000000d4";
        let position = "00000000-0000-0000-0000-0000000000a3";

        Mock::given(method("PUT"))
            .and(path(format!("/entity/enter/{document}/positions/{position}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(position_json(&base, position, 8.0)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let updated = client(&server)
            .update_position(
                document.parse().unwrap(),
                position.parse().unwrap(),
                PRODUCT.parse().unwrap(),
                8.0,
            )
            .await
            .unwrap();

        assert_eq!(updated.id.to_string(), position);
        assert_eq!(updated.quantity, 8.0);
    }

    #[tokio::test]
    async fn error_payload_is_surfaced_verbatim() {
        let server = MockServer::start().await;
        let body = json!({
            "errors": [ { "error": "Превышено ограничение на количество позиций", "code": 3007 } ]
        });

        Mock::given(method("POST"))
            .and(path("/entity/enter"))
            .respond_with(ResponseTemplate::new(412).set_body_json(body.clone()))
            .mount(&server)
            .await;

        let err = client(&server)
            .create_document(ORG.parse().unwrap(), STORE.parse().unwrap())
            .await
            .unwrap_err();

        match err {
            RemoteServiceError::Api {
                operation,
                status,
                errors,
                body: raw,
            } => {
                assert_eq!(operation, "create_document");
                assert_eq!(status, 412);
                assert_eq!(errors[0].code, Some(3007));
                assert_eq!(serde_json::from_str::<serde_json::Value>(&raw).unwrap(), body);
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_success_body_is_a_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/entity/enter"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = client(&server).list_documents().await.unwrap_err();
        assert!(matches!(err, RemoteServiceError::Decode { .. }));
    }
}
