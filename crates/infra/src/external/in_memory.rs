use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockWriteGuard};

use async_trait::async_trait;

use stocksync_core::{AssortmentId, DocumentId, OrganizationId, PositionId, StoreId};
use stocksync_inventory::{DOCUMENT_CAPACITY, Position, StockEntryDocument};

use super::{ApiErrorDetail, DocumentClient, RemoteServiceError};

pub const LIST_DOCUMENTS: &str = "list_documents";
pub const GET_POSITIONS: &str = "get_positions";
pub const CREATE_DOCUMENT: &str = "create_document";
pub const CREATE_POSITION: &str = "create_position";
pub const UPDATE_POSITION: &str = "update_position";

#[derive(Debug, Default)]
struct State {
    documents: Vec<StockEntryDocument>,
    positions: HashMap<DocumentId, Vec<Position>>,
    calls: HashMap<&'static str, usize>,
    log: Vec<&'static str>,
    failing: HashSet<&'static str>,
}

/// In-memory stand-in for the remote document service.
///
/// Intended for tests/dev. Enforces the per-document position limit the way
/// the real service does (HTTP 412) and counts every call by operation name.
#[derive(Debug)]
pub struct InMemoryDocumentClient {
    state: RwLock<State>,
    capacity: usize,
}

impl Default for InMemoryDocumentClient {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentClient {
    pub fn new() -> Self {
        Self::with_capacity(DOCUMENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: RwLock::new(State::default()),
            capacity,
        }
    }

    /// Seed an existing document with its positions.
    pub fn insert_document(&self, document: StockEntryDocument, positions: Vec<Position>) {
        if let Ok(mut state) = self.state.write() {
            state.positions.insert(document.id, positions);
            state.documents.push(document);
        }
    }

    /// Documents in listing (creation) order.
    pub fn documents(&self) -> Vec<StockEntryDocument> {
        self.state
            .read()
            .map(|s| s.documents.clone())
            .unwrap_or_default()
    }

    pub fn positions(&self, document_id: DocumentId) -> Vec<Position> {
        self.state
            .read()
            .ok()
            .and_then(|s| s.positions.get(&document_id).cloned())
            .unwrap_or_default()
    }

    /// Every position of every document, in listing order.
    pub fn all_positions(&self) -> Vec<Position> {
        self.state
            .read()
            .map(|s| {
                s.documents
                    .iter()
                    .flat_map(|d| s.positions.get(&d.id).cloned().unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of calls made to `operation` (one of the operation constants).
    pub fn calls(&self, operation: &str) -> usize {
        self.state
            .read()
            .ok()
            .and_then(|s| s.calls.get(operation).copied())
            .unwrap_or(0)
    }

    /// Operation names of every call so far, in call order.
    pub fn call_log(&self) -> Vec<&'static str> {
        self.state.read().map(|s| s.log.clone()).unwrap_or_default()
    }

    /// Make every later call of `operation` fail with a 500.
    pub fn fail_on(&self, operation: &'static str) {
        if let Ok(mut state) = self.state.write() {
            state.failing.insert(operation);
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut state) = self.state.write() {
            state.failing.clear();
        }
    }

    fn enter(
        &self,
        operation: &'static str,
    ) -> Result<RwLockWriteGuard<'_, State>, RemoteServiceError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| RemoteServiceError::transport(operation, "lock poisoned"))?;

        *state.calls.entry(operation).or_insert(0) += 1;
        state.log.push(operation);

        if state.failing.contains(operation) {
            return Err(api_error(operation, 500, 1000, "injected failure"));
        }
        Ok(state)
    }
}

fn api_error(operation: &'static str, status: u16, code: i64, message: &str) -> RemoteServiceError {
    let detail = ApiErrorDetail {
        error: message.to_string(),
        code: Some(code),
        parameter: None,
        more_info: None,
    };
    let body = serde_json::json!({ "errors": [&detail] }).to_string();

    RemoteServiceError::Api {
        operation,
        status,
        errors: vec![detail],
        body,
    }
}

fn not_found(operation: &'static str, what: impl std::fmt::Display) -> RemoteServiceError {
    api_error(operation, 404, 1021, &format!("{what} not found"))
}

#[async_trait]
impl DocumentClient for InMemoryDocumentClient {
    async fn list_documents(&self) -> Result<Vec<StockEntryDocument>, RemoteServiceError> {
        let state = self.enter(LIST_DOCUMENTS)?;
        Ok(state.documents.clone())
    }

    async fn get_positions(
        &self,
        document_id: DocumentId,
    ) -> Result<Vec<Position>, RemoteServiceError> {
        let state = self.enter(GET_POSITIONS)?;
        state
            .positions
            .get(&document_id)
            .cloned()
            .ok_or_else(|| not_found(GET_POSITIONS, format!("document {document_id}")))
    }

    async fn create_document(
        &self,
        organization: OrganizationId,
        store: StoreId,
    ) -> Result<StockEntryDocument, RemoteServiceError> {
        let mut state = self.enter(CREATE_DOCUMENT)?;
        let document = StockEntryDocument {
            id: DocumentId::new(),
            organization,
            store,
        };
        state.positions.insert(document.id, Vec::new());
        state.documents.push(document.clone());
        Ok(document)
    }

    async fn create_position(
        &self,
        document_id: DocumentId,
        assortment: AssortmentId,
        quantity: f64,
    ) -> Result<Position, RemoteServiceError> {
        let capacity = self.capacity;
        let mut state = self.enter(CREATE_POSITION)?;
        let positions = state
            .positions
            .get_mut(&document_id)
            .ok_or_else(|| not_found(CREATE_POSITION, format!("document {document_id}")))?;

        if positions.len() >= capacity {
            return Err(api_error(
                CREATE_POSITION,
                412,
                3007,
                &format!("document {document_id} already holds {capacity} positions"),
            ));
        }

        let position = Position {
            id: PositionId::new(),
            document_id,
            assortment,
            quantity,
        };
        positions.push(position.clone());
        Ok(position)
    }

    async fn update_position(
        &self,
        document_id: DocumentId,
        position_id: PositionId,
        assortment: AssortmentId,
        quantity: f64,
    ) -> Result<Position, RemoteServiceError> {
        let mut state = self.enter(UPDATE_POSITION)?;
        let position = state
            .positions
            .get_mut(&document_id)
            .and_then(|ps| ps.iter_mut().find(|p| p.id == position_id))
            .ok_or_else(|| not_found(UPDATE_POSITION, format!("position {position_id}")))?;

        position.assortment = assortment;
        position.quantity = quantity;
        Ok(position.clone())
    }
}
