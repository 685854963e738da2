//! Remote inventory service adapters (stock-entry documents and positions).

pub mod in_memory;
pub mod moysklad;
pub mod wire;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stocksync_core::{AssortmentId, DocumentId, OrganizationId, PositionId, StoreId};
use stocksync_inventory::{Position, StockEntryDocument};

pub use in_memory::InMemoryDocumentClient;
pub use moysklad::MoySkladClient;

/// One entry of the remote error payload (`{"errors": [...]}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorDetail {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub more_info: Option<String>,
}

/// Failure talking to the remote service.
///
/// `Api` keeps the response body verbatim next to whatever could be decoded
/// from it, so the pass boundary can log the full payload once.
#[derive(Debug, Error)]
pub enum RemoteServiceError {
    #[error("{operation}: transport failure: {reason}")]
    Transport {
        operation: &'static str,
        reason: String,
    },

    #[error("{operation}: remote service answered {status}: {}", describe(.errors, .body))]
    Api {
        operation: &'static str,
        status: u16,
        errors: Vec<ApiErrorDetail>,
        body: String,
    },

    #[error("{operation}: unexpected response: {reason}")]
    Decode {
        operation: &'static str,
        reason: String,
    },
}

impl RemoteServiceError {
    pub fn transport(operation: &'static str, reason: impl ToString) -> Self {
        Self::Transport {
            operation,
            reason: reason.to_string(),
        }
    }

    pub fn decode(operation: &'static str, reason: impl ToString) -> Self {
        Self::Decode {
            operation,
            reason: reason.to_string(),
        }
    }

    /// Build from a non-success response, decoding the error payload if possible.
    pub fn from_response(operation: &'static str, status: u16, body: String) -> Self {
        let errors = serde_json::from_str::<wire::ErrorBody>(&body)
            .map(|b| b.errors)
            .unwrap_or_default();

        Self::Api {
            operation,
            status,
            errors,
            body,
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            Self::Transport { operation, .. }
            | Self::Api { operation, .. }
            | Self::Decode { operation, .. } => operation,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn describe(errors: &[ApiErrorDetail], body: &str) -> String {
    if errors.is_empty() {
        return body.to_string();
    }

    errors
        .iter()
        .map(|e| match e.code {
            Some(code) => format!("[{code}] {}", e.error),
            None => e.error.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Stock-entry documents and positions of the remote service.
#[async_trait]
pub trait DocumentClient: Send + Sync {
    /// Every current stock-entry document, in listing order.
    async fn list_documents(&self) -> Result<Vec<StockEntryDocument>, RemoteServiceError>;

    /// Positions of one document, in listing order.
    async fn get_positions(
        &self,
        document_id: DocumentId,
    ) -> Result<Vec<Position>, RemoteServiceError>;

    /// Create an empty document for `organization` receiving into `store`.
    async fn create_document(
        &self,
        organization: OrganizationId,
        store: StoreId,
    ) -> Result<StockEntryDocument, RemoteServiceError>;

    /// Append a new position.
    async fn create_position(
        &self,
        document_id: DocumentId,
        assortment: AssortmentId,
        quantity: f64,
    ) -> Result<Position, RemoteServiceError>;

    /// Overwrite quantity and assortment of an existing position.
    async fn update_position(
        &self,
        document_id: DocumentId,
        position_id: PositionId,
        assortment: AssortmentId,
        quantity: f64,
    ) -> Result<Position, RemoteServiceError>;
}

#[async_trait]
impl<C> DocumentClient for Arc<C>
where
    C: DocumentClient + ?Sized,
{
    async fn list_documents(&self) -> Result<Vec<StockEntryDocument>, RemoteServiceError> {
        (**self).list_documents().await
    }

    async fn get_positions(
        &self,
        document_id: DocumentId,
    ) -> Result<Vec<Position>, RemoteServiceError> {
        (**self).get_positions(document_id).await
    }

    async fn create_document(
        &self,
        organization: OrganizationId,
        store: StoreId,
    ) -> Result<StockEntryDocument, RemoteServiceError> {
        (**self).create_document(organization, store).await
    }

    async fn create_position(
        &self,
        document_id: DocumentId,
        assortment: AssortmentId,
        quantity: f64,
    ) -> Result<Position, RemoteServiceError> {
        (**self).create_position(document_id, assortment, quantity).await
    }

    async fn update_position(
        &self,
        document_id: DocumentId,
        position_id: PositionId,
        assortment: AssortmentId,
        quantity: f64,
    ) -> Result<Position, RemoteServiceError> {
        (**self)
            .update_position(document_id, position_id, assortment, quantity)
            .await
    }
}
