use thiserror::Error;

use contacts_shared::{ContactId, ValidationError};
use contacts_store::StoreError;

/// Failure of a single call to the remote contact API, classified by how
/// the caller should react.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The server rejected the payload (400). Terminal.
    #[error("Rejected by server: {0}")]
    Validation(String),

    /// The target id does not exist server-side (404). Terminal.
    #[error("Not found on server: {0}")]
    NotFound(String),

    /// The request never reached the server, timed out, or hit a gateway
    /// that could not reach it. Retryable.
    #[error("Server unreachable: {0}")]
    Connectivity(String),

    /// A reachable server reported an internal failure. Retryable.
    #[error("Server error: {0}")]
    Server(String),
}

impl ApiError {
    /// Whether the operation should be queued and replayed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Connectivity(_) | ApiError::Server(_))
    }
}

/// Errors returned to callers of the contact service.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Rejected(String),

    #[error("Contact not found: {0}")]
    NotFound(ContactId),

    #[error("Local store error: {0}")]
    Store(#[from] StoreError),

    #[error("HTTP client error: {0}")]
    Http(String),
}

impl ClientError {
    /// Map a terminal remote failure for the contact `id`.
    pub(crate) fn from_api(error: ApiError, id: Option<&ContactId>) -> Self {
        match (error, id) {
            (ApiError::NotFound(_), Some(id)) => ClientError::NotFound(id.clone()),
            (ApiError::NotFound(msg), None) => ClientError::Rejected(msg),
            (ApiError::Validation(msg), _) => ClientError::Rejected(msg),
            (other, _) => ClientError::Rejected(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
