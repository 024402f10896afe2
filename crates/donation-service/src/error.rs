//! Service error types.

use domain::DomainError;
use donation_store::StoreError;
use settlement::QueueError;
use thiserror::Error;

/// Coarse error classes used by transport layers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidParams,
    NotFound,
    Conflict,
    StorageUnavailable,
    Internal,
    Malformed,
}

/// Errors returned by donation use cases.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A caller-supplied argument was rejected.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// The donation store failed.
    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },

    /// The donation was stored but the payment request was not published.
    #[error("can't request payment: {0}")]
    Publish(#[source] QueueError),

    /// Subscribing to payment status updates failed.
    #[error("can't subscribe to payment updates: {0}")]
    Subscribe(#[source] QueueError),

    /// A settlement message could not be decoded.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Unexpected failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub(crate) fn store(context: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| ServiceError::Store { context, source }
    }

    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::InvalidParams(_) => ErrorKind::InvalidParams,
            ServiceError::Store { source, .. } => match source {
                StoreError::NotFound(_) => ErrorKind::NotFound,
                StoreError::Conflict(_) | StoreError::InvalidTransition { .. } => {
                    ErrorKind::Conflict
                }
                StoreError::Database(_) | StoreError::Migration(_) => {
                    ErrorKind::StorageUnavailable
                }
                StoreError::Encoding(_) | StoreError::AmountOverflow(_) => ErrorKind::Internal,
            },
            ServiceError::Publish(_) | ServiceError::Subscribe(_) | ServiceError::Internal(_) => {
                ErrorKind::Internal
            }
            ServiceError::Malformed(_) => ErrorKind::Malformed,
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        ServiceError::InvalidParams(err.to_string())
    }
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
