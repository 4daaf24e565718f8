use thiserror::Error;

use fiberstock_core::DomainError;

/// Storage-level failure (as opposed to a rejected business rule).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store lock poisoned: {0}")]
    Poisoned(String),
}

/// Error returned by every `StockService` operation.
///
/// Domain rejections pass through untouched so callers can match on the
/// business reason (`InsufficientStock`, `NotEditable`, ...).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ServiceError {
    /// The domain error, if this is a business-rule rejection.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(err) => Some(err),
            _ => None,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
