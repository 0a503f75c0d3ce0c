//! Domain error types.

use store::StoreError;
use thiserror::Error;

use crate::order::OrderError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A business rule rejected the operation.
    #[error("{0}")]
    Order(OrderError),
}

impl DomainError {
    /// Returns true if the operation lost an optimistic concurrency race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::Store(err) if err.is_conflict())
    }
}

impl From<OrderError> for DomainError {
    fn from(e: OrderError) -> Self {
        DomainError::Order(e)
    }
}
