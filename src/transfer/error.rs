//! Transfer Error Types
//!
//! Failures of a transfer request. Business results (insufficient funds,
//! missing accounts) are not errors; see [`super::types::TransferOutcome`].

use thiserror::Error;

use crate::account::{StoreError, ValidationError};
use crate::lock::LockError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    // === Validation Errors (no lock taken) ===
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Source and destination account cannot be the same")]
    SameAccount,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    // === Contention ===
    /// Another transfer held a needed lock past the acquire timeout.
    #[error("Failed to acquire lock for transaction: {0}")]
    LockContention(String),

    #[error("Transfer cancelled while waiting for locks")]
    Cancelled,

    // === System Errors ===
    #[error("Lock store error: {0}")]
    LockStore(String),

    #[error("Transaction failed during database update: {0}")]
    Persistence(String),

    #[error("Balance would overflow")]
    Overflow,
}

impl TransferError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidRequest(_) => "INVALID_REQUEST",
            TransferError::SameAccount => "SAME_ACCOUNT",
            TransferError::InvalidAmount => "INVALID_AMOUNT",
            TransferError::LockContention(_) => "LOCK_CONTENTION",
            TransferError::Cancelled => "CANCELLED",
            TransferError::LockStore(_) => "LOCK_STORE_ERROR",
            TransferError::Persistence(_) => "DATABASE_ERROR",
            TransferError::Overflow => "OVERFLOW",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::InvalidRequest(_)
            | TransferError::SameAccount
            | TransferError::InvalidAmount => 400,
            TransferError::LockContention(_) => 503,
            TransferError::Cancelled
            | TransferError::LockStore(_)
            | TransferError::Persistence(_)
            | TransferError::Overflow => 500,
        }
    }

    /// Whether the same request may succeed if simply sent again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransferError::LockContention(_))
    }
}

impl From<ValidationError> for TransferError {
    fn from(e: ValidationError) -> Self {
        TransferError::InvalidRequest(e.to_string())
    }
}

impl From<LockError> for TransferError {
    fn from(e: LockError) -> Self {
        match e {
            LockError::Timeout { .. } => TransferError::LockContention(e.to_string()),
            LockError::Cancelled => TransferError::Cancelled,
            LockError::Store { .. } | LockError::Release(_) => {
                TransferError::LockStore(e.to_string())
            }
        }
    }
}

impl From<StoreError> for TransferError {
    fn from(e: StoreError) -> Self {
        TransferError::Persistence(e.to_string())
    }
}
