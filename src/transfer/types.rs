//! Transfer request and result types

use std::fmt;

use chrono::{DateTime, Utc};

use super::error::TransferError;
use crate::account::AccountId;
use crate::lock::LockKey;
use crate::money::Money;

/// Correlation id of one transfer attempt, carried through its log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransferId(ulid::Ulid);

impl TransferId {
    pub fn generate() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated transfer request. Not persisted.
///
/// Construction guarantees: both ids well-formed, `source != destination`,
/// `amount > 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferIntent {
    source: AccountId,
    destination: AccountId,
    amount: Money,
}

impl TransferIntent {
    pub fn new(source: &str, destination: &str, amount: Money) -> Result<Self, TransferError> {
        let source = AccountId::new(source)?;
        let destination = AccountId::new(destination)?;

        if source == destination {
            return Err(TransferError::SameAccount);
        }
        if !amount.is_positive() {
            return Err(TransferError::InvalidAmount);
        }

        Ok(Self {
            source,
            destination,
            amount,
        })
    }

    pub fn source(&self) -> &AccountId {
        &self.source
    }

    pub fn destination(&self) -> &AccountId {
        &self.destination
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    /// The two locks this transfer needs (unordered; the coordinator sorts).
    pub fn lock_keys(&self) -> [LockKey; 2] {
        [
            LockKey::for_account(&self.source),
            LockKey::for_account(&self.destination),
        ]
    }
}

/// Post-transfer balances of both accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub transfer_id: TransferId,
    pub source_account_id: String,
    pub source_balance: Money,
    pub destination_account_id: String,
    pub destination_balance: Money,
    pub amount: Money,
    pub completed_at: DateTime<Utc>,
}

/// Decided result of a transfer that ran to completion under its locks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Completed(TransferReceipt),
    InsufficientFunds { available: Money, requested: Money },
    SourceNotFound,
    DestinationNotFound,
}

impl TransferOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TransferOutcome::Completed(_))
    }

    pub fn message(&self) -> &'static str {
        match self {
            TransferOutcome::Completed(_) => "Transaction completed successfully",
            TransferOutcome::InsufficientFunds { .. } => "Insufficient balance",
            TransferOutcome::SourceNotFound => "Source account not found",
            TransferOutcome::DestinationNotFound => "Destination account not found",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            TransferOutcome::Completed(_) => "SUCCESS",
            TransferOutcome::InsufficientFunds { .. } => "INSUFFICIENT_BALANCE",
            TransferOutcome::SourceNotFound => "SOURCE_ACCOUNT_NOT_FOUND",
            TransferOutcome::DestinationNotFound => "DESTINATION_ACCOUNT_NOT_FOUND",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            TransferOutcome::Completed(_) | TransferOutcome::InsufficientFunds { .. } => 200,
            TransferOutcome::SourceNotFound | TransferOutcome::DestinationNotFound => 404,
        }
    }
}
