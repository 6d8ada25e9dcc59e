//! Account storage contract
//!
//! The transfer core depends on account persistence only through
//! [`AccountStore`]. Implementations: [`super::PgAccountRepository`]
//! (PostgreSQL) and [`super::MemoryAccountStore`] (in-process).

use async_trait::async_trait;
use thiserror::Error;

use super::models::Account;
use super::validation::AccountId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Account not found: {0}")]
    NotFound(String),

    #[error("Account already exists: {0}")]
    AlreadyExists(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Persisted key -> balance mapping.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Point read. `Ok(None)` when the account does not exist.
    async fn read(&self, account_id: &AccountId) -> Result<Option<Account>, StoreError>;

    /// Overwrite one existing row.
    async fn write_single(&self, account: &Account) -> Result<(), StoreError>;

    /// Overwrite two existing rows as one unit: both change or neither does.
    ///
    /// On `Err` the caller must not assume either row was applied.
    async fn write_pair(&self, first: &Account, second: &Account) -> Result<(), StoreError>;

    /// Insert a new row, `StoreError::AlreadyExists` if the id is taken.
    async fn create(&self, account: &Account) -> Result<(), StoreError>;

    /// Cheap liveness probe used by `/health`.
    async fn health_check(&self) -> Result<(), StoreError>;
}
