//! Account query service
//!
//! Single-account lookup and creation. Reads take no lock: a read racing an
//! in-flight transfer may see one side of it before the other. Every write
//! path is atomic per account, so this is staleness, not corruption.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use super::models::Account;
use super::store::{AccountStore, StoreError};
use super::validation::{AccountId, ValidationError};
use crate::money::Money;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Account not found: {0}")]
    NotFound(String),

    #[error("Account already exists: {0}")]
    AlreadyExists(String),

    #[error("Database error: {0}")]
    Store(String),
}

impl AccountError {
    pub fn code(&self) -> &'static str {
        match self {
            AccountError::InvalidRequest(_) => "INVALID_REQUEST",
            AccountError::NotFound(_) => "ACCOUNT_NOT_FOUND",
            AccountError::AlreadyExists(_) => "ACCOUNT_ALREADY_EXISTS",
            AccountError::Store(_) => "DATABASE_ERROR",
        }
    }

    /// Creation conflicts report 500 like store failures; clients treat both
    /// as "not created".
    pub fn http_status(&self) -> u16 {
        match self {
            AccountError::InvalidRequest(_) => 400,
            AccountError::NotFound(_) => 404,
            AccountError::AlreadyExists(_) | AccountError::Store(_) => 500,
        }
    }
}

impl From<ValidationError> for AccountError {
    fn from(e: ValidationError) -> Self {
        AccountError::InvalidRequest(e.to_string())
    }
}

impl From<StoreError> for AccountError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => AccountError::NotFound(id),
            StoreError::AlreadyExists(id) => AccountError::AlreadyExists(id),
            StoreError::Database(msg) => AccountError::Store(msg),
        }
    }
}

pub struct AccountService {
    store: Arc<dyn AccountStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Look up one account. An id that fails validation cannot name a stored
    /// account and reports `NotFound` without touching the store.
    pub async fn get(&self, account_id: &str) -> Result<Account, AccountError> {
        let Ok(id) = AccountId::new(account_id) else {
            return Err(AccountError::NotFound(account_id.to_string()));
        };
        self.store
            .read(&id)
            .await?
            .ok_or_else(|| AccountError::NotFound(id.into_string()))
    }

    /// Create an account with an opening balance.
    ///
    /// The existence check and the insert are not covered by a lock; a racing
    /// duplicate is rejected by the store's own uniqueness guarantee.
    pub async fn create(
        &self,
        account_id: &str,
        initial_balance: Money,
    ) -> Result<Account, AccountError> {
        let id = AccountId::new(account_id)?;
        if initial_balance.is_negative() {
            return Err(AccountError::InvalidRequest(
                "initial_balance must not be negative".to_string(),
            ));
        }

        if self.store.read(&id).await?.is_some() {
            return Err(AccountError::AlreadyExists(id.into_string()));
        }

        let account = Account::new(id, initial_balance);
        if let Err(e) = self.store.create(&account).await {
            warn!(account_id = %account.account_id, error = %e, "account create failed");
            return Err(e.into());
        }

        info!(
            account_id = %account.account_id,
            balance = %account.balance,
            "account created"
        );
        Ok(account)
    }
}
