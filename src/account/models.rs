//! Account data model

use chrono::{DateTime, Utc};

use super::validation::AccountId;
use crate::money::Money;

/// A persisted account row.
///
/// `balance` is only ever mutated by a caller holding the account's lock and
/// having read the row after acquiring it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub account_id: AccountId,
    pub balance: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// New, not yet persisted account.
    pub fn new(account_id: AccountId, balance: Money) -> Self {
        let now = Utc::now();
        Self {
            account_id,
            balance,
            created_at: now,
            updated_at: now,
        }
    }
}
