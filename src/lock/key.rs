//! Lock keys and ownership tokens

use std::fmt;

use crate::account::AccountId;

/// Namespace for per-account update locks.
pub const ACCOUNT_LOCK_PREFIX: &str = "lock:update_account:";

/// Key of one lock in the lock store.
///
/// `Ord` is plain string order; it is the canonical acquisition order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LockKey(String);

impl LockKey {
    /// Lock guarding balance updates of `account_id`.
    pub fn for_account(account_id: &AccountId) -> Self {
        Self(format!("{}{}", ACCOUNT_LOCK_PREFIX, account_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value stored under a held key; release only deletes a key still holding
/// the releasing handle's token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockToken(String);

impl LockToken {
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
