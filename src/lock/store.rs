//! Lock store contract
//!
//! The only two primitives the locking protocol needs: set-if-absent with
//! expiry, and delete. Release is compare-and-delete on the holder's token.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::key::{LockKey, LockToken};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockStoreError {
    #[error("Lock store unavailable: {0}")]
    Unavailable(String),

    #[error("Lock store command failed: {0}")]
    Command(String),
}

impl From<redis::RedisError> for LockStoreError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout()
        {
            LockStoreError::Unavailable(e.to_string())
        } else {
            LockStoreError::Command(e.to_string())
        }
    }
}

#[async_trait]
pub trait LockStore: Send + Sync {
    /// Store name for logging
    fn name(&self) -> &'static str;

    /// Set `key = token` only if `key` is absent.
    ///
    /// Returns `Ok(true)` when acquired, `Ok(false)` when the key is already
    /// held. `ttl = None` means the key never expires on its own.
    async fn set_if_absent(
        &self,
        key: &LockKey,
        token: &LockToken,
        ttl: Option<Duration>,
    ) -> Result<bool, LockStoreError>;

    /// Delete `key` if it still holds `token`.
    ///
    /// Idempotent: an absent key, or one held under another token, is left
    /// alone and reported as `Ok(false)`.
    async fn delete(&self, key: &LockKey, token: &LockToken) -> Result<bool, LockStoreError>;

    /// Cheap liveness probe used by `/health`.
    async fn health_check(&self) -> Result<(), LockStoreError>;
}
