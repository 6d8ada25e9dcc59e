//! Distributed locking
//!
//! Per-account mutual exclusion across service instances, backed by a shared
//! key-value store (Redis in production, in-process map for tests).
//!
//! - [`key`]: lock keys and holder tokens
//! - [`store`]: the set-if-absent / delete contract
//! - [`coordinator`]: ordered multi-key acquisition and guaranteed release

pub mod coordinator;
pub mod key;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use coordinator::{LockCoordinator, LockError, LockHandle, LockPolicy, ReleaseFailure};
pub use key::{ACCOUNT_LOCK_PREFIX, LockKey, LockToken};
pub use memory::MemoryLockStore;
pub use redis_store::RedisLockStore;
pub use store::{LockStore, LockStoreError};
