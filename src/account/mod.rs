//! Account management module
//!
//! Account rows, the storage contract the transfer core depends on, its
//! PostgreSQL and in-memory implementations, and the query service.

pub mod memory;
pub mod models;
pub mod repository;
pub mod service;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use memory::MemoryAccountStore;
pub use models::Account;
pub use repository::PgAccountRepository;
pub use service::{AccountError, AccountService};
pub use store::{AccountStore, StoreError};
pub use validation::{AccountId, ValidationError};
