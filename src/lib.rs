//! Account Transfer Service
//!
//! Account balances plus transfers between two accounts, made safe under
//! concurrency by per-account distributed locks taken in a canonical order.
//!
//! # Modules
//!
//! - [`money`] - Fixed-point amount type (minor units)
//! - [`account`] - Account rows, storage contract, query service
//! - [`lock`] - Distributed lock store contract and ordered acquisition
//! - [`transfer`] - Transfer orchestration and outcomes
//! - [`gateway`] - HTTP API
//! - [`config`] - YAML configuration
//! - [`logging`] - Subscriber setup (binary only)
//! - [`db`] - PostgreSQL pool

pub mod account;
pub mod config;
pub mod db;
pub mod gateway;
pub mod lock;
pub mod logging;
pub mod money;
pub mod transfer;

// Convenient re-exports at crate root
pub use account::{Account, AccountId, AccountService, AccountStore};
pub use lock::{LockCoordinator, LockPolicy, LockStore};
pub use money::Money;
pub use transfer::{TransferError, TransferOrchestrator, TransferOutcome};
