//! Account-to-account transfers
//!
//! # Flow
//!
//! ```text
//! START → LOCKS_ACQUIRED → VALIDATED → COMMITTED → RELEASED
//! ```
//!
//! 1. Validate ids, `source != destination`, `amount > 0` (no lock yet)
//! 2. Acquire `lock:update_account:<id>` for both accounts in sorted order
//! 3. Read source, check funds, read destination
//! 4. Write both rows in one atomic call
//! 5. Release both locks, whatever happened in 3-4
//!
//! # Safety Invariants
//!
//! 1. **Lock-then-read**: balances are only read and written under both locks
//! 2. **Canonical order**: lock keys are always acquired sorted, so opposite
//!    transfers cannot deadlock
//! 3. **All-or-nothing**: both balances change or neither does
//! 4. **No write retry**: a failed pair write is reported, never replayed

pub mod error;
pub mod orchestrator;
pub mod state;
pub mod types;


pub use error::TransferError;
pub use orchestrator::TransferOrchestrator;
pub use state::TransferState;
pub use types::{TransferId, TransferIntent, TransferOutcome, TransferReceipt};
