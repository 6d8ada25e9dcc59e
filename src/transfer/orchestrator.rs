//! Transfer Orchestrator
//!
//! Drives one transfer through its states: take both account locks in
//! canonical order, read and check under the locks, write both rows in one
//! atomic call, then release. Release runs on every path once the locks are
//! held; a release failure is logged and never changes the decided result.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::error::TransferError;
use super::state::TransferState;
use super::types::{TransferId, TransferIntent, TransferOutcome, TransferReceipt};
use crate::account::{Account, AccountStore};
use crate::lock::{LockCoordinator, LockError};
use crate::money::Money;

#[derive(Clone)]
pub struct TransferOrchestrator {
    store: Arc<dyn AccountStore>,
    locks: LockCoordinator,
}

impl TransferOrchestrator {
    pub fn new(store: Arc<dyn AccountStore>, locks: LockCoordinator) -> Self {
        Self { store, locks }
    }

    /// Move `amount` from `source` to `destination`.
    pub async fn transfer(
        &self,
        source: &str,
        destination: &str,
        amount: Money,
    ) -> Result<TransferOutcome, TransferError> {
        self.transfer_with_cancel(source, destination, amount, &CancellationToken::new())
            .await
    }

    /// As [`transfer`](Self::transfer); `cancel` aborts a pending lock wait.
    ///
    /// Invalid requests are rejected here, before any lock is requested.
    pub async fn transfer_with_cancel(
        &self,
        source: &str,
        destination: &str,
        amount: Money,
        cancel: &CancellationToken,
    ) -> Result<TransferOutcome, TransferError> {
        let intent = TransferIntent::new(source, destination, amount).inspect_err(|e| {
            debug!(source, destination, amount = %amount, error = %e, "transfer rejected");
        })?;
        self.execute(&intent, cancel).await
    }

    /// Execute a validated intent.
    pub async fn execute(
        &self,
        intent: &TransferIntent,
        cancel: &CancellationToken,
    ) -> Result<TransferOutcome, TransferError> {
        let transfer_id = TransferId::generate();
        let span = info_span!(
            "transfer",
            transfer_id = %transfer_id,
            source = %intent.source(),
            destination = %intent.destination(),
            amount = %intent.amount(),
        );
        self.execute_inner(transfer_id, intent, cancel)
            .instrument(span)
            .await
    }

    async fn execute_inner(
        &self,
        transfer_id: TransferId,
        intent: &TransferIntent,
        cancel: &CancellationToken,
    ) -> Result<TransferOutcome, TransferError> {
        let mut state = TransferState::Start;

        let handle = match self.locks.acquire_ordered(intent.lock_keys(), cancel).await {
            Ok(handle) => handle,
            Err(e) => {
                match &e {
                    LockError::Timeout { .. } => warn!(error = %e, "lock contention"),
                    LockError::Cancelled => info!("transfer cancelled before locks were held"),
                    _ => error!(error = %e, "lock acquisition failed"),
                }
                return Err(e.into());
            }
        };
        advance(&mut state, TransferState::LocksAcquired);

        let result = self.apply_locked(transfer_id, intent, &mut state).await;

        if let Err(e) = self.locks.release(handle).await {
            // Keys that failed to release expire on their own.
            error!(error = %e, "lock release failed after transfer");
        }
        advance(&mut state, TransferState::Released);
        debug_assert!(state.is_terminal());

        match &result {
            Ok(outcome @ TransferOutcome::Completed(_)) => info!(code = outcome.code(), "transfer completed"),
            Ok(outcome) => info!(code = outcome.code(), "transfer declined"),
            Err(e) => error!(code = e.code(), error = %e, "transfer failed"),
        }
        result
    }

    /// Steps run while both locks are held. Every read happens after
    /// acquisition; nothing read before it is trusted.
    async fn apply_locked(
        &self,
        transfer_id: TransferId,
        intent: &TransferIntent,
        state: &mut TransferState,
    ) -> Result<TransferOutcome, TransferError> {
        let Some(source) = self.store.read(intent.source()).await? else {
            return Ok(TransferOutcome::SourceNotFound);
        };

        if source.balance < intent.amount() {
            return Ok(TransferOutcome::InsufficientFunds {
                available: source.balance,
                requested: intent.amount(),
            });
        }

        let Some(destination) = self.store.read(intent.destination()).await? else {
            return Ok(TransferOutcome::DestinationNotFound);
        };
        advance(state, TransferState::Validated);

        let (source, destination) = debit_credit(source, destination, intent.amount())?;

        // A failed pair write is not re-read or retried.
        self.store.write_pair(&source, &destination).await?;
        advance(state, TransferState::Committed);

        Ok(TransferOutcome::Completed(TransferReceipt {
            transfer_id,
            source_account_id: source.account_id.to_string(),
            source_balance: source.balance,
            destination_account_id: destination.account_id.to_string(),
            destination_balance: destination.balance,
            amount: intent.amount(),
            completed_at: Utc::now(),
        }))
    }
}

/// New balances for both sides, or `Overflow` with neither changed.
fn debit_credit(
    mut source: Account,
    mut destination: Account,
    amount: Money,
) -> Result<(Account, Account), TransferError> {
    let debited = source
        .balance
        .checked_sub(amount)
        .ok_or(TransferError::Overflow)?;
    let credited = destination
        .balance
        .checked_add(amount)
        .ok_or(TransferError::Overflow)?;

    let now = Utc::now();
    source.balance = debited;
    source.updated_at = now;
    destination.balance = credited;
    destination.updated_at = now;
    Ok((source, destination))
}

fn advance(state: &mut TransferState, next: TransferState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal transfer transition {} -> {}",
        state,
        next
    );
    debug!(from = %state, to = %next, "transfer state");
    *state = next;
}
