use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::account::{AccountService, AccountStore};
use crate::lock::LockStore;
use crate::transfer::TransferOrchestrator;

/// Shared gateway state
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub transfers: Arc<TransferOrchestrator>,
    /// Probed by `/health`
    pub account_store: Arc<dyn AccountStore>,
    /// Probed by `/health`
    pub lock_store: Arc<dyn LockStore>,
    /// Cancelled on shutdown; pending lock waits observe it
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire services over the two stores.
    pub fn new(
        account_store: Arc<dyn AccountStore>,
        lock_store: Arc<dyn LockStore>,
        transfers: TransferOrchestrator,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            accounts: Arc::new(AccountService::new(account_store.clone())),
            transfers: Arc::new(transfers),
            account_store,
            lock_store,
            shutdown,
        }
    }
}
