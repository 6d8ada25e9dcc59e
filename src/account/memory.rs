//! In-process account store
//!
//! Backs `api --in-memory` and the test harnesses. Latency and write failures
//! can be injected to widen race windows and exercise failure exits.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::models::Account;
use super::store::{AccountStore, StoreError};
use super::validation::{AccountId, ValidationError};
use crate::money::Money;

#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<AccountId, Account>>,
    latency_us: AtomicU64,
    fail_writes: AtomicBool,
    read_count: AtomicUsize,
    pair_write_count: AtomicUsize,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay applied before every store operation.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_us
            .store(latency.as_micros() as u64, Ordering::SeqCst);
    }

    /// Make `write_single` / `write_pair` fail with a database error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Seed an account directly, bypassing latency and duplicate checks.
    pub fn insert(&self, account_id: &str, balance: Money) -> Result<AccountId, ValidationError> {
        let id = AccountId::new(account_id)?;
        self.lock()
            .insert(id.clone(), Account::new(id.clone(), balance));
        Ok(id)
    }

    pub fn balance_of(&self, account_id: &str) -> Option<Money> {
        let id = AccountId::new(account_id).ok()?;
        self.lock().get(&id).map(|a| a.balance)
    }

    /// Sum of all balances.
    pub fn total(&self) -> i128 {
        self.lock()
            .values()
            .map(|a| a.balance.minor_units() as i128)
            .sum()
    }

    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }

    pub fn pair_write_count(&self) -> usize {
        self.pair_write_count.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<AccountId, Account>> {
        // A panic while holding the map leaves it consistent; keep serving.
        self.accounts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn simulate_latency(&self) {
        let us = self.latency_us.load(Ordering::SeqCst);
        if us > 0 {
            tokio::time::sleep(Duration::from_micros(us)).await;
        }
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database("injected write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn read(&self, account_id: &AccountId) -> Result<Option<Account>, StoreError> {
        self.simulate_latency().await;
        self.read_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.lock().get(account_id).cloned())
    }

    async fn write_single(&self, account: &Account) -> Result<(), StoreError> {
        self.simulate_latency().await;
        self.check_writable()?;

        let mut accounts = self.lock();
        let row = accounts
            .get_mut(&account.account_id)
            .ok_or_else(|| StoreError::NotFound(account.account_id.to_string()))?;
        row.balance = account.balance;
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn write_pair(&self, first: &Account, second: &Account) -> Result<(), StoreError> {
        self.simulate_latency().await;
        self.pair_write_count.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;

        // Both presence checks happen under the same guard as both writes.
        let mut accounts = self.lock();
        for account in [first, second] {
            if !accounts.contains_key(&account.account_id) {
                return Err(StoreError::NotFound(account.account_id.to_string()));
            }
        }
        let now = Utc::now();
        for account in [first, second] {
            if let Some(row) = accounts.get_mut(&account.account_id) {
                row.balance = account.balance;
                row.updated_at = now;
            }
        }
        Ok(())
    }

    async fn create(&self, account: &Account) -> Result<(), StoreError> {
        self.simulate_latency().await;
        self.check_writable()?;

        let mut accounts = self.lock();
        if accounts.contains_key(&account.account_id) {
            return Err(StoreError::AlreadyExists(account.account_id.to_string()));
        }
        accounts.insert(account.account_id.clone(), account.clone());
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
