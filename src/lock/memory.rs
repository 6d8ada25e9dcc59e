//! In-process LockStore
//!
//! Same contract as the Redis store, held in a mutex-guarded map. Used by
//! `api --in-memory` (single process) and by tests, which can inject latency,
//! connectivity failures and per-key release failures.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::key::{LockKey, LockToken};
use super::store::{LockStore, LockStoreError};

struct Entry {
    token: LockToken,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

#[derive(Default)]
pub struct MemoryLockStore {
    entries: Mutex<HashMap<LockKey, Entry>>,
    latency_us: AtomicU64,
    unavailable: AtomicBool,
    failing_releases: Mutex<HashSet<LockKey>>,
    acquire_attempts: AtomicUsize,
    release_calls: AtomicUsize,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay applied before every store call.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_us
            .store(latency.as_micros() as u64, Ordering::SeqCst);
    }

    /// Make every call fail as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make deletes of `key` fail until cleared.
    pub fn fail_release_of(&self, key: LockKey) {
        self.failing()
            .insert(key);
    }

    pub fn clear_release_failures(&self) {
        self.failing().clear();
    }

    /// Occupy `key` as some other holder would.
    pub fn hold(&self, key: LockKey, ttl: Option<Duration>) -> LockToken {
        let token = LockToken::generate();
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.map().insert(
            key,
            Entry {
                token: token.clone(),
                expires_at,
            },
        );
        token
    }

    pub fn is_held(&self, key: &LockKey) -> bool {
        let now = Instant::now();
        self.map().get(key).is_some_and(|e| e.is_live(now))
    }

    /// Keys currently held (live entries only).
    pub fn held_keys(&self) -> Vec<LockKey> {
        let now = Instant::now();
        let mut keys: Vec<LockKey> = self
            .map()
            .iter()
            .filter(|(_, e)| e.is_live(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn acquire_attempts(&self) -> usize {
        self.acquire_attempts.load(Ordering::SeqCst)
    }

    pub fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<LockKey, Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn failing(&self) -> std::sync::MutexGuard<'_, HashSet<LockKey>> {
        self.failing_releases
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn simulate_latency(&self) {
        let us = self.latency_us.load(Ordering::SeqCst);
        if us > 0 {
            tokio::time::sleep(Duration::from_micros(us)).await;
        }
    }

    fn check_available(&self) -> Result<(), LockStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LockStoreError::Unavailable(
                "injected connectivity failure".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn set_if_absent(
        &self,
        key: &LockKey,
        token: &LockToken,
        ttl: Option<Duration>,
    ) -> Result<bool, LockStoreError> {
        self.simulate_latency().await;
        self.acquire_attempts.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let now = Instant::now();
        let mut entries = self.map();
        if entries.get(key).is_some_and(|e| e.is_live(now)) {
            return Ok(false);
        }
        entries.insert(
            key.clone(),
            Entry {
                token: token.clone(),
                expires_at: ttl.map(|ttl| now + ttl),
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &LockKey, token: &LockToken) -> Result<bool, LockStoreError> {
        self.simulate_latency().await;
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        if self.failing().contains(key) {
            return Err(LockStoreError::Command(format!(
                "injected release failure for {}",
                key
            )));
        }

        let mut entries = self.map();
        match entries.get(key) {
            Some(entry) if entry.token == *token => {
                entries.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn health_check(&self) -> Result<(), LockStoreError> {
        self.check_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountId;

    fn key(id: &str) -> LockKey {
        LockKey::for_account(&AccountId::new(id).unwrap())
    }

    #[tokio::test]
    async fn test_set_if_absent_is_exclusive() {
        let store = MemoryLockStore::new();
        let first = LockToken::generate();
        let second = LockToken::generate();

        assert!(store.set_if_absent(&key("A"), &first, None).await.unwrap());
        assert!(!store.set_if_absent(&key("A"), &second, None).await.unwrap());
        assert!(store.set_if_absent(&key("B"), &second, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_requires_matching_token() {
        let store = MemoryLockStore::new();
        let owner = store.hold(key("A"), None);
        let stranger = LockToken::generate();

        assert!(!store.delete(&key("A"), &stranger).await.unwrap());
        assert!(store.is_held(&key("A")));
        assert!(store.delete(&key("A"), &owner).await.unwrap());
        assert!(!store.is_held(&key("A")));
        // absent key is not an error
        assert!(!store.delete(&key("A"), &owner).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let store = MemoryLockStore::new();
        store.hold(key("A"), Some(Duration::from_millis(50)));
        assert!(store.is_held(&key("A")));

        tokio::time::advance(Duration::from_millis(60)).await;
        assert!(!store.is_held(&key("A")));
        assert!(
            store
                .set_if_absent(&key("A"), &LockToken::generate(), None)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryLockStore::new();
        let token = LockToken::generate();
        store.set_if_absent(&key("A"), &token, None).await.unwrap();

        store.fail_release_of(key("A"));
        assert!(matches!(
            store.delete(&key("A"), &token).await,
            Err(LockStoreError::Command(_))
        ));
        store.clear_release_failures();
        assert!(store.delete(&key("A"), &token).await.unwrap());

        store.set_unavailable(true);
        assert!(matches!(
            store.set_if_absent(&key("A"), &token, None).await,
            Err(LockStoreError::Unavailable(_))
        ));
        assert!(store.health_check().await.is_err());
    }
}
