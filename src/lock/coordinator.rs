//! Lock Coordinator
//!
//! Acquires the set of locks a multi-account operation needs, in one global
//! order, with bounded polling, and releases them on every exit path.
//!
//! # Deadlock avoidance
//!
//! Keys are sorted (string order) and de-duplicated before the first attempt.
//! Two operations needing `{A, B}` therefore both try `A` first, so neither
//! can hold `B` while waiting for `A`. No fairness is promised: under sustained
//! contention a caller can keep losing the race until its timeout.
//!
//! # Timing
//!
//! Each key is polled every `poll_interval` until `acquire_timeout` (per key)
//! elapses. Callers that need a higher success rate under load raise the
//! timeout, not the poll frequency.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::key::{LockKey, LockToken};
use super::store::{LockStore, LockStoreError};
use crate::config::LockConfig;

// ============================================================================
// Policy
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPolicy {
    /// Sleep between attempts on a held key.
    pub poll_interval: Duration,
    /// Wall-clock budget per key.
    pub acquire_timeout: Duration,
    /// Expiry set on each acquired key; `None` never expires.
    pub lock_ttl: Option<Duration>,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            acquire_timeout: Duration::from_millis(100),
            lock_ttl: Some(Duration::from_secs(5)),
        }
    }
}

impl From<&LockConfig> for LockPolicy {
    fn from(config: &LockConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            acquire_timeout: Duration::from_millis(config.acquire_timeout_ms),
            lock_ttl: (config.lock_ttl_ms > 0).then(|| Duration::from_millis(config.lock_ttl_ms)),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    /// Key still held by someone else at the deadline. Safe to retry.
    #[error("Timed out after {waited_ms}ms waiting for {key}")]
    Timeout { key: String, waited_ms: u64 },

    #[error("Lock acquisition cancelled")]
    Cancelled,

    /// Store unreachable or command failed. A lock may be stuck until expiry.
    #[error("Lock store error on {key}: {source}")]
    Store {
        key: String,
        #[source]
        source: LockStoreError,
    },

    /// Every key was attempted; these failed.
    #[error("Failed to release {} lock(s): {}", .0.len(), describe_failures(.0))]
    Release(Vec<ReleaseFailure>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFailure {
    pub key: String,
    pub error: LockStoreError,
}

fn describe_failures(failures: &[ReleaseFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.key, f.error))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Handle
// ============================================================================

/// Locks held by one `acquire_ordered` call.
///
/// Pass it back to [`LockCoordinator::release`]. A handle dropped without
/// release (task cancelled, panic) schedules a background release so the keys
/// do not wait for expiry.
#[must_use = "locks stay held until the handle is released"]
pub struct LockHandle {
    keys: Vec<LockKey>,
    token: LockToken,
    store: Arc<dyn LockStore>,
}

impl LockHandle {
    /// Held keys, in acquisition order.
    pub fn keys(&self) -> &[LockKey] {
        &self.keys
    }

    pub fn token(&self) -> &LockToken {
        &self.token
    }
}

impl std::fmt::Debug for LockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockHandle")
            .field("keys", &self.keys)
            .field("token", &self.token)
            .field("store", &self.store.name())
            .finish()
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        if self.keys.is_empty() {
            return;
        }
        let mut keys = std::mem::take(&mut self.keys);
        let token = self.token.clone();
        let store = self.store.clone();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!(keys = ?keys, "lock handle dropped while held; releasing in background");
                runtime.spawn(async move {
                    if let Err(failures) = release_keys(store.as_ref(), &mut keys, &token).await {
                        error!(
                            failures = %describe_failures(&failures),
                            "background release failed; keys held until expiry"
                        );
                    }
                });
            }
            Err(_) => {
                error!(keys = ?keys, "lock handle dropped outside a runtime; keys held until expiry");
            }
        }
    }
}

/// Release `keys` in reverse acquisition order, attempting every key.
///
/// A key is removed from `keys` only once its delete has resolved, so if this
/// future is dropped part way the remaining keys are still owned by the caller.
async fn release_keys(
    store: &dyn LockStore,
    keys: &mut Vec<LockKey>,
    token: &LockToken,
) -> Result<(), Vec<ReleaseFailure>> {
    let mut failures = Vec::new();
    while let Some(key) = keys.last() {
        let result = store.delete(key, token).await;
        let Some(key) = keys.pop() else { break };
        match result {
            Ok(true) => debug!(key = %key, "lock released"),
            Ok(false) => warn!(key = %key, "lock already gone at release (expired?)"),
            Err(error) => {
                error!(key = %key, error = %error, "lock release failed");
                failures.push(ReleaseFailure {
                    key: key.to_string(),
                    error,
                });
            }
        }
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures)
    }
}

// ============================================================================
// Coordinator
// ============================================================================

#[derive(Clone)]
pub struct LockCoordinator {
    store: Arc<dyn LockStore>,
    policy: LockPolicy,
}

impl LockCoordinator {
    pub fn new(store: Arc<dyn LockStore>, policy: LockPolicy) -> Self {
        Self { store, policy }
    }

    /// Acquire every key in canonical order using the coordinator's policy.
    pub async fn acquire_ordered(
        &self,
        keys: impl IntoIterator<Item = LockKey>,
        cancel: &CancellationToken,
    ) -> Result<LockHandle, LockError> {
        self.acquire_ordered_with(keys, &self.policy, cancel).await
    }

    /// Acquire every key in canonical order.
    ///
    /// On any failure the keys acquired so far in this call are released
    /// before the error is returned.
    pub async fn acquire_ordered_with(
        &self,
        keys: impl IntoIterator<Item = LockKey>,
        policy: &LockPolicy,
        cancel: &CancellationToken,
    ) -> Result<LockHandle, LockError> {
        let mut ordered: Vec<LockKey> = keys.into_iter().collect();
        ordered.sort();
        ordered.dedup();

        let mut handle = LockHandle {
            keys: Vec::with_capacity(ordered.len()),
            token: LockToken::generate(),
            store: self.store.clone(),
        };

        for key in ordered {
            match self.acquire_one(&key, &handle.token, policy, cancel).await {
                Ok(()) => handle.keys.push(key),
                Err(e) => {
                    if let Err(release_err) = self.release(handle).await {
                        error!(error = %release_err, "failed to release partial acquisition");
                    }
                    return Err(e);
                }
            }
        }

        debug!(keys = ?handle.keys, token = %handle.token, "locks acquired");
        Ok(handle)
    }

    /// Poll one key until acquired, deadline, cancellation or store failure.
    async fn acquire_one(
        &self,
        key: &LockKey,
        token: &LockToken,
        policy: &LockPolicy,
        cancel: &CancellationToken,
    ) -> Result<(), LockError> {
        let started = Instant::now();
        let deadline = started + policy.acquire_timeout;
        let mut attempts: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                debug!(key = %key, attempts, "lock wait cancelled");
                return Err(LockError::Cancelled);
            }

            attempts += 1;
            match self.store.set_if_absent(key, token, policy.lock_ttl).await {
                Ok(true) => {
                    debug!(key = %key, attempts, "lock acquired");
                    return Ok(());
                }
                Ok(false) => {}
                Err(source) => {
                    // Not retried: a store that cannot answer may also be
                    // unable to release, so surface it now.
                    error!(
                        key = %key,
                        store = self.store.name(),
                        error = %source,
                        "lock store failure during acquire"
                    );
                    return Err(LockError::Store {
                        key: key.to_string(),
                        source,
                    });
                }
            }

            let now = Instant::now();
            if now >= deadline {
                let waited_ms = now.duration_since(started).as_millis() as u64;
                debug!(key = %key, attempts, waited_ms, "lock wait timed out");
                return Err(LockError::Timeout {
                    key: key.to_string(),
                    waited_ms,
                });
            }

            let nap = policy.poll_interval.min(deadline - now);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(key = %key, attempts, "lock wait cancelled");
                    return Err(LockError::Cancelled);
                }
                _ = tokio::time::sleep(nap) => {}
            }
        }
    }

    /// Release every key of `handle`, attempting all of them even if some
    /// deletes fail.
    ///
    /// If this future is dropped before it finishes, the keys not yet deleted
    /// stay in the handle and its `Drop` releases them in the background.
    pub async fn release(&self, mut handle: LockHandle) -> Result<(), LockError> {
        let store = handle.store.clone();
        release_keys(store.as_ref(), &mut handle.keys, &handle.token)
            .await
            .map_err(LockError::Release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountId;
    use crate::lock::MemoryLockStore;

    fn key(id: &str) -> LockKey {
        LockKey::for_account(&AccountId::new(id).unwrap())
    }

    fn coordinator(store: &Arc<MemoryLockStore>) -> LockCoordinator {
        LockCoordinator::new(store.clone(), LockPolicy::default())
    }

    #[tokio::test]
    async fn test_acquires_in_sorted_order() {
        let store = Arc::new(MemoryLockStore::new());
        let coord = coordinator(&store);

        let handle = coord
            .acquire_ordered([key("B"), key("A")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(handle.keys(), &[key("A"), key("B")]);
        assert_eq!(store.held_keys(), vec![key("A"), key("B")]);

        coord.release(handle).await.unwrap();
        assert!(store.held_keys().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_keys_are_acquired_once() {
        let store = Arc::new(MemoryLockStore::new());
        let coord = coordinator(&store);

        let handle = coord
            .acquire_ordered([key("A"), key("A")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(handle.keys().len(), 1);
        coord.release(handle).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_releases_partial_acquisition() {
        let store = Arc::new(MemoryLockStore::new());
        let coord = coordinator(&store);
        store.hold(key("B"), None);

        let err = coord
            .acquire_ordered([key("A"), key("B")], &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, LockError::Timeout { ref key, .. } if key == "lock:update_account:B"));
        // A was taken first and must have been given back
        assert!(!store.is_held(&key("A")));
        assert!(store.is_held(&key("B")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_respects_deadline() {
        let store = Arc::new(MemoryLockStore::new());
        let coord = coordinator(&store);
        store.hold(key("A"), None);

        let started = Instant::now();
        let err = coord
            .acquire_ordered([key("A")], &CancellationToken::new())
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, LockError::Timeout { .. }));
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(120));
        // 10ms polling inside a 100ms budget
        assert!(store.acquire_attempts() >= 10 && store.acquire_attempts() <= 12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_release_within_timeout() {
        let store = Arc::new(MemoryLockStore::new());
        let coord = coordinator(&store);
        let other = store.hold(key("A"), None);

        let releaser = {
            let store = store.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(35)).await;
                store.delete(&key("A"), &other).await.unwrap();
            })
        };

        let handle = coord
            .acquire_ordered([key("A")], &CancellationToken::new())
            .await
            .unwrap();
        releaser.await.unwrap();
        coord.release(handle).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_holder_does_not_block() {
        let store = Arc::new(MemoryLockStore::new());
        let coord = coordinator(&store);
        store.hold(key("A"), Some(Duration::from_millis(30)));

        let handle = coord
            .acquire_ordered([key("A")], &CancellationToken::new())
            .await
            .unwrap();
        coord.release(handle).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_exits_promptly_and_releases() {
        let store = Arc::new(MemoryLockStore::new());
        let policy = LockPolicy {
            acquire_timeout: Duration::from_secs(60),
            ..LockPolicy::default()
        };
        let coord = LockCoordinator::new(store.clone(), policy);
        store.hold(key("B"), None);

        let cancel = CancellationToken::new();
        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(25)).await;
                cancel.cancel();
            })
        };

        let started = Instant::now();
        let err = coord
            .acquire_ordered([key("A"), key("B")], &cancel)
            .await
            .unwrap_err();
        canceller.await.unwrap();

        assert_eq!(err, LockError::Cancelled);
        assert!(started.elapsed() < Duration::from_millis(40));
        assert!(!store.is_held(&key("A")));
    }

    #[tokio::test]
    async fn test_already_cancelled_takes_nothing() {
        let store = Arc::new(MemoryLockStore::new());
        let coord = coordinator(&store);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = coord
            .acquire_ordered([key("A")], &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, LockError::Cancelled);
        assert_eq!(store.acquire_attempts(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_not_retried() {
        let store = Arc::new(MemoryLockStore::new());
        let coord = coordinator(&store);
        store.set_unavailable(true);

        let err = coord
            .acquire_ordered([key("A")], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LockError::Store {
                source: LockStoreError::Unavailable(_),
                ..
            }
        ));
        assert_eq!(store.acquire_attempts(), 1);
    }

    #[tokio::test]
    async fn test_release_attempts_every_key() {
        let store = Arc::new(MemoryLockStore::new());
        let coord = coordinator(&store);

        let handle = coord
            .acquire_ordered([key("A"), key("B")], &CancellationToken::new())
            .await
            .unwrap();
        // B is released first (reverse order) and fails; A must still go.
        store.fail_release_of(key("B"));

        let err = coord.release(handle).await.unwrap_err();
        match err {
            LockError::Release(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].key, "lock:update_account:B");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!store.is_held(&key("A")));
        assert!(store.is_held(&key("B")));
    }

    #[tokio::test]
    async fn test_release_does_not_touch_foreign_holder() {
        let store = Arc::new(MemoryLockStore::new());
        let coord = coordinator(&store);

        let handle = coord
            .acquire_ordered([key("A")], &CancellationToken::new())
            .await
            .unwrap();
        // Simulate expiry + takeover by another holder.
        let _ = store.delete(&key("A"), handle.token()).await.unwrap();
        store.hold(key("A"), None);

        coord.release(handle).await.unwrap();
        assert!(store.is_held(&key("A")));
    }

    #[tokio::test]
    async fn test_dropped_handle_releases_in_background() {
        let store = Arc::new(MemoryLockStore::new());
        let coord = coordinator(&store);

        let handle = coord
            .acquire_ordered([key("A"), key("B")], &CancellationToken::new())
            .await
            .unwrap();
        drop(handle);

        for _ in 0..100 {
            if store.held_keys().is_empty() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("dropped handle did not release its keys");
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupted_release_hands_keys_to_background() {
        let store = Arc::new(MemoryLockStore::new());
        let policy = LockPolicy {
            lock_ttl: None,
            ..LockPolicy::default()
        };
        let coord = LockCoordinator::new(store.clone(), policy);

        let handle = coord
            .acquire_ordered([key("A"), key("B")], &CancellationToken::new())
            .await
            .unwrap();
        store.set_latency(Duration::from_millis(20));

        // Caller gives up while the first delete is still in flight.
        let interrupted =
            tokio::time::timeout(Duration::from_millis(5), coord.release(handle)).await;
        assert!(interrupted.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(store.held_keys().is_empty());
        assert_eq!(store.release_calls(), 2);
    }

    #[test]
    fn test_policy_from_config() {
        let config = LockConfig {
            poll_interval_ms: 5,
            acquire_timeout_ms: 250,
            lock_ttl_ms: 0,
        };
        let policy = LockPolicy::from(&config);
        assert_eq!(policy.poll_interval, Duration::from_millis(5));
        assert_eq!(policy.acquire_timeout, Duration::from_millis(250));
        assert_eq!(policy.lock_ttl, None);
    }
}
