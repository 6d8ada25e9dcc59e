//! Concurrency properties of the transfer path, run against the in-process
//! stores with injected store latency so that lock overlap actually happens.

use std::sync::Arc;
use std::time::{Duration, Instant};

use account_transfer::account::MemoryAccountStore;
use account_transfer::lock::{LockCoordinator, LockPolicy, MemoryLockStore};
use account_transfer::{Money, TransferOrchestrator, TransferOutcome};

struct Fixture {
    orchestrator: Arc<TransferOrchestrator>,
    accounts: Arc<MemoryAccountStore>,
    locks: Arc<MemoryLockStore>,
}

fn fixture(policy: LockPolicy, latency: Duration) -> Fixture {
    let accounts = Arc::new(MemoryAccountStore::new());
    let locks = Arc::new(MemoryLockStore::new());
    accounts.set_latency(latency);
    let orchestrator = Arc::new(TransferOrchestrator::new(
        accounts.clone(),
        LockCoordinator::new(locks.clone(), policy),
    ));
    Fixture {
        orchestrator,
        accounts,
        locks,
    }
}

fn generous() -> LockPolicy {
    LockPolicy {
        acquire_timeout: Duration::from_secs(5),
        ..LockPolicy::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn opposite_transfers_complete_with_order_independent_result() {
    let f = fixture(generous(), Duration::from_millis(5));
    f.accounts.insert("A", Money::from_major(1000)).unwrap();
    f.accounts.insert("B", Money::from_major(1000)).unwrap();

    let ab = {
        let o = f.orchestrator.clone();
        tokio::spawn(async move { o.transfer("A", "B", Money::from_major(200)).await })
    };
    let ba = {
        let o = f.orchestrator.clone();
        tokio::spawn(async move { o.transfer("B", "A", Money::from_major(300)).await })
    };

    assert!(ab.await.unwrap().unwrap().is_completed());
    assert!(ba.await.unwrap().unwrap().is_completed());
    assert_eq!(f.accounts.balance_of("A"), Some(Money::from_major(1100)));
    assert_eq!(f.accounts.balance_of("B"), Some(Money::from_major(900)));
    assert!(f.locks.held_keys().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn disjoint_transfers_run_in_parallel() {
    let latency = Duration::from_millis(50);
    let f = fixture(generous(), latency);
    for id in ["A", "B", "C", "D"] {
        f.accounts.insert(id, Money::from_major(1000)).unwrap();
    }

    let started = Instant::now();
    let ab = {
        let o = f.orchestrator.clone();
        tokio::spawn(async move { o.transfer("A", "B", Money::from_major(100)).await })
    };
    let cd = {
        let o = f.orchestrator.clone();
        tokio::spawn(async move { o.transfer("C", "D", Money::from_major(100)).await })
    };
    assert!(ab.await.unwrap().unwrap().is_completed());
    assert!(cd.await.unwrap().unwrap().is_completed());
    let elapsed = started.elapsed();

    // Each transfer does three store calls (2 reads + 1 pair write). Serialized
    // they would need at least 6 latencies.
    assert!(
        elapsed < latency * 6,
        "disjoint transfers appear serialized: {:?}",
        elapsed
    );
    assert_eq!(f.accounts.balance_of("B"), Some(Money::from_major(1100)));
    assert_eq!(f.accounts.balance_of("D"), Some(Money::from_major(1100)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn contended_transfers_terminate_and_conserve_money() {
    // Default 100ms per-key timeout: some transfers may lose on contention,
    // but none may hang and the total must be unchanged.
    let policy = LockPolicy::default();
    let f = fixture(policy, Duration::from_millis(2));
    let ids = ["A", "B", "C"];
    for id in ids {
        f.accounts.insert(id, Money::from_major(500)).unwrap();
    }
    let total = f.accounts.total();

    let mut tasks = Vec::new();
    for i in 0..30usize {
        let o = f.orchestrator.clone();
        let src = ids[i % 3];
        let dst = ids[(i + 1 + i / 3 % 2) % 3];
        tasks.push(tokio::spawn(async move {
            o.transfer(src, dst, Money::from_major(1)).await
        }));
    }

    let bound = policy.acquire_timeout * 2 + Duration::from_secs(5);
    let results = tokio::time::timeout(bound, futures::future::join_all(tasks))
        .await
        .expect("transfers did not terminate");

    let mut completed = 0;
    for result in results {
        match result.unwrap() {
            Ok(TransferOutcome::Completed(_)) => completed += 1,
            Ok(other) => panic!("unexpected outcome {other:?}"),
            Err(e) => assert!(e.is_retryable(), "non-contention failure: {e}"),
        }
    }
    assert!(completed > 0);
    assert_eq!(f.accounts.total(), total);
    assert!(f.locks.held_keys().is_empty());
}

#[tokio::test]
async fn insufficient_funds_is_an_outcome_not_an_error() {
    let f = fixture(LockPolicy::default(), Duration::ZERO);
    f.accounts.insert("A", Money::from_major(1000)).unwrap();
    f.accounts.insert("B", Money::from_major(500)).unwrap();

    let outcome = f
        .orchestrator
        .transfer("A", "B", Money::from_major(2000))
        .await
        .unwrap();
    assert!(matches!(outcome, TransferOutcome::InsufficientFunds { .. }));
    assert_eq!(f.accounts.balance_of("A"), Some(Money::from_major(1000)));
    assert_eq!(f.accounts.balance_of("B"), Some(Money::from_major(500)));
}
