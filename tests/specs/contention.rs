//! Contention specs
//!
//! Verify the at-most-limit guarantee when more executions want permits
//! than the semaphore allows.

use crate::prelude::*;

#[tokio::test]
async fn first_acquire_creates_the_record_on_demand() {
    let store = MemoryStore::new();

    acquire(&store, "builds", 5, 1).await;

    let record = store.record("builds").unwrap();
    assert_eq!(record.count, 1);
    assert!(record.holds(&owner(1)));
}

#[tokio::test]
async fn claims_are_rejected_at_exactly_the_limit() {
    let store = MemoryStore::new();

    acquire(&store, "builds", 2, 1).await;
    acquire(&store, "builds", 2, 2).await;
    assert_eq!(store.record("builds").unwrap().count, 2);

    // Third claim saturates; a release lets it through
    let blocked_store = store.clone();
    let blocked = tokio::spawn(async move {
        acquire(&blocked_store, "builds", 2, 3).await;
    });
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(store.record("builds").unwrap().count, 2);

    release(&store, "builds", 1).await;
    blocked.await.unwrap();

    let record = store.record("builds").unwrap();
    assert_eq!(record.count, 2);
    assert!(record.holds(&owner(3)));
    assert!(!record.holds(&owner(1)));
}

#[tokio::test]
async fn six_contenders_for_five_permits_all_eventually_run() {
    let store = MemoryStore::new();
    let mut contenders = Vec::new();

    for n in 1..=6 {
        let store = store.clone();
        contenders.push(tokio::spawn(async move {
            acquire(&store, "builds", 5, n).await;
            tokio::time::sleep(Duration::from_millis(3)).await;
            release(&store, "builds", n).await;
        }));
    }
    for contender in contenders {
        contender.await.unwrap();
    }

    let record = store.record("builds").unwrap();
    assert_eq!(record.count, 0);
    assert!(record.owners.is_empty());
    assert!(store.peak_owners("builds") <= 5);
}

#[tokio::test]
async fn saturated_acquire_fails_once_the_wait_budget_is_spent() {
    let store = MemoryStore::new();
    acquire(&store, "builds", 1, 1).await;

    // Never released: the waiter polls until its budget runs out
    let config = acquire_config("builds", 1);
    let machine = AcquireMachine::new(config, owner(2));
    let err = drive(machine, &store, &FakeClock::new()).await.unwrap_err();

    assert!(err.to_string().contains("saturated"));
    let record = store.record("builds").unwrap();
    assert_eq!(record.count, 1);
    assert!(!record.holds(&owner(2)));
}

#[tokio::test]
async fn independent_semaphores_do_not_interfere() {
    let store = MemoryStore::new();

    acquire(&store, "builds", 1, 1).await;
    acquire(&store, "deploys", 1, 2).await;

    assert_eq!(store.record("builds").unwrap().count, 1);
    assert_eq!(store.record("deploys").unwrap().count, 1);
}
