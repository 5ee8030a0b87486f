//! Idempotency specs
//!
//! Lost responses and replays must never double-count a permit or
//! double-release one.

use crate::prelude::*;

#[tokio::test]
async fn lost_claim_response_never_double_increments() {
    let store = FaultyStore::new(MemoryStore::new());
    store.inner().seed("builds");
    store.lose_next_writes(1);

    acquire(&store, "builds", 5, 1).await;

    let record = store.inner().record("builds").unwrap();
    assert_eq!(record.count, 1);
    assert_eq!(record.owners.len(), 1);
}

#[tokio::test]
async fn reacquire_by_a_token_that_already_holds_is_a_no_op() {
    let store = MemoryStore::new();
    acquire(&store, "builds", 5, 1).await;

    // Same token acquires again, e.g. a retried driver after a crash
    acquire(&store, "builds", 5, 1).await;

    let record = store.record("builds").unwrap();
    assert_eq!(record.count, 1);
    assert_eq!(record.owners.len(), 1);
}

#[tokio::test]
async fn double_release_leaves_other_holders_untouched() {
    let store = MemoryStore::new();
    acquire(&store, "builds", 5, 1).await;
    acquire(&store, "builds", 5, 2).await;

    release(&store, "builds", 1).await;
    release(&store, "builds", 1).await; // replayed; completes as a no-op

    let record = store.record("builds").unwrap();
    assert_eq!(record.count, 1);
    assert!(record.holds(&owner(2)));
}

#[tokio::test]
async fn lost_release_response_retries_to_a_clean_end() {
    let store = FaultyStore::new(MemoryStore::new());
    store.inner().seed("builds");
    acquire(&store, "builds", 5, 1).await;

    store.lose_next_writes(1);
    release(&store, "builds", 1).await;

    // The applied-but-unconfirmed release is observed as already gone on
    // the retry, which counts as success
    let record = store.inner().record("builds").unwrap();
    assert_eq!(record.count, 0);
    assert!(record.owners.is_empty());
}

#[tokio::test]
async fn concurrent_init_collision_resolves_to_one_record() {
    let store = MemoryStore::new();
    let mut racers = Vec::new();

    for n in 1..=4 {
        let store = store.clone();
        racers.push(tokio::spawn(async move {
            acquire(&store, "builds", 5, n).await;
        }));
    }
    for racer in racers {
        racer.await.unwrap();
    }

    let record = store.record("builds").unwrap();
    assert_eq!(record.count, 4);
    assert_eq!(record.owners.len(), 4);
    assert!(record.invariant_holds(5));
}
