use super::*;
use crate::memory::MemoryStore;
use tollgate_core::clock::{Clock, FakeClock};

fn owner(n: u32) -> OwnerToken {
    OwnerToken::new(format!("exec-{n}"))
}

#[tokio::test]
async fn fail_next_blocks_calls_before_the_inner_store() {
    let store = FaultyStore::new(MemoryStore::new());
    store.fail_next(1);

    let err = store.init_record("builds").await.unwrap_err();

    assert!(matches!(err, StoreError::Unavailable(_)));
    // The inner store never saw the insert
    assert!(store.inner().record("builds").is_none());

    // Budget spent: the next call goes through
    store.init_record("builds").await.unwrap();
    assert!(store.inner().record("builds").is_some());
}

#[tokio::test]
async fn lost_write_applies_but_reports_unavailable() {
    let store = FaultyStore::new(MemoryStore::new());
    let clock = FakeClock::new();
    store.init_record("builds").await.unwrap();

    store.lose_next_writes(1);
    let err = store
        .claim_permit("builds", 5, &owner(1), clock.now())
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Unavailable(_)));
    // The write landed despite the lost response
    let record = store.inner().record("builds").unwrap();
    assert_eq!(record.count, 1);
    assert!(record.holds(&owner(1)));
}

#[tokio::test]
async fn calls_are_recorded_in_order() {
    let store = FaultyStore::new(MemoryStore::new());
    let clock = FakeClock::new();

    store.init_record("builds").await.unwrap();
    store
        .claim_permit("builds", 5, &owner(1), clock.now())
        .await
        .unwrap();
    store.read_owners("builds").await.unwrap();
    store.release_permit("builds", &owner(1)).await.unwrap();

    assert_eq!(
        store.calls(),
        vec![
            StoreCall::Init {
                semaphore: "builds".to_string()
            },
            StoreCall::Claim {
                semaphore: "builds".to_string(),
                owner: owner(1)
            },
            StoreCall::ReadOwners {
                semaphore: "builds".to_string()
            },
            StoreCall::Release {
                semaphore: "builds".to_string(),
                owner: owner(1)
            },
        ]
    );
}

#[tokio::test]
async fn inner_errors_pass_through_unchanged() {
    let store = FaultyStore::new(MemoryStore::new());
    let clock = FakeClock::new();

    let err = store
        .claim_permit("builds", 5, &owner(1), clock.now())
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::RecordMissing(_)));
}
