//! Load specs
//!
//! Drive the harness against one semaphore and check the protected
//! section's occupancy against the limit.

use crate::prelude::*;
use tollgate_core::token::SequentialTokenGen;
use tollgate_engine::{Harness, HarnessConfig};

#[tokio::test]
async fn ten_executions_through_three_permits_stay_within_the_limit() {
    let store = MemoryStore::new();
    let config = HarnessConfig::new("builds", 3, 10)
        .with_hold(Duration::from_millis(5))
        .with_policies(ProtocolPolicies::for_testing());
    let harness = Harness::new(
        store.clone(),
        FakeClock::new(),
        SequentialTokenGen::new("load"),
        config,
    );

    let report = harness.run().await;

    assert_eq!(report.completed, 10);
    assert_eq!(report.failed, 0);
    assert!(
        report.peak_concurrency <= 3,
        "observed peak {}",
        report.peak_concurrency
    );
    assert!(store.peak_owners("builds") <= 3);
    assert_eq!(store.record("builds").unwrap().count, 0);
}

#[tokio::test]
async fn the_limit_is_held_even_with_an_unreliable_store() {
    let store = FaultyStore::new(MemoryStore::new());
    store.inner().seed("builds");
    store.fail_next(4);

    let config = HarnessConfig::new("builds", 2, 6)
        .with_hold(Duration::from_millis(3))
        .with_policies(ProtocolPolicies::for_testing());
    let harness = Harness::new(
        store.clone(),
        FakeClock::new(),
        SequentialTokenGen::new("load"),
        config,
    );

    let report = harness.run().await;

    assert_eq!(report.completed, 6);
    assert!(store.inner().peak_owners("builds") <= 2);
    assert_eq!(store.inner().record("builds").unwrap().count, 0);
}
