//! Recovery specs
//!
//! Permits left behind by failed, timed-out, or aborted executions must be
//! returned by the reaper, never by the failing execution itself.

use crate::prelude::*;
use tokio::sync::mpsc;

#[tokio::test]
async fn reaper_returns_the_permit_of_a_dead_execution() {
    let store = MemoryStore::new();
    acquire(&store, "builds", 5, 1).await;

    let machine = ReaperMachine::new(reaper_config("builds"), owner(1));
    let terminal = drive(machine, &store, &FakeClock::new()).await.unwrap();

    assert_eq!(terminal.state, ReaperState::Reaped);
    let record = store.record("builds").unwrap();
    assert_eq!(record.count, 0);
    assert!(record.owners.is_empty());
}

#[tokio::test]
async fn reaper_leaves_other_holders_alone() {
    let store = MemoryStore::new();
    acquire(&store, "builds", 5, 1).await;
    acquire(&store, "builds", 5, 2).await;

    let machine = ReaperMachine::new(reaper_config("builds"), owner(1));
    drive(machine, &store, &FakeClock::new()).await.unwrap();

    let record = store.record("builds").unwrap();
    assert_eq!(record.count, 1);
    assert!(record.holds(&owner(2)));
    assert!(!record.holds(&owner(1)));
}

#[tokio::test]
async fn reaper_retries_through_transient_outages() {
    let store = FaultyStore::new(MemoryStore::new());
    store.inner().seed("builds");
    acquire(&store, "builds", 5, 1).await;
    store.fail_next(3);

    let machine = ReaperMachine::new(reaper_config("builds"), owner(1));
    let terminal = drive(machine, &store, &FakeClock::new()).await.unwrap();

    assert_eq!(terminal.state, ReaperState::Reaped);
    assert_eq!(store.inner().record("builds").unwrap().count, 0);
}

#[tokio::test]
async fn failed_work_is_cleaned_up_by_the_trigger_not_in_band() {
    let store = MemoryStore::new();
    let clock = FakeClock::new();
    let policies = ProtocolPolicies::for_testing();
    let (signals, trigger) = ReaperTrigger::spawn(store.clone(), clock.clone(), policies.clone());
    let orchestrator =
        Orchestrator::new(store.clone(), clock, signals).with_policies(policies);

    let result = orchestrator
        .run(&execution(1), "builds", 5, || async {
            Err::<(), _>(WorkError::new("build broke"))
        })
        .await;
    assert!(result.is_err());

    drop(orchestrator);
    trigger.shutdown().await;

    // The trigger reaped what the failing execution left behind
    let record = store.record("builds").unwrap();
    assert_eq!(record.count, 0);
    assert!(record.owners.is_empty());
}

#[tokio::test]
async fn timed_out_work_is_reaped_and_the_slot_reusable() {
    let store = MemoryStore::new();
    let clock = FakeClock::new();
    let policies = ProtocolPolicies::for_testing();
    let (signals, trigger) = ReaperTrigger::spawn(store.clone(), clock.clone(), policies.clone());
    let orchestrator = Orchestrator::new(store.clone(), clock, signals)
        .with_policies(policies)
        .with_work_deadline(Duration::from_millis(5));

    let result = orchestrator
        .run(&execution(1), "builds", 1, || async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
    assert!(result.is_err());

    drop(orchestrator);
    trigger.shutdown().await;

    // The reaped slot is immediately claimable again
    acquire(&store, "builds", 1, 2).await;
    assert_eq!(store.record("builds").unwrap().count, 1);
}

#[tokio::test]
async fn externally_aborted_executions_can_be_reaped_by_signal() {
    let store = MemoryStore::new();
    acquire(&store, "builds", 5, 7).await;

    let (tx, trigger) = ReaperTrigger::spawn(
        store.clone(),
        FakeClock::new(),
        ProtocolPolicies::for_testing(),
    );
    tx.send(TerminationSignal {
        execution: execution(7),
        semaphore: "builds".to_string(),
        status: TerminalStatus::Aborted,
    })
    .unwrap();
    drop(tx);
    trigger.shutdown().await;

    assert_eq!(store.record("builds").unwrap().count, 0);
}

#[tokio::test]
async fn successful_executions_release_in_band() {
    let store = MemoryStore::new();
    let clock = FakeClock::new();
    let policies = ProtocolPolicies::for_testing();
    let (signals, rx) = mpsc::unbounded_channel::<TerminationSignal>();
    let orchestrator =
        Orchestrator::new(store.clone(), clock, signals).with_policies(policies);

    orchestrator
        .run(&execution(1), "builds", 5, || async { Ok(()) })
        .await
        .unwrap();

    // Released before any reaper ran
    drop(rx);
    assert_eq!(store.record("builds").unwrap().count, 0);
}
