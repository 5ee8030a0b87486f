//! Shared helpers for the behavioral specs

pub use std::time::Duration;
pub use tollgate_core::clock::FakeClock;
pub use tollgate_core::config::ProtocolPolicies;
pub use tollgate_core::protocol::{
    AcquireConfig, AcquireMachine, AcquireState, ReaperConfig, ReaperMachine, ReaperState,
    ReleaseConfig, ReleaseMachine, ReleaseState,
};
pub use tollgate_core::record::OwnerToken;
pub use tollgate_engine::{
    drive, ExecutionId, Orchestrator, ReaperTrigger, TerminalStatus, TerminationSignal, WorkError,
};
pub use tollgate_store::{FaultyStore, MemoryStore, SemaphoreStore};

pub fn owner(n: u32) -> OwnerToken {
    OwnerToken::new(format!("exec-{n}"))
}

pub fn execution(n: u32) -> ExecutionId {
    ExecutionId::new(format!("exec-{n}"))
}

/// Acquire config with millisecond-scale policies
pub fn acquire_config(semaphore: &str, limit: u32) -> AcquireConfig {
    let policies = ProtocolPolicies::for_testing();
    AcquireConfig::new(semaphore, limit)
        .with_transient(policies.acquire_transient)
        .with_saturation(policies.saturation)
}

pub fn release_config(semaphore: &str) -> ReleaseConfig {
    ReleaseConfig::new(semaphore).with_transient(ProtocolPolicies::for_testing().release_transient)
}

pub fn reaper_config(semaphore: &str) -> ReaperConfig {
    ReaperConfig::new(semaphore).with_retry(ProtocolPolicies::for_testing().reaper)
}

/// Drive an acquire for `owner(n)` to completion, panicking on failure
pub async fn acquire<S: SemaphoreStore>(store: &S, semaphore: &str, limit: u32, n: u32) {
    let machine = AcquireMachine::new(acquire_config(semaphore, limit), owner(n));
    let terminal = drive(machine, store, &FakeClock::new()).await.unwrap();
    assert_eq!(terminal.state, AcquireState::Acquired);
}

/// Drive a release for `owner(n)` to completion, panicking on failure
pub async fn release<S: SemaphoreStore>(store: &S, semaphore: &str, n: u32) {
    let machine = ReleaseMachine::new(release_config(semaphore), owner(n));
    let terminal = drive(machine, store, &FakeClock::new()).await.unwrap();
    assert_eq!(terminal.state, ReleaseState::Released);
}
