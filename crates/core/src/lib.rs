// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tollgate-core: core library for the tollgate distributed semaphore
//!
//! This crate provides:
//! - Pure state machines for the acquire, release, and reaper protocols
//! - The semaphore record data model and its invariants
//! - Retry/backoff policies as explicit configuration
//! - Effects and events for driving the machines from an engine loop

pub mod clock;
pub mod token;

pub mod config;
pub mod effect;
pub mod protocol;
pub mod record;
pub mod retry;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, ProtocolPolicies};
pub use effect::{Effect, Event, StoreCommand, StoreOutcome};
pub use record::{OwnerToken, SemaphoreRecord};
pub use retry::{RetryPolicy, WaitPolicy};
pub use token::{SequentialTokenGen, TokenGen, UuidTokenGen};

// Re-export protocol machines
pub use protocol::{
    AcquireConfig, AcquireMachine, AcquireState, Protocol, ProtocolInput, ProtocolStatus,
    ReaperConfig, ReaperMachine, ReaperState, ReleaseConfig, ReleaseMachine, ReleaseState,
};
