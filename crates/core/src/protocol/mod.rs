// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol state machines for the distributed semaphore
//!
//! This module provides:
//! - **Acquire** - conditional increment-and-claim with lazy record
//!   initialization, idempotent re-entry, and saturation polling
//! - **Release** - conditional decrement-and-unclaim that treats a missing
//!   entry as success
//! - **Reaper** - out-of-band cleanup for permits orphaned by abnormally
//!   terminated executions
//!
//! Each machine is an enum of states plus a pure transition function; the
//! engine loop executes the requested effects and feeds the outcome back in.

pub mod acquire;
pub mod reaper;
pub mod release;

use crate::clock::Clock;
use crate::effect::{Effect, StoreOutcome};

/// Inputs that drive protocol machines
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolInput {
    /// Kick off the protocol from its idle state
    Start,
    /// Outcome of the previously requested store command
    Store(StoreOutcome),
    /// The previously requested wait has elapsed
    WaitElapsed,
}

/// Where a machine currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolStatus {
    Running,
    Succeeded,
    Failed(String),
}

/// A protocol state machine drivable by the engine loop
pub trait Protocol: Sized + Clone + Send {
    /// Pure state transition
    fn transition(&self, input: ProtocolInput, clock: &impl Clock) -> (Self, Vec<Effect>);

    /// Terminal-state inspection
    fn status(&self) -> ProtocolStatus;

    /// Short name for logging
    fn name(&self) -> &'static str;
}

pub use acquire::{AcquireConfig, AcquireMachine, AcquireState};
pub use reaper::{ReaperConfig, ReaperMachine, ReaperState};
pub use release::{ReleaseConfig, ReleaseMachine, ReleaseState};
