// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects and events for protocol orchestration
//!
//! State machines never touch the store themselves: they request effects,
//! and the engine loop executes them and feeds the outcome back in.

use crate::record::OwnerToken;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

/// A store operation requested by a state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCommand {
    /// Conditional increment-and-claim: `count += 1`,
    /// `owners[owner] = acquired_at`, guarded by `count != limit` and the
    /// owner not already being present
    ClaimPermit {
        semaphore: String,
        limit: u32,
        owner: OwnerToken,
        acquired_at: DateTime<Utc>,
    },
    /// Conditional insert of a fresh empty record, guarded by absence
    InitRecord { semaphore: String },
    /// Conditional decrement-and-unclaim, guarded by owner presence
    ReleasePermit {
        semaphore: String,
        owner: OwnerToken,
    },
    /// Consistency-guaranteed read projected to the owners map
    ReadOwners { semaphore: String },
}

/// Outcome of a store command, fed back into the machine as input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The conditional write applied
    Applied,
    /// The server-side condition rejected the write
    ConditionFailed,
    /// No record exists under this name
    RecordMissing,
    /// Insert collided with a record another execution created first
    RecordExists,
    /// The projected owners map from a consistent read
    Owners(BTreeMap<OwnerToken, DateTime<Utc>>),
    /// Transient store failure; retryable
    Unavailable(String),
}

/// Effects are side effects that state machines request
///
/// A transition emits at most one driving effect (`Store` or `Wait`) plus
/// any number of `Emit`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Execute a store operation
    Store(StoreCommand),
    /// Suspend cooperatively, then resume with `WaitElapsed`
    Wait(Duration),
    /// Emit an event for observers
    Emit(Event),
}

/// Events emitted by the protocol machines
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Event {
    // Acquire events
    RecordInitialized {
        semaphore: String,
    },
    PermitAcquired {
        semaphore: String,
        owner: OwnerToken,
    },
    /// A prior claim applied but the response was lost; re-entry succeeded
    /// without a second increment
    PermitAlreadyHeld {
        semaphore: String,
        owner: OwnerToken,
    },
    SemaphoreSaturated {
        semaphore: String,
        owner: OwnerToken,
        waits: u32,
    },
    AcquireExhausted {
        semaphore: String,
        owner: OwnerToken,
        attempts: u32,
    },

    // Release events
    PermitReleased {
        semaphore: String,
        owner: OwnerToken,
    },
    /// The owner held nothing; release completed as a no-op
    ReleaseSkipped {
        semaphore: String,
        owner: OwnerToken,
    },
    ReleaseExhausted {
        semaphore: String,
        owner: OwnerToken,
        attempts: u32,
    },

    // Reaper events
    PermitReaped {
        semaphore: String,
        owner: OwnerToken,
    },
    ReapSkipped {
        semaphore: String,
        owner: OwnerToken,
    },
    ReapExhausted {
        semaphore: String,
        owner: OwnerToken,
        attempts: u32,
    },
}

impl Event {
    /// Stable event name for logs and subscriptions
    pub fn name(&self) -> &'static str {
        match self {
            Event::RecordInitialized { .. } => "record:initialized",
            Event::PermitAcquired { .. } => "permit:acquired",
            Event::PermitAlreadyHeld { .. } => "permit:already-held",
            Event::SemaphoreSaturated { .. } => "semaphore:saturated",
            Event::AcquireExhausted { .. } => "acquire:exhausted",
            Event::PermitReleased { .. } => "permit:released",
            Event::ReleaseSkipped { .. } => "release:skipped",
            Event::ReleaseExhausted { .. } => "release:exhausted",
            Event::PermitReaped { .. } => "permit:reaped",
            Event::ReapSkipped { .. } => "reap:skipped",
            Event::ReapExhausted { .. } => "reap:exhausted",
        }
    }
}
