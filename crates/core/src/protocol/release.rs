// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Release protocol state machine
//!
//! Conditional decrement-and-unclaim. A rejected condition means the owner
//! holds nothing (double release, or the reaper got there first) and is
//! terminal success, never retried.

use super::{Protocol, ProtocolInput, ProtocolStatus};
use crate::clock::Clock;
use crate::config::ProtocolPolicies;
use crate::effect::{Effect, Event, StoreCommand, StoreOutcome};
use crate::record::OwnerToken;
use crate::retry::RetryPolicy;

/// Configuration for one release run
#[derive(Clone, Debug)]
pub struct ReleaseConfig {
    pub semaphore: String,
    /// Backoff for transient store failures
    pub transient: RetryPolicy,
}

impl ReleaseConfig {
    pub fn new(semaphore: impl Into<String>) -> Self {
        Self {
            semaphore: semaphore.into(),
            transient: ProtocolPolicies::default().release_transient,
        }
    }

    pub fn with_transient(mut self, policy: RetryPolicy) -> Self {
        self.transient = policy;
        self
    }
}

/// States of the release protocol
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReleaseState {
    Idle,
    /// Awaiting the outcome of the conditional unclaim
    Releasing { attempt: u32 },
    /// Waiting out a transient store failure
    BackingOff { attempt: u32 },
    Released,
    Failed { reason: String },
}

/// Release state machine
#[derive(Clone, Debug)]
pub struct ReleaseMachine {
    pub config: ReleaseConfig,
    pub owner: OwnerToken,
    pub state: ReleaseState,
}

impl ReleaseMachine {
    pub fn new(config: ReleaseConfig, owner: OwnerToken) -> Self {
        Self {
            config,
            owner,
            state: ReleaseState::Idle,
        }
    }

    fn with_state(&self, state: ReleaseState) -> Self {
        let mut next = self.clone();
        next.state = state;
        next
    }

    fn release(&self) -> Effect {
        Effect::Store(StoreCommand::ReleasePermit {
            semaphore: self.config.semaphore.clone(),
            owner: self.owner.clone(),
        })
    }
}

impl Protocol for ReleaseMachine {
    fn transition(&self, input: ProtocolInput, _clock: &impl Clock) -> (Self, Vec<Effect>) {
        use ProtocolInput::*;
        use ReleaseState::*;
        use StoreOutcome::*;

        match (&self.state, input) {
            (Idle, Start) => (
                self.with_state(Releasing { attempt: 1 }),
                vec![self.release()],
            ),

            (Releasing { .. }, Store(Applied)) => (
                self.with_state(Released),
                vec![Effect::Emit(Event::PermitReleased {
                    semaphore: self.config.semaphore.clone(),
                    owner: self.owner.clone(),
                })],
            ),

            // Nothing held under this token: terminal success
            (Releasing { .. }, Store(ConditionFailed))
            | (Releasing { .. }, Store(RecordMissing)) => (
                self.with_state(Released),
                vec![Effect::Emit(Event::ReleaseSkipped {
                    semaphore: self.config.semaphore.clone(),
                    owner: self.owner.clone(),
                })],
            ),

            (Releasing { attempt }, Store(Unavailable(reason))) => {
                match self.config.transient.delay_after(*attempt) {
                    Some(delay) => (
                        self.with_state(BackingOff { attempt: *attempt }),
                        vec![Effect::Wait(delay)],
                    ),
                    None => (
                        self.with_state(Failed {
                            reason: format!(
                                "store unavailable after {attempt} attempts: {reason}"
                            ),
                        }),
                        vec![Effect::Emit(Event::ReleaseExhausted {
                            semaphore: self.config.semaphore.clone(),
                            owner: self.owner.clone(),
                            attempts: *attempt,
                        })],
                    ),
                }
            }

            (BackingOff { attempt }, WaitElapsed) => (
                self.with_state(Releasing {
                    attempt: attempt + 1,
                }),
                vec![self.release()],
            ),

            // Terminal states and out-of-order inputs are inert
            _ => (self.clone(), vec![]),
        }
    }

    fn status(&self) -> ProtocolStatus {
        match &self.state {
            ReleaseState::Released => ProtocolStatus::Succeeded,
            ReleaseState::Failed { reason } => ProtocolStatus::Failed(reason.clone()),
            _ => ProtocolStatus::Running,
        }
    }

    fn name(&self) -> &'static str {
        "release"
    }
}

#[cfg(test)]
#[path = "release_tests.rs"]
mod tests;
