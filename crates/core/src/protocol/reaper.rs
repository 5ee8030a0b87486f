// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reaper protocol state machine
//!
//! Invoked out-of-band when an execution terminates abnormally. Inspects
//! the owners map for the dead execution's token and releases its permit
//! if still held; otherwise a no-op. This is the system's only recovery
//! path for orphaned permits, so its retry budget is deliberately generous:
//! it runs off the critical path and favors eventual correctness over
//! latency. One budget spans the inspect and release steps.

use super::{Protocol, ProtocolInput, ProtocolStatus};
use crate::clock::Clock;
use crate::config::ProtocolPolicies;
use crate::effect::{Effect, Event, StoreCommand, StoreOutcome};
use crate::record::OwnerToken;
use crate::retry::RetryPolicy;

/// Configuration for one reaper run
#[derive(Clone, Debug)]
pub struct ReaperConfig {
    pub semaphore: String,
    /// Budget spanning both the inspect and release steps
    pub retry: RetryPolicy,
}

impl ReaperConfig {
    pub fn new(semaphore: impl Into<String>) -> Self {
        Self {
            semaphore: semaphore.into(),
            retry: ProtocolPolicies::default().reaper,
        }
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }
}

/// States of the reaper protocol
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReaperState {
    Idle,
    /// Awaiting the owners read
    Inspecting { attempt: u32 },
    /// Waiting out a transient failure of the read
    InspectBackoff { attempt: u32 },
    /// The orphan still holds a permit; awaiting the unclaim
    Releasing { attempt: u32 },
    /// Waiting out a transient failure of the unclaim
    ReleaseBackoff { attempt: u32 },
    /// The orphan's permit was released on its behalf
    Reaped,
    /// The token held nothing; no repair needed
    NotHeld,
    Failed { reason: String },
}

/// Reaper state machine
#[derive(Clone, Debug)]
pub struct ReaperMachine {
    pub config: ReaperConfig,
    pub owner: OwnerToken,
    pub state: ReaperState,
}

impl ReaperMachine {
    pub fn new(config: ReaperConfig, owner: OwnerToken) -> Self {
        Self {
            config,
            owner,
            state: ReaperState::Idle,
        }
    }

    fn with_state(&self, state: ReaperState) -> Self {
        let mut next = self.clone();
        next.state = state;
        next
    }

    fn read_owners(&self) -> Effect {
        Effect::Store(StoreCommand::ReadOwners {
            semaphore: self.config.semaphore.clone(),
        })
    }

    fn release(&self) -> Effect {
        Effect::Store(StoreCommand::ReleasePermit {
            semaphore: self.config.semaphore.clone(),
            owner: self.owner.clone(),
        })
    }

    fn skipped(&self) -> Effect {
        Effect::Emit(Event::ReapSkipped {
            semaphore: self.config.semaphore.clone(),
            owner: self.owner.clone(),
        })
    }

    fn exhausted(&self, attempt: u32, reason: &str) -> (Self, Vec<Effect>) {
        (
            self.with_state(ReaperState::Failed {
                reason: format!("store unavailable after {attempt} attempts: {reason}"),
            }),
            vec![Effect::Emit(Event::ReapExhausted {
                semaphore: self.config.semaphore.clone(),
                owner: self.owner.clone(),
                attempts: attempt,
            })],
        )
    }
}

impl Protocol for ReaperMachine {
    fn transition(&self, input: ProtocolInput, _clock: &impl Clock) -> (Self, Vec<Effect>) {
        use ProtocolInput::*;
        use ReaperState::*;
        use StoreOutcome::*;

        match (&self.state, input) {
            (Idle, Start) => (
                self.with_state(Inspecting { attempt: 1 }),
                vec![self.read_owners()],
            ),

            (Inspecting { attempt }, Store(Owners(owners))) => {
                if owners.contains_key(&self.owner) {
                    // The execution died holding a permit; release on its behalf
                    (
                        self.with_state(Releasing { attempt: *attempt }),
                        vec![self.release()],
                    )
                } else {
                    (self.with_state(NotHeld), vec![self.skipped()])
                }
            }

            // No record means no permit to reap
            (Inspecting { .. }, Store(RecordMissing)) => {
                (self.with_state(NotHeld), vec![self.skipped()])
            }

            (Inspecting { attempt }, Store(Unavailable(reason))) => {
                match self.config.retry.delay_after(*attempt) {
                    Some(delay) => (
                        self.with_state(InspectBackoff { attempt: *attempt }),
                        vec![Effect::Wait(delay)],
                    ),
                    None => self.exhausted(*attempt, &reason),
                }
            }

            (InspectBackoff { attempt }, WaitElapsed) => (
                self.with_state(Inspecting {
                    attempt: attempt + 1,
                }),
                vec![self.read_owners()],
            ),

            (Releasing { .. }, Store(Applied)) => (
                self.with_state(Reaped),
                vec![Effect::Emit(Event::PermitReaped {
                    semaphore: self.config.semaphore.clone(),
                    owner: self.owner.clone(),
                })],
            ),

            // Someone released between the read and the unclaim
            (Releasing { .. }, Store(ConditionFailed))
            | (Releasing { .. }, Store(RecordMissing)) => {
                (self.with_state(NotHeld), vec![self.skipped()])
            }

            (Releasing { attempt }, Store(Unavailable(reason))) => {
                match self.config.retry.delay_after(*attempt) {
                    Some(delay) => (
                        self.with_state(ReleaseBackoff { attempt: *attempt }),
                        vec![Effect::Wait(delay)],
                    ),
                    None => self.exhausted(*attempt, &reason),
                }
            }

            (ReleaseBackoff { attempt }, WaitElapsed) => (
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
            ReaperState::Reaped | ReaperState::NotHeld => ProtocolStatus::Succeeded,
            ReaperState::Failed { reason } => ProtocolStatus::Failed(reason.clone()),
            _ => ProtocolStatus::Running,
        }
    }

    fn name(&self) -> &'static str {
        "reaper"
    }
}

#[cfg(test)]
#[path = "reaper_tests.rs"]
mod tests;
