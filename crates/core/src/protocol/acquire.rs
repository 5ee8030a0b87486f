// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Acquire protocol state machine
//!
//! Attempts a conditional increment-and-claim on the semaphore record. A
//! rejected write is ambiguous between "record missing", "limit reached",
//! and "this owner already holds a permit"; the machine disambiguates with
//! a lazy record insert or a consistent read of the owners map. Re-entry
//! after a successful-but-unobserved claim terminates in `Acquired` without
//! incrementing a second time.

use super::{Protocol, ProtocolInput, ProtocolStatus};
use crate::clock::Clock;
use crate::config::ProtocolPolicies;
use crate::effect::{Effect, Event, StoreCommand, StoreOutcome};
use crate::record::OwnerToken;
use crate::retry::{RetryPolicy, WaitPolicy};

/// Configuration for one acquire run
#[derive(Clone, Debug)]
pub struct AcquireConfig {
    /// Name of the semaphore to claim against
    pub semaphore: String,
    /// Concurrency limit for the semaphore
    pub limit: u32,
    /// Backoff for transient store failures
    pub transient: RetryPolicy,
    /// Poll interval while the semaphore is saturated
    pub saturation: WaitPolicy,
}

impl AcquireConfig {
    pub fn new(semaphore: impl Into<String>, limit: u32) -> Self {
        let policies = ProtocolPolicies::default();
        Self {
            semaphore: semaphore.into(),
            limit,
            transient: policies.acquire_transient,
            saturation: policies.saturation,
        }
    }

    pub fn with_transient(mut self, policy: RetryPolicy) -> Self {
        self.transient = policy;
        self
    }

    pub fn with_saturation(mut self, policy: WaitPolicy) -> Self {
        self.saturation = policy;
        self
    }
}

/// States of the acquire protocol
///
/// `attempt` counts consecutive transient failures of the current claim;
/// it resets whenever the store answers. `waits` counts saturation polls
/// and only ever grows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AcquireState {
    Idle,
    /// Awaiting the outcome of a conditional claim
    Claiming { attempt: u32, waits: u32 },
    /// Awaiting the outcome of the lazy record insert
    Initializing { waits: u32 },
    /// Waiting out a transient failure of the record insert
    InitBackoff { waits: u32 },
    /// Awaiting the disambiguating owners read
    Inspecting { attempt: u32, waits: u32 },
    /// Saturated; polling until a slot frees up
    WaitingForSlot { waits: u32 },
    /// Waiting out a transient store failure
    BackingOff { attempt: u32, waits: u32 },
    Acquired,
    Failed { reason: String },
}

/// Acquire state machine
#[derive(Clone, Debug)]
pub struct AcquireMachine {
    pub config: AcquireConfig,
    pub owner: OwnerToken,
    pub state: AcquireState,
}

impl AcquireMachine {
    pub fn new(config: AcquireConfig, owner: OwnerToken) -> Self {
        Self {
            config,
            owner,
            state: AcquireState::Idle,
        }
    }

    fn with_state(&self, state: AcquireState) -> Self {
        let mut next = self.clone();
        next.state = state;
        next
    }

    fn claim(&self, clock: &impl Clock) -> Effect {
        Effect::Store(StoreCommand::ClaimPermit {
            semaphore: self.config.semaphore.clone(),
            limit: self.config.limit,
            owner: self.owner.clone(),
            acquired_at: clock.now(),
        })
    }

    fn init_record(&self) -> Effect {
        Effect::Store(StoreCommand::InitRecord {
            semaphore: self.config.semaphore.clone(),
        })
    }

    fn read_owners(&self) -> Effect {
        Effect::Store(StoreCommand::ReadOwners {
            semaphore: self.config.semaphore.clone(),
        })
    }

    /// Transient-failure handling shared by the claim and inspect steps
    fn backoff(&self, attempt: u32, waits: u32, reason: String) -> (Self, Vec<Effect>) {
        match self.config.transient.delay_after(attempt) {
            Some(delay) => (
                self.with_state(AcquireState::BackingOff { attempt, waits }),
                vec![Effect::Wait(delay)],
            ),
            None => (
                self.with_state(AcquireState::Failed {
                    reason: format!("store unavailable after {attempt} attempts: {reason}"),
                }),
                vec![Effect::Emit(Event::AcquireExhausted {
                    semaphore: self.config.semaphore.clone(),
                    owner: self.owner.clone(),
                    attempts: attempt,
                })],
            ),
        }
    }
}

impl Protocol for AcquireMachine {
    fn transition(&self, input: ProtocolInput, clock: &impl Clock) -> (Self, Vec<Effect>) {
        use AcquireState::*;
        use ProtocolInput::*;
        use StoreOutcome::*;

        match (&self.state, input) {
            (Idle, Start) => (
                self.with_state(Claiming {
                    attempt: 1,
                    waits: 0,
                }),
                vec![self.claim(clock)],
            ),

            // Step 1: the conditional claim landed
            (Claiming { .. }, Store(Applied)) => (
                self.with_state(Acquired),
                vec![Effect::Emit(Event::PermitAcquired {
                    semaphore: self.config.semaphore.clone(),
                    owner: self.owner.clone(),
                })],
            ),

            // Never-seen semaphore: initialize lazily, then retry the claim
            (Claiming { waits, .. }, Store(RecordMissing)) => (
                self.with_state(Initializing { waits: *waits }),
                vec![self.init_record()],
            ),

            // Limit reached or already owned: disambiguate with a read
            (Claiming { attempt, waits }, Store(ConditionFailed)) => (
                self.with_state(Inspecting {
                    attempt: *attempt,
                    waits: *waits,
                }),
                vec![self.read_owners()],
            ),

            (Claiming { attempt, waits }, Store(Unavailable(reason))) => {
                self.backoff(*attempt, *waits, reason)
            }

            // Initialize outcomes: success and insert collision both fall
            // through to a single retry of the claim
            (Initializing { waits }, Store(Applied)) => (
                self.with_state(Claiming {
                    attempt: 1,
                    waits: *waits,
                }),
                vec![
                    Effect::Emit(Event::RecordInitialized {
                        semaphore: self.config.semaphore.clone(),
                    }),
                    self.claim(clock),
                ],
            ),
            (Initializing { waits }, Store(RecordExists)) => (
                self.with_state(Claiming {
                    attempt: 1,
                    waits: *waits,
                }),
                vec![self.claim(clock)],
            ),

            // Transient initialize failures retry at the base delay without
            // consuming the claim's attempt budget
            (Initializing { waits }, Store(Unavailable(_))) => (
                self.with_state(InitBackoff { waits: *waits }),
                vec![Effect::Wait(self.config.transient.base_delay)],
            ),
            (InitBackoff { waits }, WaitElapsed) => (
                self.with_state(Initializing { waits: *waits }),
                vec![self.init_record()],
            ),

            // Disambiguating read: structured presence check on the owners map
            (Inspecting { waits, .. }, Store(Owners(owners))) => {
                if owners.contains_key(&self.owner) {
                    // A prior claim applied but the response was lost
                    (
                        self.with_state(Acquired),
                        vec![Effect::Emit(Event::PermitAlreadyHeld {
                            semaphore: self.config.semaphore.clone(),
                            owner: self.owner.clone(),
                        })],
                    )
                } else {
                    match self.config.saturation.delay_after(*waits) {
                        Some(delay) => (
                            self.with_state(WaitingForSlot { waits: waits + 1 }),
                            vec![
                                Effect::Emit(Event::SemaphoreSaturated {
                                    semaphore: self.config.semaphore.clone(),
                                    owner: self.owner.clone(),
                                    waits: waits + 1,
                                }),
                                Effect::Wait(delay),
                            ],
                        ),
                        None => (
                            self.with_state(Failed {
                                reason: format!("semaphore still saturated after {waits} waits"),
                            }),
                            vec![Effect::Emit(Event::AcquireExhausted {
                                semaphore: self.config.semaphore.clone(),
                                owner: self.owner.clone(),
                                attempts: *waits,
                            })],
                        ),
                    }
                }
            }

            // The record vanished between the claim and the read; retry the
            // claim, which will take the initialize path
            (Inspecting { attempt, waits }, Store(RecordMissing)) => (
                self.with_state(Claiming {
                    attempt: *attempt,
                    waits: *waits,
                }),
                vec![self.claim(clock)],
            ),

            (Inspecting { attempt, waits }, Store(Unavailable(reason))) => {
                self.backoff(*attempt, *waits, reason)
            }

            // The saturation poll answered; the attempt budget resets
            (WaitingForSlot { waits }, WaitElapsed) => (
                self.with_state(Claiming {
                    attempt: 1,
                    waits: *waits,
                }),
                vec![self.claim(clock)],
            ),

            (BackingOff { attempt, waits }, WaitElapsed) => (
                self.with_state(Claiming {
                    attempt: attempt + 1,
                    waits: *waits,
                }),
                vec![self.claim(clock)],
            ),

            // Terminal states and out-of-order inputs are inert
            _ => (self.clone(), vec![]),
        }
    }

    fn status(&self) -> ProtocolStatus {
        match &self.state {
            AcquireState::Acquired => ProtocolStatus::Succeeded,
            AcquireState::Failed { reason } => ProtocolStatus::Failed(reason.clone()),
            _ => ProtocolStatus::Running,
        }
    }

    fn name(&self) -> &'static str {
        "acquire"
    }
}

#[cfg(test)]
#[path = "acquire_tests.rs"]
mod tests;
