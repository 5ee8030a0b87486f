// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol driver loop
//!
//! Runs a pure state machine to completion: executes the driving effect
//! each transition requests (a store command or a cooperative wait), maps
//! the result back into a `ProtocolInput`, and feeds it in. `Emit` effects
//! become structured log lines.

use crate::error::DriverError;
use tollgate_core::clock::Clock;
use tollgate_core::effect::{Effect, StoreCommand, StoreOutcome};
use tollgate_core::protocol::{Protocol, ProtocolInput, ProtocolStatus};
use tollgate_store::{SemaphoreStore, StoreError};
use tracing::{debug, info};

/// Drive `machine` from its idle state to a terminal one.
///
/// Returns the terminal machine on success so callers can inspect its
/// final state, or `DriverError` if the protocol failed or stalled.
pub async fn drive<P, S, C>(machine: P, store: &S, clock: &C) -> Result<P, DriverError>
where
    P: Protocol,
    S: SemaphoreStore,
    C: Clock,
{
    let mut machine = machine;
    let mut input = ProtocolInput::Start;

    loop {
        let (next, effects) = machine.transition(input, clock);
        machine = next;

        let mut driving = None;
        for effect in effects {
            match effect {
                Effect::Emit(event) => {
                    info!(protocol = machine.name(), event = event.name(), ?event);
                }
                other => driving = Some(other),
            }
        }

        match machine.status() {
            ProtocolStatus::Succeeded => return Ok(machine),
            ProtocolStatus::Failed(reason) => {
                return Err(DriverError::ProtocolFailed {
                    protocol: machine.name(),
                    reason,
                });
            }
            ProtocolStatus::Running => {}
        }

        input = match driving {
            Some(Effect::Store(command)) => {
                let outcome = execute(store, command).await;
                debug!(protocol = machine.name(), ?outcome, "store outcome");
                ProtocolInput::Store(outcome)
            }
            Some(Effect::Wait(duration)) => {
                tokio::time::sleep(duration).await;
                ProtocolInput::WaitElapsed
            }
            Some(Effect::Emit(_)) | None => {
                return Err(DriverError::Stalled {
                    protocol: machine.name(),
                });
            }
        };
    }
}

/// Run one store command and fold its error space into `StoreOutcome`
async fn execute<S: SemaphoreStore>(store: &S, command: StoreCommand) -> StoreOutcome {
    let result = match command {
        StoreCommand::ClaimPermit {
            semaphore,
            limit,
            owner,
            acquired_at,
        } => store
            .claim_permit(&semaphore, limit, &owner, acquired_at)
            .await
            .map(|()| StoreOutcome::Applied),
        StoreCommand::InitRecord { semaphore } => store
            .init_record(&semaphore)
            .await
            .map(|()| StoreOutcome::Applied),
        StoreCommand::ReleasePermit { semaphore, owner } => store
            .release_permit(&semaphore, &owner)
            .await
            .map(|()| StoreOutcome::Applied),
        StoreCommand::ReadOwners { semaphore } => store
            .read_owners(&semaphore)
            .await
            .map(StoreOutcome::Owners),
    };

    match result {
        Ok(outcome) => outcome,
        Err(StoreError::ConditionFailed(_)) => StoreOutcome::ConditionFailed,
        Err(StoreError::RecordMissing(_)) => StoreOutcome::RecordMissing,
        Err(StoreError::AlreadyExists(_)) => StoreOutcome::RecordExists,
        Err(StoreError::Unavailable(message)) => StoreOutcome::Unavailable(message),
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
