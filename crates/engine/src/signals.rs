// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Termination signals and the reaper trigger
//!
//! The trigger consumes termination signals and runs the reaper protocol
//! for every execution that did not release in-band. It is the only part
//! of the system allowed to remove a permit it did not acquire.

use crate::driver::drive;
use crate::orchestrator::{ExecutionId, TerminalStatus};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tollgate_core::clock::Clock;
use tollgate_core::config::ProtocolPolicies;
use tollgate_core::protocol::{ReaperConfig, ReaperMachine, ReaperState};
use tollgate_store::SemaphoreStore;
use tracing::{info, warn};

/// Notice that an execution terminated and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationSignal {
    pub execution: ExecutionId,
    pub semaphore: String,
    pub status: TerminalStatus,
}

/// Background task that reaps permits of abnormally terminated executions
pub struct ReaperTrigger {
    handle: JoinHandle<()>,
}

impl ReaperTrigger {
    /// Spawn the trigger loop; feed it via the returned sender.
    ///
    /// Dropping the sender shuts the loop down after in-flight reaps drain.
    pub fn spawn<S, C>(
        store: S,
        clock: C,
        policies: ProtocolPolicies,
    ) -> (mpsc::UnboundedSender<TerminationSignal>, Self)
    where
        S: SemaphoreStore,
        C: Clock + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(trigger_loop(rx, store, clock, policies));
        (tx, Self { handle })
    }

    /// Wait for the loop to finish; callers drop their senders first
    pub async fn shutdown(self) {
        if self.handle.await.is_err() {
            warn!("reaper trigger task panicked");
        }
    }
}

async fn trigger_loop<S, C>(
    mut rx: mpsc::UnboundedReceiver<TerminationSignal>,
    store: S,
    clock: C,
    policies: ProtocolPolicies,
) where
    S: SemaphoreStore,
    C: Clock + 'static,
{
    let mut reaps = JoinSet::new();
    while let Some(signal) = rx.recv().await {
        if signal.status.is_success() {
            continue;
        }
        info!(
            execution = %signal.execution,
            semaphore = %signal.semaphore,
            status = ?signal.status,
            "abnormal termination, scheduling reap"
        );
        reaps.spawn(reap_one(
            signal,
            store.clone(),
            clock.clone(),
            policies.reaper.clone(),
        ));
    }
    // Channel closed: drain outstanding reaps before exiting
    while reaps.join_next().await.is_some() {}
}

async fn reap_one<S, C>(
    signal: TerminationSignal,
    store: S,
    clock: C,
    retry: tollgate_core::retry::RetryPolicy,
) where
    S: SemaphoreStore,
    C: Clock,
{
    let config = ReaperConfig::new(&signal.semaphore).with_retry(retry);
    let machine = ReaperMachine::new(config, signal.execution.owner_token());
    match drive(machine, &store, &clock).await {
        Ok(terminal) => {
            let reaped = terminal.state == ReaperState::Reaped;
            info!(
                execution = %signal.execution,
                semaphore = %signal.semaphore,
                reaped,
                "reap finished"
            );
        }
        Err(err) => {
            // Budget exhausted; the permit stays orphaned until an operator
            // or a later reap pass removes it
            warn!(
                execution = %signal.execution,
                semaphore = %signal.semaphore,
                error = %err,
                "reap failed"
            );
        }
    }
}

#[cfg(test)]
#[path = "signals_tests.rs"]
mod tests;
