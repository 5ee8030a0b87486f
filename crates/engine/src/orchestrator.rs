// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution orchestration
//!
//! Sequences a full protected execution: register the execution id,
//! acquire a permit, run the caller's work, release the permit. Work
//! failures and timeouts deliberately skip the in-band release; the
//! termination signal routes those executions to the reaper instead.

use crate::driver::drive;
use crate::error::{OrchestratorError, StartError, WorkError};
use crate::signals::TerminationSignal;
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tollgate_core::clock::Clock;
use tollgate_core::config::ProtocolPolicies;
use tollgate_core::protocol::{AcquireConfig, AcquireMachine, ReleaseConfig, ReleaseMachine};
use tollgate_core::record::OwnerToken;
use tollgate_store::SemaphoreStore;
use tracing::{debug, warn};

/// Unique id of one execution; doubles as its permit owner token
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecutionId(pub String);

impl ExecutionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The owner token this execution claims permits under
    pub fn owner_token(&self) -> OwnerToken {
        OwnerToken::new(self.0.clone())
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an execution ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    Succeeded,
    Failed,
    TimedOut,
    Aborted,
}

impl TerminalStatus {
    /// Successful terminations released in-band; everything else may have
    /// left a permit behind
    pub fn is_success(&self) -> bool {
        matches!(self, TerminalStatus::Succeeded)
    }
}

/// In-flight execution ids; rejects duplicate starts
#[derive(Clone, Default)]
pub struct ExecutionRegistry {
    inflight: Arc<Mutex<HashSet<ExecutionId>>>,
}

impl ExecutionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<ExecutionId>> {
        self.inflight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new execution; fails if the id is already in flight
    pub fn begin(&self, execution: &ExecutionId) -> Result<(), StartError> {
        if !self.lock().insert(execution.clone()) {
            return Err(StartError::AlreadyExists(execution.0.clone()));
        }
        Ok(())
    }

    pub fn finish(&self, execution: &ExecutionId) {
        self.lock().remove(execution);
    }

    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }
}

/// Runs executions through the acquire/work/release sequence
#[derive(Clone)]
pub struct Orchestrator<S, C> {
    store: S,
    clock: C,
    policies: ProtocolPolicies,
    registry: ExecutionRegistry,
    signals: mpsc::UnboundedSender<TerminationSignal>,
    work_deadline: Option<Duration>,
}

impl<S, C> Orchestrator<S, C>
where
    S: SemaphoreStore,
    C: Clock,
{
    pub fn new(store: S, clock: C, signals: mpsc::UnboundedSender<TerminationSignal>) -> Self {
        Self {
            store,
            clock,
            policies: ProtocolPolicies::default(),
            registry: ExecutionRegistry::new(),
            signals,
            work_deadline: None,
        }
    }

    pub fn with_policies(mut self, policies: ProtocolPolicies) -> Self {
        self.policies = policies;
        self
    }

    /// Cap the protected work; executions past the deadline terminate as
    /// timed out without releasing in-band
    pub fn with_work_deadline(mut self, deadline: Duration) -> Self {
        self.work_deadline = Some(deadline);
        self
    }

    pub fn registry(&self) -> &ExecutionRegistry {
        &self.registry
    }

    /// Run one protected execution end to end.
    ///
    /// On work failure or timeout the permit is left in place and the
    /// termination signal hands it to the reaper.
    pub async fn run<F, Fut, T>(
        &self,
        execution: &ExecutionId,
        semaphore: &str,
        limit: u32,
        work: F,
    ) -> Result<T, OrchestratorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, WorkError>>,
    {
        self.registry.begin(execution)?;

        let owner = execution.owner_token();
        let acquire_config = AcquireConfig::new(semaphore, limit)
            .with_transient(self.policies.acquire_transient.clone())
            .with_saturation(self.policies.saturation.clone());
        let acquire = AcquireMachine::new(acquire_config, owner.clone());
        if let Err(err) = drive(acquire, &self.store, &self.clock).await {
            // Nothing confirmed held, but a lost claim response may have
            // landed; let the reaper check
            self.terminate(execution, semaphore, TerminalStatus::Failed);
            return Err(OrchestratorError::Acquire(err));
        }

        let outcome = match self.work_deadline {
            Some(deadline) => match tokio::time::timeout(deadline, work()).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(execution = %execution, semaphore, "work deadline exceeded");
                    self.terminate(execution, semaphore, TerminalStatus::TimedOut);
                    return Err(OrchestratorError::WorkTimedOut);
                }
            },
            None => work().await,
        };

        let value = match outcome {
            Ok(value) => value,
            Err(err) => {
                warn!(execution = %execution, semaphore, error = %err, "work failed");
                self.terminate(execution, semaphore, TerminalStatus::Failed);
                return Err(OrchestratorError::Work(err));
            }
        };

        let release_config = ReleaseConfig::new(semaphore)
            .with_transient(self.policies.release_transient.clone());
        let release = ReleaseMachine::new(release_config, owner);
        if let Err(err) = drive(release, &self.store, &self.clock).await {
            self.terminate(execution, semaphore, TerminalStatus::Failed);
            return Err(OrchestratorError::Release(err));
        }

        self.terminate(execution, semaphore, TerminalStatus::Succeeded);
        Ok(value)
    }

    fn terminate(&self, execution: &ExecutionId, semaphore: &str, status: TerminalStatus) {
        self.registry.finish(execution);
        let signal = TerminationSignal {
            execution: execution.clone(),
            semaphore: semaphore.to_string(),
            status,
        };
        if self.signals.send(signal).is_err() {
            debug!(execution = %execution, "termination signal receiver is gone");
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
