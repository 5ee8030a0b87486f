// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrency load harness
//!
//! Fans out many executions against one semaphore and measures the peak
//! number of tasks inside the protected section. With a correct store and
//! protocol the peak never exceeds the limit.

use crate::error::{OrchestratorError, StartError};
use crate::orchestrator::{ExecutionId, Orchestrator};
use crate::signals::ReaperTrigger;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tollgate_core::clock::Clock;
use tollgate_core::config::ProtocolPolicies;
use tollgate_core::token::TokenGen;
use tollgate_store::SemaphoreStore;
use tracing::info;

/// Load parameters for one harness run
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub semaphore: String,
    pub limit: u32,
    /// Number of concurrent executions to launch
    pub fan_out: u32,
    /// How long each execution holds its permit
    pub hold: Duration,
    pub policies: ProtocolPolicies,
}

impl HarnessConfig {
    pub fn new(semaphore: impl Into<String>, limit: u32, fan_out: u32) -> Self {
        Self {
            semaphore: semaphore.into(),
            limit,
            fan_out,
            hold: Duration::from_millis(10),
            policies: ProtocolPolicies::default(),
        }
    }

    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    pub fn with_policies(mut self, policies: ProtocolPolicies) -> Self {
        self.policies = policies;
        self
    }
}

/// What a harness run observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessReport {
    pub started: u32,
    pub completed: u32,
    pub failed: u32,
    pub start_collisions: u32,
    /// Peak simultaneous occupancy of the protected section
    pub peak_concurrency: u32,
}

/// Occupancy gauge for the protected section
#[derive(Default)]
struct Gauge {
    current: AtomicU32,
    peak: AtomicU32,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> u32 {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Tallies shared across harness tasks
#[derive(Default)]
struct Tally {
    started: AtomicU32,
    completed: AtomicU32,
    failed: AtomicU32,
    start_collisions: AtomicU32,
}

/// Fans out executions to exercise the at-most-limit invariant
pub struct Harness<S, C, T> {
    store: S,
    clock: C,
    tokens: T,
    config: HarnessConfig,
}

impl<S, C, T> Harness<S, C, T>
where
    S: SemaphoreStore,
    C: Clock + 'static,
    T: TokenGen + 'static,
{
    pub fn new(store: S, clock: C, tokens: T, config: HarnessConfig) -> Self {
        Self {
            store,
            clock,
            tokens,
            config,
        }
    }

    /// Launch `fan_out` executions and wait for all of them, then the
    /// reaper trigger, to finish
    pub async fn run(&self) -> HarnessReport {
        let (signals, trigger) = ReaperTrigger::spawn(
            self.store.clone(),
            self.clock.clone(),
            self.config.policies.clone(),
        );
        let orchestrator = Orchestrator::new(self.store.clone(), self.clock.clone(), signals)
            .with_policies(self.config.policies.clone());

        let gauge = Arc::new(Gauge::default());
        let tally = Arc::new(Tally::default());

        let mut tasks = JoinSet::new();
        for _ in 0..self.config.fan_out {
            tasks.spawn(run_one(
                orchestrator.clone(),
                self.tokens.clone(),
                self.config.clone(),
                Arc::clone(&gauge),
                Arc::clone(&tally),
            ));
        }
        while tasks.join_next().await.is_some() {}

        // Every orchestrator clone is dropped with the tasks; dropping ours
        // closes the signal channel so the trigger can drain and exit
        drop(orchestrator);
        trigger.shutdown().await;

        let report = HarnessReport {
            started: tally.started.load(Ordering::SeqCst),
            completed: tally.completed.load(Ordering::SeqCst),
            failed: tally.failed.load(Ordering::SeqCst),
            start_collisions: tally.start_collisions.load(Ordering::SeqCst),
            peak_concurrency: gauge.peak(),
        };
        info!(?report, "harness run finished");
        report
    }
}

/// One harness execution: start (retrying id collisions with a fresh
/// token), hold the permit for the configured duration, release
async fn run_one<S, C>(
    orchestrator: Orchestrator<S, C>,
    tokens: impl TokenGen,
    config: HarnessConfig,
    gauge: Arc<Gauge>,
    tally: Arc<Tally>,
) where
    S: SemaphoreStore,
    C: Clock,
{
    let mut attempt = 1;
    loop {
        let execution = ExecutionId::new(tokens.next());
        tally.started.fetch_add(1, Ordering::SeqCst);

        let gauge = Arc::clone(&gauge);
        let hold = config.hold;
        let result = orchestrator
            .run(&execution, &config.semaphore, config.limit, move || {
                async move {
                    gauge.enter();
                    tokio::time::sleep(hold).await;
                    gauge.exit();
                    Ok(())
                }
            })
            .await;

        match result {
            Ok(()) => {
                tally.completed.fetch_add(1, Ordering::SeqCst);
                return;
            }
            Err(OrchestratorError::Start(StartError::AlreadyExists(_))) => {
                tally.start_collisions.fetch_add(1, Ordering::SeqCst);
                match config.policies.start_collision.delay_after(attempt) {
                    Some(delay) => {
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        tally.failed.fetch_add(1, Ordering::SeqCst);
                        return;
                    }
                }
            }
            Err(_) => {
                tally.failed.fetch_add(1, Ordering::SeqCst);
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "harness_tests.rs"]
mod tests;
