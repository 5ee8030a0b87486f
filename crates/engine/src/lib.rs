// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tollgate execution engine
//!
//! Drives the pure protocol machines from tollgate-core against a store:
//! the driver loop executes effects, the orchestrator sequences
//! acquire -> protected work -> release, the reaper trigger repairs permits
//! orphaned by abnormal terminations, and the harness fans out concurrent
//! executions to validate the at-most-K invariant under load.

mod driver;
mod error;
mod harness;
mod orchestrator;
mod signals;

pub use driver::drive;
pub use error::{DriverError, OrchestratorError, StartError, WorkError};
pub use harness::{Harness, HarnessConfig, HarnessReport};
pub use orchestrator::{ExecutionId, ExecutionRegistry, Orchestrator, TerminalStatus};
pub use signals::{ReaperTrigger, TerminationSignal};
