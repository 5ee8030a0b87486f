// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Failures of the protocol driver loop
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The machine reached a terminal failed state
    #[error("{protocol} protocol failed: {reason}")]
    ProtocolFailed { protocol: &'static str, reason: String },
    /// The machine is still running but requested no driving effect; the
    /// loop cannot make progress
    #[error("{protocol} protocol stalled without a driving effect")]
    Stalled { protocol: &'static str },
}

/// Failures when registering a new execution
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StartError {
    #[error("execution already exists: {0}")]
    AlreadyExists(String),
}

/// Failure of the caller-supplied protected work
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct WorkError(pub String);

impl WorkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Failures of a full orchestrated execution
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Start(#[from] StartError),
    #[error("acquire failed: {0}")]
    Acquire(DriverError),
    #[error("release failed: {0}")]
    Release(DriverError),
    /// The protected work itself failed; the permit is deliberately left
    /// held for the reaper
    #[error("work failed: {0}")]
    Work(#[from] WorkError),
    /// The protected work exceeded its deadline
    #[error("work exceeded its deadline")]
    WorkTimedOut,
}
