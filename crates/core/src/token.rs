// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution-identity generation
//!
//! Owner tokens are supplied by the orchestrator, one per logical execution.
//! The generator abstraction lets the load harness mint distinct identities
//! and lets tests use predictable sequential ones.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Generates unique execution identities
pub trait TokenGen: Clone + Send + Sync {
    fn next(&self) -> String;
}

/// UUID-based generator for production use
#[derive(Clone, Default)]
pub struct UuidTokenGen;

impl TokenGen for UuidTokenGen {
    fn next(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Sequential generator for testing
#[derive(Clone)]
pub struct SequentialTokenGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialTokenGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialTokenGen {
    fn default() -> Self {
        Self::new("exec")
    }
}

impl TokenGen for SequentialTokenGen {
    fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }
}
