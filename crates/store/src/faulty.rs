// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fault-injecting store wrapper for testing
//!
//! Records every call and can fail upcoming calls with `Unavailable`, or
//! apply a write but report its response lost. The lost-response mode is
//! what exercises the acquire protocol's idempotent re-entry path.

use crate::traits::{SemaphoreStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tollgate_core::record::OwnerToken;

/// Recorded call to a store method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Claim { semaphore: String, owner: OwnerToken },
    Init { semaphore: String },
    Release { semaphore: String, owner: OwnerToken },
    ReadOwners { semaphore: String },
}

#[derive(Default)]
struct FaultState {
    calls: Vec<StoreCall>,
    /// Next N calls answer `Unavailable` without reaching the inner store
    fail_next: u32,
    /// Next N writes apply but answer `Unavailable`
    lose_next_writes: u32,
}

/// Store wrapper with call recording and configurable failure modes
#[derive(Clone)]
pub struct FaultyStore<S> {
    inner: S,
    state: Arc<Mutex<FaultState>>,
}

impl<S> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            state: Arc::new(Mutex::new(FaultState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FaultState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fail the next `n` calls with `Unavailable` before they reach the store
    pub fn fail_next(&self, n: u32) {
        self.lock().fail_next = n;
    }

    /// Apply the next `n` writes but report their responses lost
    pub fn lose_next_writes(&self, n: u32) {
        self.lock().lose_next_writes = n;
    }

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Record the call; returns whether it should fail outright
    fn admit(&self, call: StoreCall) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(StoreError::Unavailable("injected outage".to_string()));
        }
        Ok(())
    }

    /// Whether the next write's response should be dropped
    fn lose_write(&self) -> bool {
        let mut state = self.lock();
        if state.lose_next_writes > 0 {
            state.lose_next_writes -= 1;
            return true;
        }
        false
    }
}

#[async_trait]
impl<S: SemaphoreStore> SemaphoreStore for FaultyStore<S> {
    async fn claim_permit(
        &self,
        semaphore: &str,
        limit: u32,
        owner: &OwnerToken,
        acquired_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.admit(StoreCall::Claim {
            semaphore: semaphore.to_string(),
            owner: owner.clone(),
        })?;
        let result = self
            .inner
            .claim_permit(semaphore, limit, owner, acquired_at)
            .await;
        if self.lose_write() {
            return Err(StoreError::Unavailable("response lost".to_string()));
        }
        result
    }

    async fn init_record(&self, semaphore: &str) -> Result<(), StoreError> {
        self.admit(StoreCall::Init {
            semaphore: semaphore.to_string(),
        })?;
        let result = self.inner.init_record(semaphore).await;
        if self.lose_write() {
            return Err(StoreError::Unavailable("response lost".to_string()));
        }
        result
    }

    async fn release_permit(
        &self,
        semaphore: &str,
        owner: &OwnerToken,
    ) -> Result<(), StoreError> {
        self.admit(StoreCall::Release {
            semaphore: semaphore.to_string(),
            owner: owner.clone(),
        })?;
        let result = self.inner.release_permit(semaphore, owner).await;
        if self.lose_write() {
            return Err(StoreError::Unavailable("response lost".to_string()));
        }
        result
    }

    async fn read_owners(
        &self,
        semaphore: &str,
    ) -> Result<BTreeMap<OwnerToken, DateTime<Utc>>, StoreError> {
        self.admit(StoreCall::ReadOwners {
            semaphore: semaphore.to_string(),
        })?;
        self.inner.read_owners(semaphore).await
    }
}

#[cfg(test)]
#[path = "faulty_tests.rs"]
mod tests;
