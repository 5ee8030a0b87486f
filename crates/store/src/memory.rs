// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory reference store
//!
//! The interior mutex stands in for the server-side atomicity of the real
//! key-value store: each trait method is exactly one atomic conditional
//! operation over the record map.

use crate::traits::{SemaphoreStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tollgate_core::record::{OwnerToken, SemaphoreRecord};

#[derive(Default)]
struct MemoryState {
    records: HashMap<String, SemaphoreRecord>,
    /// Highest simultaneous owner count ever observed, per semaphore
    peak_owners: HashMap<String, usize>,
}

/// In-memory implementation of the store seam
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of a record, for assertions
    pub fn record(&self, semaphore: &str) -> Option<SemaphoreRecord> {
        self.lock().records.get(semaphore).cloned()
    }

    /// Highest number of simultaneous owners ever observed for a semaphore
    pub fn peak_owners(&self, semaphore: &str) -> usize {
        self.lock().peak_owners.get(semaphore).copied().unwrap_or(0)
    }

    /// Insert an empty record unconditionally, for test setup
    pub fn seed(&self, semaphore: &str) {
        self.lock()
            .records
            .insert(semaphore.to_string(), SemaphoreRecord::new(semaphore));
    }
}

#[async_trait]
impl SemaphoreStore for MemoryStore {
    async fn claim_permit(
        &self,
        semaphore: &str,
        limit: u32,
        owner: &OwnerToken,
        acquired_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        let record = state
            .records
            .get_mut(semaphore)
            .ok_or_else(|| StoreError::RecordMissing(semaphore.to_string()))?;

        if !record.try_claim(owner, limit, acquired_at) {
            return Err(StoreError::ConditionFailed(semaphore.to_string()));
        }

        let owners = record.owners.len();
        let peak = state.peak_owners.entry(semaphore.to_string()).or_insert(0);
        *peak = (*peak).max(owners);
        Ok(())
    }

    async fn init_record(&self, semaphore: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.records.contains_key(semaphore) {
            return Err(StoreError::AlreadyExists(semaphore.to_string()));
        }
        state
            .records
            .insert(semaphore.to_string(), SemaphoreRecord::new(semaphore));
        Ok(())
    }

    async fn release_permit(
        &self,
        semaphore: &str,
        owner: &OwnerToken,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        let record = state
            .records
            .get_mut(semaphore)
            .ok_or_else(|| StoreError::RecordMissing(semaphore.to_string()))?;

        if !record.try_release(owner) {
            return Err(StoreError::ConditionFailed(semaphore.to_string()));
        }
        Ok(())
    }

    async fn read_owners(
        &self,
        semaphore: &str,
    ) -> Result<BTreeMap<OwnerToken, DateTime<Utc>>, StoreError> {
        let state = self.lock();
        state
            .records
            .get(semaphore)
            .map(|record| record.owners.clone())
            .ok_or_else(|| StoreError::RecordMissing(semaphore.to_string()))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
