// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter trait for the atomic conditional-write record store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;
use tollgate_core::record::OwnerToken;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists under this semaphore name
    #[error("record not found: {0}")]
    RecordMissing(String),
    /// A server-side conditional check rejected the write
    #[error("condition check failed for semaphore: {0}")]
    ConditionFailed(String),
    /// An insert collided with a record another execution created first
    #[error("record already exists: {0}")]
    AlreadyExists(String),
    /// Transient store failure; safe to retry
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Atomic conditional operations over semaphore records
///
/// Every method is one server-side atomic operation: the condition and the
/// mutation are evaluated together, and the conditional write is the only
/// serialization point in the whole system.
#[async_trait]
pub trait SemaphoreStore: Clone + Send + Sync + 'static {
    /// Conditional increment-and-claim: `count += 1`,
    /// `owners[owner] = acquired_at`, condition `count != limit` and the
    /// owner is not already present
    async fn claim_permit(
        &self,
        semaphore: &str,
        limit: u32,
        owner: &OwnerToken,
        acquired_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Conditional insert of a fresh record, guarded by absence
    async fn init_record(&self, semaphore: &str) -> Result<(), StoreError>;

    /// Conditional decrement-and-unclaim, condition: the owner holds a permit
    async fn release_permit(&self, semaphore: &str, owner: &OwnerToken)
        -> Result<(), StoreError>;

    /// Consistency-guaranteed read projected to the owners map
    async fn read_owners(
        &self,
        semaphore: &str,
    ) -> Result<BTreeMap<OwnerToken, DateTime<Utc>>, StoreError>;
}
