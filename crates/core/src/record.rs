// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Semaphore record data model
//!
//! One record per semaphore name, held in the external store. The record is
//! the only shared state in the system: a live-permit counter plus one entry
//! per current holder, keyed by owner token and valued with the acquisition
//! timestamp. Presence of an owner's entry is the sole evidence that token
//! holds a permit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unique identity of a requesting execution
///
/// Supplied by the orchestrator, never generated by the protocol. Doubles
/// as the idempotency key for acquire and the target for release.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerToken(pub String);

impl OwnerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Display for OwnerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Durable state of one semaphore
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemaphoreRecord {
    /// Primary key, immutable once created
    pub name: String,
    /// Number of currently held permits
    pub count: u32,
    /// Owner token -> acquisition timestamp
    pub owners: BTreeMap<OwnerToken, DateTime<Utc>>,
}

impl SemaphoreRecord {
    /// A fresh record as created by lazy initialization
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
            owners: BTreeMap::new(),
        }
    }

    /// Whether this token currently holds a permit
    pub fn holds(&self, owner: &OwnerToken) -> bool {
        self.owners.contains_key(owner)
    }

    /// Whether the live counter has reached the concurrency limit
    ///
    /// The condition reads the same `count` field the claim updates; the
    /// boundary `count == limit` must reject a claim.
    pub fn is_full(&self, limit: u32) -> bool {
        self.count >= limit
    }

    /// Conditional increment-and-claim
    ///
    /// Applies only if the limit is not reached and the owner is not already
    /// present. Returns whether the write applied.
    pub fn try_claim(&mut self, owner: &OwnerToken, limit: u32, now: DateTime<Utc>) -> bool {
        if self.is_full(limit) || self.holds(owner) {
            return false;
        }
        self.owners.insert(owner.clone(), now);
        self.count += 1;
        true
    }

    /// Conditional decrement-and-unclaim
    ///
    /// Applies only if the owner currently holds a permit. Returns whether
    /// the write applied.
    pub fn try_release(&mut self, owner: &OwnerToken) -> bool {
        if self.owners.remove(owner).is_none() {
            return false;
        }
        self.count = self.count.saturating_sub(1);
        true
    }

    /// Record-level invariant: the counter mirrors the owner map and never
    /// exceeds the limit
    pub fn invariant_holds(&self, limit: u32) -> bool {
        self.count as usize == self.owners.len() && self.count <= limit
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
