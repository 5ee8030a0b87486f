// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Store adapter seam for the semaphore record
//!
//! The protocol coordinates exclusively through an external key-value store
//! that offers atomic conditional writes. This crate defines that seam as an
//! async trait, plus an in-memory reference implementation and a
//! fault-injecting wrapper for tests.

mod faulty;
mod memory;
mod traits;

pub use faulty::{FaultyStore, StoreCall};
pub use memory::MemoryStore;
pub use traits::{SemaphoreStore, StoreError};
