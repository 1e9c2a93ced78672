// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0
//! # Keyed Lock Registry
//!
//! Per-key async mutual exclusion over UUID-identified entities. The trust
//! engine serializes score read-modify-write cycles per agent and
//! reassignment evaluations per task; unrelated keys proceed concurrently.
//!
//! Locks are created lazily on first use and kept for the life of the
//! registry. The key space is bounded by the number of live agents and
//! tasks, so nothing is evicted.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Default)]
pub struct KeyedLockRegistry {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl KeyedLockRegistry {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Acquire the lock for one key, waiting if another holder has it.
    ///
    /// The map guard is released before awaiting so a blocked acquisition
    /// never stalls lookups of other keys.
    pub async fn lock(&self, key: Uuid) -> OwnedMutexGuard<()> {
        let entry = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        entry.lock_owned().await
    }

    /// Number of keys a lock has been created for.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
