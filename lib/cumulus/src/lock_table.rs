// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-resource-identifier mutual exclusion.
//!
//! Every mutating convergence run holds the lock for its identifier for the
//! duration of its remote calls, so two runs against the same object never
//! interleave. Runs against different identifiers share nothing but the
//! (briefly held) table mutex that creates entries lazily, so they proceed in
//! parallel. Reads do not take the lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use cumulus_api_types::ResourceId;

/// Holding this guard is holding the lock; dropping it releases the lock on
/// every exit path, panics included.
pub struct LockGuard {
    _guard: OwnedMutexGuard<()>,
}

#[derive(Default)]
pub struct LockTable {
    entries: Mutex<HashMap<ResourceId, Arc<AsyncMutex<()>>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `id`, waiting until any current holder releases
    /// it. Entries are created on first use.
    pub async fn lock(&self, id: &ResourceId) -> LockGuard {
        let entry = {
            let mut entries = self.entries.lock().unwrap();
            Arc::clone(entries.entry(id.clone()).or_default())
        };
        // The table mutex is released before this await, so a held per-key
        // lock never blocks acquisition for an unrelated identifier.
        LockGuard { _guard: entry.lock_owned().await }
    }
}
