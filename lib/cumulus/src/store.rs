// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The persisted-state store the engine reads prior documents from and
//! writes flattened documents back to. The engine only ever needs get/set
//! semantics keyed by resource identifier; durability is the caller's
//! business.

use std::collections::HashMap;
use std::sync::Mutex;

use cumulus_api_types::ResourceId;

pub trait StateStore<D>: Send + Sync {
    fn get(&self, id: &ResourceId) -> Option<D>;
    fn put(&self, id: ResourceId, doc: D);
    /// Forgets the document for `id`. Called when the remote object is found
    /// to have vanished, so the next plan treats it as never created.
    fn remove(&self, id: &ResourceId);
}

/// In-memory store, suitable for tests and for callers that persist
/// elsewhere.
#[derive(Default)]
pub struct MemoryStore<D> {
    entries: Mutex<HashMap<ResourceId, D>>,
}

impl<D> MemoryStore<D> {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }
}

impl<D: Clone + Send + Sync> StateStore<D> for MemoryStore<D> {
    fn get(&self, id: &ResourceId) -> Option<D> {
        self.entries.lock().unwrap().get(id).cloned()
    }

    fn put(&self, id: ResourceId, doc: D) {
        self.entries.lock().unwrap().insert(id, doc);
    }

    fn remove(&self, id: &ResourceId) {
        self.entries.lock().unwrap().remove(id);
    }
}
