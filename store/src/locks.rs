//! Per-owner write serialization
//!
//! Mutations for the same owner must not interleave (libgit2 index and
//! working-tree updates are not atomic), while distinct owners are fully
//! independent. `OwnerLocks` hands out one mutex per owner; entries live
//! for the life of the process, so a lock handle obtained once stays
//! valid across repository deletion and re-creation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
pub struct OwnerLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl OwnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for `owner`, created on first use.
    pub fn for_owner(&self, owner: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(owner.to_string()).or_default())
    }
}
