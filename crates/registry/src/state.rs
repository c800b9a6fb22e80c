//! Root lifecycle state
//!
//! The only component that mutates root statuses. A single lock around the
//! store makes every issue/invalidate a linearizable read-modify-write, so a
//! status read never observes a half-applied revocation.

use crate::{InMemoryStatusStore, Result, Status, StatusStore, Transition};
use merkle::{encode_hash, Hash32};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

pub struct RegistryState<S: StatusStore = InMemoryStatusStore> {
    store: RwLock<S>,
}

impl RegistryState<InMemoryStatusStore> {
    pub fn new() -> Self {
        Self::with_store(InMemoryStatusStore::new())
    }
}

impl Default for RegistryState<InMemoryStatusStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: StatusStore> RegistryState<S> {
    pub fn with_store(store: S) -> Self {
        Self { store: RwLock::new(store) }
    }

    pub fn status(&self, root: &Hash32) -> Status {
        self.read().get(root).unwrap_or(Status::Unknown)
    }

    pub fn is_issued(&self, root: &Hash32) -> bool {
        self.status(root) == Status::Issued
    }

    /// Unknown -> Issued. No-op for Issued and Invalidated roots.
    pub fn issue(&self, root: Hash32) -> Result<Transition> {
        self.advance(root, Status::after_issue)
    }

    /// Any -> Invalidated, including roots that were never issued.
    pub fn invalidate(&self, root: Hash32) -> Result<Transition> {
        self.advance(root, Status::after_invalidate)
    }

    /// Snapshot of every known root, ordered by root bytes
    pub fn entries(&self) -> Vec<(Hash32, Status)> {
        let mut entries = self.read().entries();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn into_inner(self) -> S {
        self.store.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn advance(&self, root: Hash32, next: fn(Status) -> Status) -> Result<Transition> {
        let mut store = self.write();
        let previous = store.get(&root).unwrap_or(Status::Unknown);
        let current = next(previous);
        let transition = Transition { root, previous, current };

        if transition.changed() {
            store.put(root, current)?;
            info!(root = %encode_hash(&root), %previous, %current, "root status changed");
        } else {
            debug!(root = %encode_hash(&root), status = %current, "root status unchanged");
        }
        Ok(transition)
    }

    // Writers never leave the store half-updated, so a poisoned lock is safe to reuse.
    fn read(&self) -> RwLockReadGuard<'_, S> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, S> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}
