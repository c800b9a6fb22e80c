//! Status store trait and in-memory implementation

use crate::Status;
use merkle::Hash32;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Journal corrupted at record {sequence}: {reason}")]
    Corrupted { sequence: u64, reason: String },

    #[error("Journal halted after a write that could not be rolled back")]
    Halted,
}

/// Backing map of root -> status. Absence means `Status::Unknown`.
///
/// Implementations never delete entries; the registry only calls `put` with
/// a status that moves the root forward.
pub trait StatusStore: Send + Sync {
    fn get(&self, root: &Hash32) -> Option<Status>;

    /// Record `status` for `root`. Never called with `Status::Unknown`,
    /// which is represented by absence.
    fn put(&mut self, root: Hash32, status: Status) -> Result<(), StoreError>;
    fn entries(&self) -> Vec<(Hash32, Status)>;
}

/// In-memory store (for testing and demos)
#[derive(Clone, Debug, Default)]
pub struct InMemoryStatusStore {
    statuses: HashMap<Hash32, Status>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self { statuses: HashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

impl StatusStore for InMemoryStatusStore {
    fn get(&self, root: &Hash32) -> Option<Status> {
        self.statuses.get(root).copied()
    }

    fn put(&mut self, root: Hash32, status: Status) -> Result<(), StoreError> {
        debug_assert_ne!(status, Status::Unknown, "Unknown is never stored");
        self.statuses.insert(root, status);
        Ok(())
    }

    fn entries(&self) -> Vec<(Hash32, Status)> {
        self.statuses.iter().map(|(r, s)| (*r, *s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_root_has_no_entry() {
        let store = InMemoryStatusStore::new();
        assert_eq!(store.get(&[7u8; 32]), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_put_then_get() {
        let mut store = InMemoryStatusStore::new();
        store.put([1u8; 32], Status::Issued).unwrap();
        store.put([1u8; 32], Status::Invalidated).unwrap();

        assert_eq!(store.get(&[1u8; 32]), Some(Status::Invalidated));
        assert_eq!(store.len(), 1);
        assert_eq!(store.entries(), vec![([1u8; 32], Status::Invalidated)]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "Unknown is never stored")]
    fn test_put_unknown_rejected() {
        let mut store = InMemoryStatusStore::new();
        let _ = store.put([1u8; 32], Status::Unknown);
    }
}
