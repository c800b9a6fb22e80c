//! Certificate Registry
//!
//! Tracks the lifecycle of published Merkle roots and answers whether a
//! credential, presented with its inclusion proof, is currently valid.

pub mod access;
pub mod config;
pub mod journal;
pub mod service;
pub mod state;
pub mod status;
pub mod store;

pub use access::{AccessPolicy, Action, AllowList, CallerId, OwnerOnly, Permit};
pub use config::{ConfigError, RegistryConfig};
pub use journal::{JournalRecord, JournalSink, JournalStatusStore};
pub use service::{ProofCheck, RegistryService};
pub use state::RegistryState;
pub use status::{Status, Transition};
pub use store::{InMemoryStatusStore, StatusStore, StoreError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Caller {caller} may not {action}")]
    Unauthorized { caller: CallerId, action: Action },

    #[error("Permit for {actual} cannot be used to {expected}")]
    PermitMismatch { expected: Action, actual: Action },
}

pub type Result<T> = std::result::Result<T, RegistryError>;
