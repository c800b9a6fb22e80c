//! Merkle Commitments for Certificate Batches
//!
//! Builds canonical roots over ordered leaf hashes, emits inclusion proofs
//! with explicit left/right steps, and verifies them. Everything in this
//! crate is a pure function of its inputs.

mod crypto;
mod encoding;
mod sorted;
mod tree;
mod types;
mod verify;

pub use crypto::{Blake3, Hasher, Keccak256};
pub use encoding::{encode_hash, parse_hash, parse_hashes};
pub use sorted::verify_sorted;
pub use tree::{build_proof, build_root, MerkleTree};
pub use types::{Hash32, MerkleProof, ProofStep, Side};
pub use verify::{compute_root, verify};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MerkleError {
    #[error("Cannot build a Merkle tree from zero leaves")]
    EmptyInput,

    #[error("Leaf index {index} out of range for {leaf_count} leaves")]
    IndexOutOfRange { index: usize, leaf_count: usize },

    #[error("Invalid hash encoding: {0}")]
    InvalidHex(String),
}

pub type Result<T> = std::result::Result<T, MerkleError>;
