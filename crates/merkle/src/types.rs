//! Core types for Merkle commitments

use serde::{Deserialize, Serialize};

/// 32-byte hash
pub type Hash32 = [u8; 32];

/// Operand position of the sibling when combining one level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// parent = H(sibling || current)
    Left,
    /// parent = H(current || sibling)
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub side: Side,
    #[serde(with = "hex::serde")]
    pub sibling: Hash32,
}

/// Inclusion proof
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Sibling steps from leaf to root
    pub steps: Vec<ProofStep>,
}

impl MerkleProof {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn push(&mut self, side: Side, sibling: Hash32) {
        self.steps.push(ProofStep { side, sibling });
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Bare sibling list, leaf to root, without sides
    pub fn siblings(&self) -> Vec<Hash32> {
        self.steps.iter().map(|s| s.sibling).collect()
    }
}

impl FromIterator<ProofStep> for MerkleProof {
    fn from_iter<I: IntoIterator<Item = ProofStep>>(iter: I) -> Self {
        Self { steps: iter.into_iter().collect() }
    }
}
