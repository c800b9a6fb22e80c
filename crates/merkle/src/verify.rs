//! Proof verification
//!
//! Mirrors the builder exactly: a `Left` step means the sibling was the left
//! operand at that level, a `Right` step means the running hash was.

use crate::{Hash32, Hasher, MerkleProof, Side};

/// Fold a leaf through the proof steps
pub fn compute_root<H: Hasher + ?Sized>(hasher: &H, leaf: Hash32, proof: &MerkleProof) -> Hash32 {
    proof.steps.iter().fold(leaf, |current, step| match step.side {
        Side::Left => hasher.combine(&step.sibling, &current),
        Side::Right => hasher.combine(&current, &step.sibling),
    })
}

/// True iff `proof` links `leaf` to `root`. Never errors on malformed input.
pub fn verify<H: Hasher + ?Sized>(
    hasher: &H,
    root: Hash32,
    leaf: Hash32,
    proof: &MerkleProof,
) -> bool {
    compute_root(hasher, leaf, proof) == root
}
