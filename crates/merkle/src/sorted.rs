//! Sorted-pair proofs
//!
//! Many deployed Solidity registries combine each pair in ascending byte
//! order and ship proofs as bare sibling arrays. These helpers verify such
//! proofs and resolve them into explicit-direction `MerkleProof`s, so the
//! ordered verifier can consume them unchanged.

use crate::{Hash32, Hasher, MerkleProof, Side};

fn side_for(current: &Hash32, sibling: &Hash32) -> Side {
    if current <= sibling {
        Side::Right
    } else {
        Side::Left
    }
}

/// Verify a bare sibling array under the sorted-pair discipline
pub fn verify_sorted<H: Hasher + ?Sized>(
    hasher: &H,
    root: Hash32,
    leaf: Hash32,
    siblings: &[Hash32],
) -> bool {
    let computed = siblings.iter().fold(leaf, |current, sibling| {
        match side_for(&current, sibling) {
            Side::Left => hasher.combine(sibling, &current),
            Side::Right => hasher.combine(&current, sibling),
        }
    });
    computed == root
}

impl MerkleProof {
    /// Recover the side of every step of a sorted-pair proof for `leaf`
    pub fn from_sorted_siblings<H: Hasher + ?Sized>(
        hasher: &H,
        leaf: Hash32,
        siblings: &[Hash32],
    ) -> Self {
        let mut proof = MerkleProof::new();
        let mut current = leaf;
        for sibling in siblings {
            let side = side_for(&current, sibling);
            current = match side {
                Side::Left => hasher.combine(sibling, &current),
                Side::Right => hasher.combine(&current, sibling),
            };
            proof.push(side, *sibling);
        }
        proof
    }
}
