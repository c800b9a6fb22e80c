//! Canonical Merkle tree over an ordered leaf set
//!
//! Layer 0 holds the leaves. Every following layer pairs adjacent nodes
//! left-to-right with `Hasher::combine`. An unpaired last node is promoted
//! to the next layer unchanged, never duplicated, so a proof only carries a
//! step for the levels where the path node actually has a sibling.

use crate::{Hash32, Hasher, Keccak256, MerkleError, MerkleProof, Result, Side};

pub struct MerkleTree<H: Hasher = Keccak256> {
    hasher: H,
    /// layers[0] = leaves, layers[depth] = [root]
    layers: Vec<Vec<Hash32>>,
}

impl<H: Hasher> MerkleTree<H> {
    pub fn new(hasher: H, leaves: &[Hash32]) -> Result<Self> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyInput);
        }

        let mut layers = vec![leaves.to_vec()];
        loop {
            let top = &layers[layers.len() - 1];
            if top.len() == 1 {
                break;
            }
            let next = next_layer(&hasher, top);
            layers.push(next);
        }

        Ok(Self { hasher, layers })
    }

    pub fn root(&self) -> Hash32 {
        self.layers[self.depth()][0]
    }

    /// Number of combine levels (0 for a single leaf)
    pub fn depth(&self) -> usize {
        self.layers.len() - 1
    }

    pub fn leaf_count(&self) -> usize {
        self.layers[0].len()
    }

    pub fn leaves(&self) -> &[Hash32] {
        &self.layers[0]
    }

    pub fn layers(&self) -> &[Vec<Hash32>] {
        &self.layers
    }

    pub fn proof(&self, index: usize) -> Result<MerkleProof> {
        let leaf_count = self.leaf_count();
        if index >= leaf_count {
            return Err(MerkleError::IndexOutOfRange { index, leaf_count });
        }

        let mut proof = MerkleProof::new();
        let mut position = index;
        for layer in &self.layers[..self.depth()] {
            // promoted odd node: no sibling at this level
            if let Some(sibling) = layer.get(position ^ 1) {
                let side = if position % 2 == 0 { Side::Right } else { Side::Left };
                proof.push(side, *sibling);
            }
            position /= 2;
        }
        Ok(proof)
    }

    /// Check a proof against this tree's root
    pub fn verify(&self, leaf: Hash32, proof: &MerkleProof) -> bool {
        crate::verify(&self.hasher, self.root(), leaf, proof)
    }
}

/// Root over `leaves` without keeping intermediate layers
pub fn build_root<H: Hasher + ?Sized>(hasher: &H, leaves: &[Hash32]) -> Result<Hash32> {
    if leaves.is_empty() {
        return Err(MerkleError::EmptyInput);
    }

    let mut layer = leaves.to_vec();
    while layer.len() > 1 {
        layer = next_layer(hasher, &layer);
    }
    Ok(layer[0])
}

pub fn build_proof<H: Hasher + ?Sized>(
    hasher: &H,
    leaves: &[Hash32],
    index: usize,
) -> Result<MerkleProof> {
    if index >= leaves.len() {
        return Err(MerkleError::IndexOutOfRange { index, leaf_count: leaves.len() });
    }
    MerkleTree::new(hasher, leaves)?.proof(index)
}

fn next_layer<H: Hasher + ?Sized>(hasher: &H, layer: &[Hash32]) -> Vec<Hash32> {
    layer
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => hasher.combine(left, right),
            _ => pair[0],
        })
        .collect()
}
