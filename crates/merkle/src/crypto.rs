//! Hash primitives

use crate::Hash32;
use sha3::Digest as _;

pub trait Hasher: Send + Sync {
    fn hash(&self, data: &[u8]) -> Hash32;

    /// Parent node: H(left || right)
    ///
    /// Operand order is part of the commitment; `combine(a, b)` and
    /// `combine(b, a)` differ for `a != b`.
    fn combine(&self, left: &Hash32, right: &Hash32) -> Hash32 {
        let mut data = [0u8; 64];
        data[..32].copy_from_slice(left);
        data[32..].copy_from_slice(right);
        self.hash(&data)
    }
}

impl<H: Hasher + ?Sized> Hasher for &H {
    fn hash(&self, data: &[u8]) -> Hash32 {
        (**self).hash(data)
    }

    fn combine(&self, left: &Hash32, right: &Hash32) -> Hash32 {
        (**self).combine(left, right)
    }
}

/// Keccak-256 as used by Ethereum (pre-standard padding, not NIST SHA3-256)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Keccak256;

impl Hasher for Keccak256 {
    fn hash(&self, data: &[u8]) -> Hash32 {
        let digest = sha3::Keccak256::digest(data);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Blake3;

impl Hasher for Blake3 {
    fn hash(&self, data: &[u8]) -> Hash32 {
        blake3::hash(data).into()
    }
}
