//! Textual hash encoding (`0x` + 64 lowercase hex digits)

use crate::{Hash32, MerkleError, Result};

pub fn parse_hash(s: &str) -> Result<Hash32> {
    let s = s.trim();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);

    if digits.len() != 64 {
        return Err(MerkleError::InvalidHex(format!(
            "expected 64 hex digits, got {}",
            digits.len()
        )));
    }

    let mut out = [0u8; 32];
    hex::decode_to_slice(digits, &mut out).map_err(|e| MerkleError::InvalidHex(e.to_string()))?;
    Ok(out)
}

/// Parse an ordered list of hashes, failing on the first bad entry
pub fn parse_hashes<S: AsRef<str>>(items: &[S]) -> Result<Vec<Hash32>> {
    items.iter().map(|s| parse_hash(s.as_ref())).collect()
}

pub fn encode_hash(hash: &Hash32) -> String {
    format!("0x{}", hex::encode(hash))
}
