//! Hashing utilities for custody addresses
//!
//! Provides the SHA-256 helpers used to derive a deterministic custody
//! address from a signer set.

use sha2::{Digest, Sha256};

/// Number of hex characters kept from the digest when forming an address
pub const ADDRESS_HEX_LEN: usize = 40;

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Derive a `0x`-prefixed address from arbitrary preimage bytes
///
/// Address = "0x" || hex(SHA256(preimage))[..40]
pub fn derive_address(preimage: &[u8]) -> String {
    let digest = sha256_hex(preimage);
    format!("0x{}", &digest[..ADDRESS_HEX_LEN])
}
