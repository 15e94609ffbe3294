//! Cryptographic utilities for the custody engine
//!
//! This module provides:
//! - SHA-256 hashing
//! - Deterministic address derivation

pub mod hash;

pub use hash::{derive_address, sha256, sha256_hex, ADDRESS_HEX_LEN};
