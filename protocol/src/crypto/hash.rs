//! # Hashing Utilities
//!
//! The ledger hashes everything with SHA-256: the network id, the
//! authorization payload, the transaction signature payload, and the
//! built-in asset contract ids. This is the only place the protocol touches
//! `sha2` directly.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data.
///
/// # Example
///
/// ```
/// use authgap_protocol::crypto::sha256_array;
///
/// let hash = sha256_array(b"authgap");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256_array(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
