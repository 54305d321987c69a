//! # Cryptographic Primitives
//!
//! Thin wrappers over audited implementations:
//!
//! - **Ed25519** (`ed25519-dalek`) for authorization and envelope signatures.
//! - **SHA-256** (`sha2`) for network ids, signature payloads and contract ids.
//!
//! Nothing here is clever on purpose.

pub mod hash;
pub mod keys;

pub use hash::sha256_array;
pub use keys::{verify_signature, KeyError, Keypair};
