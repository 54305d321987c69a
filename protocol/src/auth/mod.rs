//! # Authorization Entries
//!
//! An authorization entry states that one principal permits one invocation
//! tree, under a nonce, until an expiration ledger. Entries for the
//! transaction source ride on the envelope signature; every other principal
//! signs its entry independently, possibly on an isolated machine.
//!
//! - [`credential`]: credential kinds and the account signature encoding.
//! - [`entry`]: the entry value, its binary and structured forms.
//! - [`engine`]: creation, digest, signing and matching.

pub mod credential;
pub mod engine;
pub mod entry;

pub use credential::{AddressCredential, Credential, EntrySignature};
pub use engine::{
    create_unsigned_entry, create_unsigned_entry_with, digest_for_signing, renonce, renonce_with,
    sign, signature_preimage, verify_matches, verify_signature, NonceSource, OsNonceSource,
};
pub use entry::{
    AddressCredentialParams, AuthEntryParams, AuthorizationEntry, CredentialParams, EntryState,
};
