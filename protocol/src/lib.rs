// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Authgap Protocol: Core Library
//!
//! Multi-party authorization for metered smart-contract invocations. A
//! transaction that calls into a contract must say up front which ledger
//! slots it touches, what it may spend, and who has agreed to it. This crate
//! builds all three and lets the "who has agreed" part be signed on a
//! machine that never sees the network.
//!
//! ## Architecture
//!
//! Leaf-first, each module only depends on the ones above it:
//!
//! - **address**: Principals (accounts and contracts) and their encodings.
//! - **value**: The fixed argument value taxonomy.
//! - **ledger**: Ledger keys, footprints, resource estimates, the query seam.
//! - **invocation**: The authorized invocation tree.
//! - **auth**: Authorization entries: create, digest, sign, match, re-nonce.
//! - **signing**: Co-located signing and the proxy / air-gapped split.
//! - **transaction**: Envelope assembly, signing and failure classification.
//! - **config**: Network identities, fees and ledger timing.
//! - **crypto**: Ed25519 keys and SHA-256.
//!
//! ## Design Philosophy
//!
//! 1. The core does no I/O. Ledger reads come in through [`ledger::LedgerQuery`].
//! 2. A signature only ever attaches to the invocation it was made over.
//! 3. Nonces are random and never reused; a retry re-nonces.
//! 4. Binary and JSON forms are codecs at the edge. The domain types are the
//!    source of truth.

pub mod address;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod invocation;
pub mod ledger;
pub mod signing;
pub mod transaction;
pub mod value;

pub use address::Principal;
pub use auth::AuthorizationEntry;
pub use config::{FeeConfig, Network};
pub use error::{MismatchField, ProtocolError, Result};
pub use invocation::InvocationNode;
pub use transaction::{SignedTransactionEnvelope, TransactionBuilder};
pub use value::Value;
