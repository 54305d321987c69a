//! # Transaction Module
//!
//! Assembly and signing of the envelope that carries one contract
//! invocation, its footprint and resources, and its authorization entries.
//!
//! ## Architecture
//!
//! ```text
//! builder.rs     Fluent TransactionBuilder: validation, fee and sequence
//! envelope.rs    SignedTransactionEnvelope: immutable, hash + XDR/base64
//! submission.rs  Classifies ledger rejections after submission
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Collect**: footprint and resources, root invocation, signed entries.
//! 2. **Assemble**: [`TransactionBuilder::assemble`] checks every entry is
//!    signed, sums the fee and takes the next sequence number.
//! 3. **Sign**: the source account signs the network-bound transaction hash.
//! 4. **Submit**: outside the core; the envelope leaves as base64 XDR.
//! 5. **Classify**: a rejection goes through [`classify_apply_failure`].
//!    [`crate::error::ProtocolError::InsufficientResourceEstimate`] means
//!    rerun with corrected resources and re-nonced entries.
//!
//! ## Design Decisions
//!
//! - The total fee is `inclusion_fee + resource_fee` and nothing else. A sum
//!   that does not fit the 32-bit fee field is an error, not a clamp.
//! - Each assembly consumes `current + 1`. A rejected envelope is rebuilt
//!   from a fresh sequence read, never resubmitted with a bumped copy.
//! - The envelope has no setters. Anything that changes the transaction
//!   means assembling a new one.

pub mod builder;
pub mod envelope;
pub mod submission;

pub use builder::TransactionBuilder;
pub use envelope::{transaction_hash, SignedTransactionEnvelope};
pub use submission::classify_apply_failure;
