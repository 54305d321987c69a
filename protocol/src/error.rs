//! Error types for the authorization protocol.
//!
//! Every fallible operation in the core returns a [`ProtocolError`]. Local
//! structural errors (bad principal, bad argument type, duplicate signature,
//! overlapping footprint) are fail-fast and never retryable: they point at a
//! programming or input mistake, not a transient condition. The one error
//! that *is* worth retrying, [`ProtocolError::InsufficientResourceEstimate`],
//! can only be discovered by the ledger itself after the envelope is applied.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::keys::KeyError;

/// Which part of an invocation failed the air-gapped comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MismatchField {
    /// The root invocation targets a different contract.
    Contract,
    /// The root invocation calls a different function.
    FunctionName,
    /// The root invocation carries a different number of arguments.
    ArgCount,
    /// The argument multiset differs (order is not significant).
    Args,
    /// A batch-level expiration disagrees with an entry's own expiration.
    ExpirationLedger,
    /// A returned entry covers a different invocation tree than the pending one.
    RootInvocation,
    /// A request was prepared for a different network than the signer's.
    Network,
}

impl fmt::Display for MismatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contract => write!(f, "contract"),
            Self::FunctionName => write!(f, "functionName"),
            Self::ArgCount => write!(f, "argCount"),
            Self::Args => write!(f, "args"),
            Self::ExpirationLedger => write!(f, "expirationLedger"),
            Self::RootInvocation => write!(f, "rootInvocation"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// Errors produced by the protocol core.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A principal string or binary address could not be decoded, or has
    /// the wrong kind for where it is used (e.g. a contract as an account key).
    #[error("invalid principal '{input}': {reason}")]
    InvalidPrincipal { input: String, reason: String },

    /// A ledger key kind this protocol never places in a footprint.
    #[error("unsupported ledger key kind: {kind}")]
    UnsupportedLedgerKey { kind: String },

    /// An authorized function other than a contract call.
    #[error("unsupported authorized function: {kind}")]
    UnsupportedInvocation { kind: String },

    /// An argument type outside the fixed value taxonomy was supplied.
    #[error("unsupported argument type: {found}")]
    UnsupportedArgType { found: String },

    /// A typed argument declared a supported type but its value does not parse.
    #[error("invalid {arg_type} argument value: {reason}")]
    InvalidArgValue { arg_type: String, reason: String },

    /// A function name or symbol is not a valid ledger symbol.
    #[error("invalid symbol '{symbol}': {reason}")]
    InvalidSymbol { symbol: String, reason: String },

    /// The same ledger key was declared both read-only and read-write.
    #[error("ledger key appears in both read-only and read-write sets: {key}")]
    OverlappingKeys { key: String },

    /// `sign` was called on an entry that already carries a signature.
    #[error("authorization entry for {principal} (nonce {nonce}) is already signed")]
    AlreadySigned { principal: String, nonce: i64 },

    /// The entry failed verification before signing and can never be signed.
    #[error("authorization entry for {principal} (nonce {nonce}) was rejected")]
    EntryRejected { principal: String, nonce: i64 },

    /// The entry still carries expiration ledger 0, which no ledger accepts.
    /// Entries from simulation arrive this way and need
    /// `AuthorizationEntry::with_expiration` before signing.
    #[error("authorization entry for {principal} (nonce {nonce}) has no expiration ledger")]
    ExpirationNotSet { principal: String, nonce: i64 },

    /// An entry requires a signature from a principal the signer does not own.
    #[error("unexpected signer required by authorization entry: {principal}")]
    UnexpectedSigner { principal: String },

    /// The signing key does not belong to the credential's principal.
    #[error("signing key {key} does not match credential principal {principal}")]
    SignerKeyMismatch { principal: String, key: String },

    /// An operation that needs an address credential got a source-account one.
    #[error("source-account credentials carry no independent signature")]
    NotAddressCredential,

    /// The entry's root invocation does not match what the signer expected.
    #[error("{field} mismatch: expected {expected}, got {actual}")]
    Mismatch {
        field: MismatchField,
        expected: String,
        actual: String,
    },

    /// The contract is not on the air-gapped signer's allow list.
    #[error("contract {contract} is not in the list of allowed contracts")]
    ContractNotAllowed { contract: String },

    /// The signing request carries no entries at all.
    #[error("no authorization entries provided for signing")]
    NoEntriesToSign,

    /// A credential signature value does not have the account signature shape.
    #[error("malformed credential signature: {reason}")]
    MalformedSignature { reason: String },

    /// The signature attached to an entry does not verify over its digest.
    #[error("signature on entry for {principal} (nonce {nonce}) does not verify")]
    InvalidSignature { principal: String, nonce: i64 },

    /// A signed entry returned by the air-gapped side matches no pending entry.
    #[error("signed entry with nonce {nonce} does not correspond to any pending entry")]
    UnknownEntry { nonce: i64 },

    /// Assembly was attempted while an address entry still lacks a signature.
    #[error("authorization entry for {principal} (nonce {nonce}) is not signed")]
    UnsignedEntryPresent { principal: String, nonce: i64 },

    /// The key used to sign the envelope is not the transaction source.
    #[error("envelope signing key {key} is not the source account {source_account}")]
    SourceKeyMismatch { source_account: String, key: String },

    /// The envelope signature does not verify over the transaction hash.
    #[error("envelope signature by {source_account} does not verify over transaction {hash}")]
    InvalidEnvelopeSignature { source_account: String, hash: String },

    /// A required assembly input was never provided to the builder.
    #[error("transaction builder is missing {0}")]
    MissingComponent(&'static str),

    /// `inclusionFee + resourceFee` does not fit the envelope's fee field.
    #[error("total fee {inclusion_fee} + {resource_fee} exceeds the envelope fee limit")]
    FeeOverflow { inclusion_fee: u32, resource_fee: i64 },

    /// A resource estimate carries a fee below zero.
    #[error("resource fee {resource_fee} is negative")]
    NegativeResourceFee { resource_fee: i64 },

    /// The ledger rejected the envelope because a resource figure was too low.
    /// Only observable after submission; retry with corrected figures and
    /// freshly-nonced entries.
    #[error("ledger rejected the invocation for insufficient resources: {detail}")]
    InsufficientResourceEstimate { detail: String },

    /// The ledger rejected the envelope for another reason.
    #[error("ledger rejected the transaction ({code}): {detail}")]
    LedgerRejected { code: String, detail: String },

    /// The ledger-query collaborator failed.
    #[error("ledger query failed: {0}")]
    LedgerQuery(String),

    /// A key operation failed.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// Binary (XDR) encoding or decoding failed.
    #[error("xdr codec error: {0}")]
    Xdr(#[from] stellar_xdr::curr::Error),

    /// JSON encoding or decoding of a work-file value failed.
    #[error("json codec error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Returns `true` when retrying the flow (with fresh nonces) can succeed
    /// without changing code or inputs other than resource figures.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::InsufficientResourceEstimate { .. })
    }

    pub(crate) fn mismatch(
        field: MismatchField,
        expected: impl fmt::Display,
        actual: impl fmt::Display,
    ) -> Self {
        Self::Mismatch {
            field,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_message_names_field() {
        let err = ProtocolError::mismatch(MismatchField::FunctionName, "swap", "drain");
        assert_eq!(
            err.to_string(),
            "functionName mismatch: expected swap, got drain"
        );
    }

    #[test]
    fn only_resource_rejections_are_retryable() {
        let retry = ProtocolError::InsufficientResourceEstimate {
            detail: "cpu".into(),
        };
        assert!(retry.is_retryable());
        assert!(!ProtocolError::NoEntriesToSign.is_retryable());
        assert!(!ProtocolError::OverlappingKeys { key: "k".into() }.is_retryable());
    }

    #[test]
    fn mismatch_field_serializes_camel_case() {
        let json = serde_json::to_string(&MismatchField::ArgCount).unwrap();
        assert_eq!(json, "\"argCount\"");
    }
}
