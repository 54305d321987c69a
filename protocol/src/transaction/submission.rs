//! Classification of ledger rejections.
//!
//! Submission and polling live outside the core. Whoever submits the
//! envelope hands the ledger's result code and diagnostic text back here to
//! turn them into a [`ProtocolError`] callers can branch on. Resource
//! shortfalls are the only retryable outcome; everything else is surfaced
//! as-is.

use tracing::warn;

use crate::error::ProtocolError;

/// Result codes that mean a resource figure in the envelope was too low.
///
/// Covers both the operation-level invoke results and the transaction-level
/// fee shortfall. Matching is case-insensitive and ignores `_` and `-`, so
/// `RESOURCE_LIMIT_EXCEEDED`, `resourceLimitExceeded` and
/// `InvokeHostFunctionResourceLimitExceeded` all classify the same way.
const RESOURCE_CODES: &[&str] = &[
    "resourcelimitexceeded",
    "insufficientrefundablefee",
    "txsorobaninvalid",
    "txinsufficientfee",
];

fn normalize(code: &str) -> String {
    code.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Maps a ledger apply failure to a protocol error.
///
/// The detail text is carried verbatim.
pub fn classify_apply_failure(code: &str, detail: &str) -> ProtocolError {
    let normalized = normalize(code);
    let insufficient = RESOURCE_CODES
        .iter()
        .any(|known| normalized.ends_with(known));

    warn!(code, insufficient, "ledger rejected the transaction");

    if insufficient {
        ProtocolError::InsufficientResourceEstimate {
            detail: detail.to_string(),
        }
    } else {
        ProtocolError::LedgerRejected {
            code: code.to_string(),
            detail: detail.to_string(),
        }
    }
}
