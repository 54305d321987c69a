//! # Proxy Side
//!
//! The semi-trusted side of the split flow. The proxy talks to the network,
//! builds the invocation and its entries, and packages them into a
//! [`SigningRequest`]. When the air-gapped response comes back it re-attaches
//! each signature to the entry it was made for and checks it before the
//! entry is allowed anywhere near an envelope.
//!
//! ```text
//!   proxy                                    air-gapped
//!   ─────                                    ──────────
//!   entries ── prepare_request ──► request ──► sign_request
//!                                                   │
//!   signed  ◄── apply_response ◄── response ◄───────┘
//! ```
//!
//! Nothing is kept between the two halves: the pending entries are handed
//! back to the caller and passed in again explicitly.

use tracing::{debug, info, warn};

use crate::auth::entry::{parse_nonce, signature_from_base64};
use crate::auth::{verify_signature, AuthorizationEntry};
use crate::config::Network;
use crate::error::{MismatchField, ProtocolError, Result};
use crate::signing::request::{
    AuthPayload, PayloadFormat, SignedEntryPayload, SigningRequest, SigningResponse,
};

/// A request ready to cross the gap, and the entries it is waiting on.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub request: SigningRequest,
    /// The input entries, address entries now `PendingSignature`. Keep
    /// these for [`apply_response`].
    pub pending: Vec<AuthorizationEntry>,
}

/// Packages `entries` for the air-gapped signer.
///
/// Every address entry must be unsigned, not rejected, and carry a real
/// expiration ledger.
pub fn prepare_request(
    network: &Network,
    entries: &[AuthorizationEntry],
    format: PayloadFormat,
) -> Result<PreparedRequest> {
    let pending = entries
        .iter()
        .map(|entry| {
            if let Some(credential) = entry.address_credential() {
                if credential.signature_expiration_ledger == 0 {
                    return Err(ProtocolError::ExpirationNotSet {
                        principal: credential.principal.to_string(),
                        nonce: credential.nonce,
                    });
                }
            }
            let pending = entry.clone().into_pending()?;
            if !pending.is_source_account() {
                debug!(
                    principal = ?pending.principal(),
                    nonce = pending.nonce(),
                    state = ?pending.state(),
                    "entry handed to air-gapped signer"
                );
            }
            Ok(pending)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PreparedRequest {
        request: SigningRequest {
            network: network.clone(),
            auth: AuthPayload::from_entries(&pending, format)?,
        },
        pending,
    })
}

/// Merges the signatures in `response` into `pending`.
///
/// Every returned signature must match a pending entry by nonce, cover the
/// same expiration and invocation tree, and verify over that entry's digest.
/// Pending entries the response does not mention are returned unchanged.
pub fn apply_response(
    pending: &[AuthorizationEntry],
    response: &SigningResponse,
    network: &Network,
) -> Result<Vec<AuthorizationEntry>> {
    let mut merged = pending.to_vec();

    for payload in &response.entries {
        let (nonce, candidate) = match payload {
            SignedEntryPayload::Raw {
                signature,
                nonce,
                signature_expiration_ledger,
            } => {
                let nonce = parse_nonce(nonce)?;
                let slot = find_pending(&merged, nonce)?;
                let base = &merged[slot];
                if base.signature_expiration_ledger() != Some(*signature_expiration_ledger) {
                    return Err(ProtocolError::mismatch(
                        MismatchField::ExpirationLedger,
                        base.signature_expiration_ledger().unwrap_or_default(),
                        signature_expiration_ledger,
                    ));
                }
                let signature = signature_from_base64(signature)?.ok_or_else(|| {
                    ProtocolError::MalformedSignature {
                        reason: "response carries an empty signature".into(),
                    }
                })?;
                (nonce, base.with_signature(signature)?)
            }
            SignedEntryPayload::Xdr { auth_entry_xdr } => {
                let returned = AuthorizationEntry::from_base64(auth_entry_xdr)?;
                let nonce = returned
                    .nonce()
                    .ok_or(ProtocolError::NotAddressCredential)?;
                let base = &merged[find_pending(&merged, nonce)?];
                if !base.covers_same_authorization(&returned) {
                    warn!(nonce, "returned entry differs from the pending one");
                    return Err(ProtocolError::mismatch(
                        MismatchField::RootInvocation,
                        base.root_invocation(),
                        returned.root_invocation(),
                    ));
                }
                (nonce, returned)
            }
        };

        verify_signature(&candidate, network)?;
        let slot = find_pending(&merged, nonce)?;
        merged[slot] = candidate;
        debug!(nonce, "signature verified and attached");
    }

    info!(
        returned = response.entries.len(),
        signer = %response.signer,
        "applied air-gapped signatures"
    );
    Ok(merged)
}

fn find_pending(entries: &[AuthorizationEntry], nonce: i64) -> Result<usize> {
    entries
        .iter()
        .position(|e| e.nonce() == Some(nonce))
        .ok_or(ProtocolError::UnknownEntry { nonce })
}
