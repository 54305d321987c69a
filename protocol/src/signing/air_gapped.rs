//! # Air-Gapped Signer
//!
//! The fully-trusted side of the split flow. It holds the principal's key,
//! never touches the network, and trusts nothing in the request it is
//! handed. Before signing anything it re-derives what it should be signing
//! from the operator's [`SigningInstruction`]:
//!
//! ```text
//!   instruction ──► expected root call
//!                        │
//!   request ──► entries ─┼─► source account?  skip
//!                        ├─► other principal? abort (UnexpectedSigner)
//!                        ├─► root differs?    abort (Mismatch)
//!                        └─► sign
//! ```
//!
//! The whole batch is rejected on the first problem: a response is either
//! complete or not produced at all.
//!
//! The instruction names only the root call. Every call below it is logged
//! at `info` before anything is signed, so the operator sees the whole tree
//! the signature will cover.

use tracing::{debug, info, warn};

use crate::address::Principal;
use crate::auth::entry::signature_to_base64;
use crate::auth::{sign, verify_matches, AuthorizationEntry};
use crate::config::Network;
use crate::crypto::keys::Keypair;
use crate::error::{MismatchField, ProtocolError, Result};
use crate::signing::request::{
    PayloadFormat, SignedEntryPayload, SigningInstruction, SigningRequest, SigningResponse,
};

/// The signer's verdict on one address entry of a request.
#[derive(Debug)]
pub struct EntryReview {
    /// `PendingSignature` if it matched the instruction, `Rejected` if not.
    pub entry: AuthorizationEntry,
    /// Why a rejected entry was refused.
    pub mismatch: Option<ProtocolError>,
}

/// Holds one principal's key and the contracts it may authorize.
pub struct AirGappedSigner {
    keypair: Keypair,
    network: Network,
    allowed_contracts: Vec<Principal>,
}

impl AirGappedSigner {
    /// A signer that will only authorize calls into `allowed_contracts`.
    /// An empty list authorizes nothing.
    pub fn new(keypair: Keypair, network: Network, allowed_contracts: Vec<Principal>) -> Self {
        Self {
            keypair,
            network,
            allowed_contracts,
        }
    }

    pub fn principal(&self) -> Principal {
        self.keypair.principal()
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Checks every address entry in `request` against `instruction`
    /// without signing anything.
    ///
    /// Request-level problems (wrong network, contract not allowed, no
    /// entries, an entry for another principal) are errors. Per-entry
    /// verification results come back as [`EntryReview`]s. Source-account
    /// entries are left out.
    pub fn review(
        &self,
        instruction: &SigningInstruction,
        request: &SigningRequest,
    ) -> Result<Vec<EntryReview>> {
        if request.network != self.network {
            return Err(ProtocolError::mismatch(
                MismatchField::Network,
                self.network.passphrase(),
                request.network.passphrase(),
            ));
        }

        let expected = instruction.expected_invocation()?;
        if !self.allowed_contracts.contains(&expected.contract) {
            warn!(contract = %expected.contract, "contract not on the allow list");
            return Err(ProtocolError::ContractNotAllowed {
                contract: expected.contract.to_string(),
            });
        }

        let entries = request.auth.entries()?;
        if entries.is_empty() {
            return Err(ProtocolError::NoEntriesToSign);
        }

        let me = self.principal();
        let mut reviews = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(principal) = entry.principal() else {
                debug!("skipping source-account entry");
                continue;
            };
            if principal != me {
                warn!(%principal, "request asks for a signature this signer cannot give");
                return Err(ProtocolError::UnexpectedSigner {
                    principal: principal.to_string(),
                });
            }
            let review = match verify_matches(&entry, &expected) {
                Ok(()) => EntryReview {
                    entry: entry.into_pending()?,
                    mismatch: None,
                },
                Err(err) => EntryReview {
                    entry: entry.into_rejected(),
                    mismatch: Some(err),
                },
            };
            reviews.push(review);
        }
        Ok(reviews)
    }

    /// Verifies and signs the entries in `request` that belong to this
    /// signer, answering in the instruction's output format (or the
    /// request's, if the instruction names none).
    pub fn sign_request(
        &self,
        instruction: &SigningInstruction,
        request: &SigningRequest,
    ) -> Result<SigningResponse> {
        let mut pending = Vec::new();
        for review in self.review(instruction, request)? {
            if let Some(err) = review.mismatch {
                warn!(
                    principal = ?review.entry.principal(),
                    nonce = review.entry.nonce(),
                    state = ?review.entry.state(),
                    error = %err,
                    "root invocation does not match the instruction"
                );
                return Err(err);
            }
            pending.push(review.entry);
        }
        if pending.is_empty() {
            return Err(ProtocolError::NoEntriesToSign);
        }

        for entry in &pending {
            log_covered_calls(entry);
        }
        let signed = pending
            .iter()
            .map(|entry| sign(entry, &self.keypair, &self.network))
            .collect::<Result<Vec<_>>>()?;

        let format = instruction
            .output_format
            .unwrap_or_else(|| request.auth.format());
        let payloads = signed
            .iter()
            .map(|e| signed_payload(e, format))
            .collect::<Result<Vec<_>>>()?;

        info!(
            signer = %self.principal(),
            signed = payloads.len(),
            format = %format,
            "air-gapped signing complete"
        );
        Ok(SigningResponse {
            signer: self.principal(),
            entries: payloads,
        })
    }
}

/// Logs every call `entry`'s signature will authorize, sub-invocations
/// included.
fn log_covered_calls(entry: &AuthorizationEntry) {
    let root = entry.root_invocation();
    info!(
        nonce = entry.nonce(),
        expiration_ledger = entry.signature_expiration_ledger(),
        calls = root.call_count(),
        "signing authorization for {}",
        root
    );
    for (depth, call) in root.walk().into_iter().skip(1) {
        info!(nonce = entry.nonce(), depth, "  covers {}", call);
    }
}

impl std::fmt::Debug for AirGappedSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirGappedSigner")
            .field("principal", &self.principal())
            .field("network", &self.network.name())
            .field("allowed_contracts", &self.allowed_contracts)
            .finish()
    }
}

fn signed_payload(
    entry: &AuthorizationEntry,
    format: PayloadFormat,
) -> Result<SignedEntryPayload> {
    match format {
        PayloadFormat::Xdr => Ok(SignedEntryPayload::Xdr {
            auth_entry_xdr: entry.to_base64()?,
        }),
        PayloadFormat::Raw => {
            let credential = entry
                .address_credential()
                .ok_or(ProtocolError::NotAddressCredential)?;
            let signature =
                credential
                    .signature
                    .as_ref()
                    .ok_or_else(|| ProtocolError::UnsignedEntryPresent {
                        principal: credential.principal.to_string(),
                        nonce: credential.nonce,
                    })?;
            Ok(SignedEntryPayload::Raw {
                signature: signature_to_base64(signature)?,
                nonce: credential.nonce.to_string(),
                signature_expiration_ledger: credential.signature_expiration_ledger,
            })
        }
    }
}
