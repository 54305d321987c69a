//! Authorization entries.
//!
//! ```text
//!              prepare_request / review
//!   Unsigned ───────────────────────────► PendingSignature ───► Signed
//!      │  │                                                       ▲
//!      │  └───────────────────────── sign ────────────────────────┘
//!      │ verify_matches fails
//!      ▼
//!   Rejected
//! ```
//!
//! An entry's fields are private: once a signature is attached nothing it
//! covers can change. Re-noncing produces a fresh unsigned entry.
//!
//! The pending and rejected stages are local to the process holding the
//! entry. They are not part of either wire form, so an entry decoded from a
//! request or a work-file always starts out `Unsigned`.

use serde::{Deserialize, Serialize};
use stellar_xdr::curr::{Limits, ReadXdr, SorobanAuthorizationEntry, WriteXdr};

use crate::address::Principal;
use crate::auth::credential::{AddressCredential, Credential, EntrySignature};
use crate::error::{ProtocolError, Result};
use crate::invocation::{InvocationNode, InvocationParams};

/// Lifecycle of an entry as it moves between the proxy and the signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryState {
    Unsigned,
    PendingSignature,
    Signed,
    Rejected,
}

/// The authorization one principal gives for one invocation tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthorizationEntry {
    credential: Credential,
    root_invocation: InvocationNode,
    /// Stage of an unsigned address entry. Never `Signed`: an attached
    /// signature decides that.
    stage: EntryState,
}

impl AuthorizationEntry {
    pub(crate) fn new(credential: Credential, root_invocation: InvocationNode) -> Self {
        Self {
            credential,
            root_invocation,
            stage: EntryState::Unsigned,
        }
    }

    /// An entry authorized by the transaction source's envelope signature.
    pub fn source_account(root_invocation: InvocationNode) -> Self {
        Self::new(Credential::SourceAccount, root_invocation)
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn root_invocation(&self) -> &InvocationNode {
        &self.root_invocation
    }

    pub fn address_credential(&self) -> Option<&AddressCredential> {
        match &self.credential {
            Credential::Address(c) => Some(c),
            Credential::SourceAccount => None,
        }
    }

    /// The principal that must sign, or `None` for source-account entries.
    pub fn principal(&self) -> Option<Principal> {
        self.address_credential().map(|c| c.principal)
    }

    pub fn nonce(&self) -> Option<i64> {
        self.address_credential().map(|c| c.nonce)
    }

    pub fn signature_expiration_ledger(&self) -> Option<u32> {
        self.address_credential()
            .map(|c| c.signature_expiration_ledger)
    }

    pub fn signature(&self) -> Option<&EntrySignature> {
        self.address_credential().and_then(|c| c.signature.as_ref())
    }

    pub fn is_source_account(&self) -> bool {
        matches!(self.credential, Credential::SourceAccount)
    }

    /// `Signed` once a signature is attached. Source-account entries report
    /// `Signed` because the envelope signature covers them.
    pub fn state(&self) -> EntryState {
        match &self.credential {
            Credential::SourceAccount => EntryState::Signed,
            Credential::Address(c) if c.signature.is_some() => EntryState::Signed,
            Credential::Address(_) => self.stage,
        }
    }

    /// This entry with its signature expiration set to `ledger`.
    ///
    /// Entries produced by simulation carry expiration 0 and must go through
    /// here before they are signed. Only unsigned address entries can be
    /// changed; the expiration is part of what a signature covers.
    pub fn with_expiration(&self, ledger: u32) -> Result<Self> {
        let credential = self.signable_credential()?;
        Ok(Self {
            credential: Credential::Address(AddressCredential {
                signature_expiration_ledger: ledger,
                ..credential.clone()
            }),
            root_invocation: self.root_invocation.clone(),
            stage: self.stage,
        })
    }

    /// The address credential, if this entry may still receive a signature.
    pub(crate) fn signable_credential(&self) -> Result<&AddressCredential> {
        let credential = self
            .address_credential()
            .ok_or(ProtocolError::NotAddressCredential)?;
        if credential.signature.is_some() {
            return Err(ProtocolError::AlreadySigned {
                principal: credential.principal.to_string(),
                nonce: credential.nonce,
            });
        }
        if self.stage == EntryState::Rejected {
            return Err(ProtocolError::EntryRejected {
                principal: credential.principal.to_string(),
                nonce: credential.nonce,
            });
        }
        Ok(credential)
    }

    /// Marks an unsigned address entry as handed out for signing.
    /// Source-account entries pass through unchanged.
    pub(crate) fn into_pending(self) -> Result<Self> {
        if self.is_source_account() {
            return Ok(self);
        }
        self.signable_credential()?;
        Ok(Self {
            stage: EntryState::PendingSignature,
            ..self
        })
    }

    /// Marks an unsigned entry as refused. Nothing can sign it afterwards.
    pub(crate) fn into_rejected(self) -> Self {
        match self.state() {
            EntryState::Unsigned | EntryState::PendingSignature => Self {
                stage: EntryState::Rejected,
                ..self
            },
            EntryState::Signed | EntryState::Rejected => self,
        }
    }

    /// This entry with `signature` attached. Refuses to replace an existing
    /// signature or to sign a rejected entry.
    pub(crate) fn with_signature(&self, signature: EntrySignature) -> Result<Self> {
        let credential = self.signable_credential()?;
        Ok(Self::new(
            Credential::Address(AddressCredential {
                signature: Some(signature),
                ..credential.clone()
            }),
            self.root_invocation.clone(),
        ))
    }

    /// Whether `other` carries the same credential (ignoring signature) and
    /// the same invocation tree.
    pub fn covers_same_authorization(&self, other: &AuthorizationEntry) -> bool {
        let strip = |c: &Credential| match c {
            Credential::Address(a) => Credential::Address(AddressCredential {
                signature: None,
                ..a.clone()
            }),
            Credential::SourceAccount => Credential::SourceAccount,
        };
        strip(&self.credential) == strip(&other.credential)
            && self.root_invocation == other.root_invocation
    }

    // -----------------------------------------------------------------------
    // Binary form
    // -----------------------------------------------------------------------

    pub fn to_xdr(&self) -> Result<SorobanAuthorizationEntry> {
        Ok(SorobanAuthorizationEntry {
            credentials: self.credential.to_xdr()?,
            root_invocation: self.root_invocation.to_xdr()?,
        })
    }

    pub fn from_xdr(entry: &SorobanAuthorizationEntry) -> Result<Self> {
        Ok(Self::new(
            Credential::from_xdr(&entry.credentials)?,
            InvocationNode::from_xdr(&entry.root_invocation)?,
        ))
    }

    pub fn to_base64(&self) -> Result<String> {
        Ok(self.to_xdr()?.to_xdr_base64(Limits::none())?)
    }

    pub fn from_base64(s: &str) -> Result<Self> {
        Self::from_xdr(&SorobanAuthorizationEntry::from_xdr_base64(
            s.trim(),
            Limits::none(),
        )?)
    }

    // -----------------------------------------------------------------------
    // Structured form
    // -----------------------------------------------------------------------

    pub fn to_params(&self) -> Result<AuthEntryParams> {
        let credentials = match &self.credential {
            Credential::SourceAccount => CredentialParams::SourceAccount,
            Credential::Address(c) => CredentialParams::Address(AddressCredentialParams {
                address: c.principal,
                nonce: c.nonce.to_string(),
                signature_expiration_ledger: c.signature_expiration_ledger,
                signature: c
                    .signature
                    .as_ref()
                    .map(signature_to_base64)
                    .transpose()?,
            }),
        };
        Ok(AuthEntryParams {
            credentials,
            root_invocation: self.root_invocation.to_params(),
        })
    }

    pub fn from_params(params: &AuthEntryParams) -> Result<Self> {
        let credential = match &params.credentials {
            CredentialParams::SourceAccount => Credential::SourceAccount,
            CredentialParams::Address(c) => Credential::Address(AddressCredential {
                principal: c.address,
                nonce: parse_nonce(&c.nonce)?,
                signature_expiration_ledger: c.signature_expiration_ledger,
                signature: match &c.signature {
                    Some(s) => signature_from_base64(s)?,
                    None => None,
                },
            }),
        };
        Ok(Self::new(credential, params.root_invocation.to_node()?))
    }
}

pub(crate) fn parse_nonce(s: &str) -> Result<i64> {
    s.trim()
        .parse::<i64>()
        .map_err(|e| ProtocolError::InvalidArgValue {
            arg_type: "nonce".into(),
            reason: e.to_string(),
        })
}

/// Base64 XDR of the credential signature value.
pub(crate) fn signature_to_base64(sig: &EntrySignature) -> Result<String> {
    Ok(sig.to_sc_val()?.to_xdr_base64(Limits::none())?)
}

pub(crate) fn signature_from_base64(s: &str) -> Result<Option<EntrySignature>> {
    let val = stellar_xdr::curr::ScVal::from_xdr_base64(s.trim(), Limits::none())?;
    EntrySignature::from_sc_val(&val)
}

// ---------------------------------------------------------------------------
// Structured parameter types
// ---------------------------------------------------------------------------

/// Address credential fields in the structured form. The nonce is a
/// decimal string so 64-bit values survive JSON readers with only doubles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressCredentialParams {
    pub address: Principal,
    pub nonce: String,
    pub signature_expiration_ledger: u32,
    /// Base64 XDR of the signature value, when signed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CredentialParams {
    SourceAccount,
    Address(AddressCredentialParams),
}

/// JSON-friendly authorization entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthEntryParams {
    pub credentials: CredentialParams,
    pub root_invocation: InvocationParams,
}
