//! Signing request and response objects.
//!
//! These are the only values that cross the boundary between the proxy and
//! the air-gapped signer. They are plain serializable data: no handles, no
//! shared state, nothing that needs the other side to be reachable.
//!
//! Each comes in two representations:
//!
//! ```text
//!   raw  { "format": "raw", "rawEntries": [ <structured entry>, .. ] }
//!   xdr  { "format": "xdr", "entriesXdr": [ "<base64>", .. ],
//!          "signatureExpirationLedger": 1234 }
//! ```
//!
//! Both decode to the same [`AuthorizationEntry`] values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::address::Principal;
use crate::auth::{AuthEntryParams, AuthorizationEntry};
use crate::config::Network;
use crate::error::{MismatchField, ProtocolError, Result};
use crate::invocation::{FunctionParams, InvocationNode, InvocationParams};

/// Which representation a request or response uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    #[default]
    Raw,
    Xdr,
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::Xdr => write!(f, "xdr"),
        }
    }
}

impl FromStr for PayloadFormat {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "xdr" => Ok(Self::Xdr),
            other => Err(ProtocolError::InvalidArgValue {
                arg_type: "format".into(),
                reason: format!("'{}' is not one of raw, xdr", other),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Request payload
// ---------------------------------------------------------------------------

/// The entries a proxy asks the air-gapped signer to sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum AuthPayload {
    Raw {
        #[serde(rename = "rawEntries")]
        raw_entries: Vec<AuthEntryParams>,
    },
    Xdr {
        #[serde(rename = "entriesXdr")]
        entries_xdr: Vec<String>,
        /// Applies to every entry in the batch.
        #[serde(rename = "signatureExpirationLedger")]
        signature_expiration_ledger: u32,
    },
}

impl AuthPayload {
    /// Encodes `entries` in `format`.
    ///
    /// The binary form carries a single batch-level expiration, so every
    /// address entry must share one; otherwise this fails with an
    /// `expirationLedger` mismatch.
    pub fn from_entries(entries: &[AuthorizationEntry], format: PayloadFormat) -> Result<Self> {
        match format {
            PayloadFormat::Raw => Ok(Self::Raw {
                raw_entries: entries
                    .iter()
                    .map(AuthorizationEntry::to_params)
                    .collect::<Result<Vec<_>>>()?,
            }),
            PayloadFormat::Xdr => Ok(Self::Xdr {
                entries_xdr: entries
                    .iter()
                    .map(AuthorizationEntry::to_base64)
                    .collect::<Result<Vec<_>>>()?,
                signature_expiration_ledger: common_expiration(entries)?,
            }),
        }
    }

    pub fn format(&self) -> PayloadFormat {
        match self {
            Self::Raw { .. } => PayloadFormat::Raw,
            Self::Xdr { .. } => PayloadFormat::Xdr,
        }
    }

    /// Decodes the carried entries.
    ///
    /// In the binary form the batch-level expiration is the one signatures
    /// are made over. An unsigned address entry that still carries
    /// expiration 0 (as simulation produces them) takes the batch value.
    /// Any other entry must already agree with it.
    pub fn entries(&self) -> Result<Vec<AuthorizationEntry>> {
        match self {
            Self::Raw { raw_entries } => raw_entries
                .iter()
                .map(AuthorizationEntry::from_params)
                .collect(),
            Self::Xdr {
                entries_xdr,
                signature_expiration_ledger,
            } => entries_xdr
                .iter()
                .map(|e| {
                    let entry = AuthorizationEntry::from_base64(e)?;
                    match entry.signature_expiration_ledger() {
                        Some(0) if entry.signature().is_none() => {
                            entry.with_expiration(*signature_expiration_ledger)
                        }
                        Some(own) if own != *signature_expiration_ledger => {
                            Err(ProtocolError::mismatch(
                                MismatchField::ExpirationLedger,
                                signature_expiration_ledger,
                                own,
                            ))
                        }
                        _ => Ok(entry),
                    }
                })
                .collect(),
        }
    }

    pub fn to_raw(&self) -> Result<Self> {
        Self::from_entries(&self.entries()?, PayloadFormat::Raw)
    }

    pub fn to_xdr(&self) -> Result<Self> {
        Self::from_entries(&self.entries()?, PayloadFormat::Xdr)
    }
}

fn common_expiration(entries: &[AuthorizationEntry]) -> Result<u32> {
    let mut expirations = entries
        .iter()
        .filter_map(AuthorizationEntry::signature_expiration_ledger);
    let Some(first) = expirations.next() else {
        return Ok(0);
    };
    for other in expirations {
        if other != first {
            return Err(ProtocolError::mismatch(
                MismatchField::ExpirationLedger,
                first,
                other,
            ));
        }
    }
    Ok(first)
}

/// What the proxy hands to the air-gapped signer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningRequest {
    pub network: Network,
    pub auth: AuthPayload,
}

// ---------------------------------------------------------------------------
// Instruction
// ---------------------------------------------------------------------------

/// The invocation a human operator reviewed and intends to authorize.
///
/// Supplied to the air-gapped signer independently of the request, so a
/// tampered request cannot also tamper with the expectation it is checked
/// against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningInstruction {
    pub function: FunctionParams,
    /// Representation of the response. Defaults to the request's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<PayloadFormat>,
}

impl SigningInstruction {
    pub fn new(expected: &InvocationNode) -> Self {
        Self {
            function: expected.to_params().function,
            output_format: None,
        }
    }

    pub fn with_output_format(mut self, format: PayloadFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    /// The expected root call. Sub-invocations are not part of the
    /// reviewed instruction.
    pub fn expected_invocation(&self) -> Result<InvocationNode> {
        InvocationParams {
            function: self.function.clone(),
            sub_invocations: Vec::new(),
        }
        .to_node()
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// One signed entry coming back from the air-gapped side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum SignedEntryPayload {
    /// Just the signature; the proxy re-attaches it to its pending entry.
    Raw {
        /// Base64 XDR of the credential signature value.
        signature: String,
        /// Decimal string.
        nonce: String,
        #[serde(rename = "signatureExpirationLedger")]
        signature_expiration_ledger: u32,
    },
    /// The whole signed entry.
    Xdr {
        #[serde(rename = "authEntryXdr")]
        auth_entry_xdr: String,
    },
}

/// What the air-gapped signer hands back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningResponse {
    pub signer: Principal,
    pub entries: Vec<SignedEntryPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::create_unsigned_entry;
    use crate::value::Value;

    fn entries(expirations: &[u32]) -> Vec<AuthorizationEntry> {
        let root = InvocationNode::leaf(
            Principal::Contract([2u8; 32]),
            "swap",
            vec![Value::I128(1), Value::Bool(false)],
        )
        .unwrap();
        expirations
            .iter()
            .enumerate()
            .map(|(i, exp)| {
                create_unsigned_entry(Principal::Account([i as u8 + 1; 32]), root.clone(), *exp)
            })
            .collect()
    }

    #[test]
    fn raw_and_xdr_carry_the_same_entries() {
        let entries = entries(&[900, 900]);
        let raw = AuthPayload::from_entries(&entries, PayloadFormat::Raw).unwrap();
        let xdr = raw.to_xdr().unwrap();
        assert_eq!(xdr.format(), PayloadFormat::Xdr);
        assert_eq!(xdr.entries().unwrap(), entries);
        assert_eq!(xdr.to_raw().unwrap(), raw);
    }

    #[test]
    fn mixed_expirations_cannot_be_batched() {
        match AuthPayload::from_entries(&entries(&[900, 901]), PayloadFormat::Xdr) {
            Err(ProtocolError::Mismatch { field, .. }) => {
                assert_eq!(field, MismatchField::ExpirationLedger)
            }
            other => panic!("expected expirationLedger mismatch, got {:?}", other),
        }
    }

    #[test]
    fn disagreeing_batch_expiration_is_rejected() {
        let entries = entries(&[900]);
        let payload = AuthPayload::Xdr {
            entries_xdr: vec![entries[0].to_base64().unwrap()],
            signature_expiration_ledger: 5_000,
        };
        match payload.entries() {
            Err(ProtocolError::Mismatch {
                field,
                expected,
                actual,
            }) => {
                assert_eq!(field, MismatchField::ExpirationLedger);
                assert_eq!(expected, "5000");
                assert_eq!(actual, "900");
            }
            other => panic!("expected expirationLedger mismatch, got {:?}", other),
        }
    }

    #[test]
    fn batch_expiration_fills_unset_entries() {
        let unset = entries(&[0, 0]);
        let payload = AuthPayload::Xdr {
            entries_xdr: unset.iter().map(|e| e.to_base64().unwrap()).collect(),
            signature_expiration_ledger: 4_242,
        };
        let decoded = payload.entries().unwrap();
        for (before, after) in unset.iter().zip(&decoded) {
            assert_eq!(after.signature_expiration_ledger(), Some(4_242));
            assert_eq!(after.nonce(), before.nonce());
            assert_eq!(after.root_invocation(), before.root_invocation());
        }

        // The structured form now carries the expiration on each entry.
        let raw = payload.to_raw().unwrap();
        assert_eq!(raw.entries().unwrap(), decoded);
    }

    #[test]
    fn payload_json_shape() {
        let payload = AuthPayload::from_entries(&entries(&[7]), PayloadFormat::Xdr).unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["format"], "xdr");
        assert_eq!(json["signatureExpirationLedger"], 7);
        assert_eq!(json["entriesXdr"].as_array().unwrap().len(), 1);

        let back: AuthPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("XDR".parse::<PayloadFormat>().unwrap(), PayloadFormat::Xdr);
        assert!("json".parse::<PayloadFormat>().is_err());
    }
}
