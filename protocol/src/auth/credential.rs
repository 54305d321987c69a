//! Authorization credentials and their signature encoding.
//!
//! An ed25519 account signs an entry by attaching
//!
//! ```text
//!   Vec[ Map{ public_key: Bytes(32), signature: Bytes(64) } ]
//! ```
//!
//! as the credential's signature value. An unsigned credential carries
//! `Void` in that slot.

use stellar_xdr::curr::{
    ScBytes, ScMap, ScSymbol, ScVal, SorobanAddressCredentials, SorobanCredentials,
};

use crate::address::Principal;
use crate::crypto::keys::KeyError;
use crate::error::{ProtocolError, Result};

const PUBLIC_KEY_FIELD: &str = "public_key";
const SIGNATURE_FIELD: &str = "signature";

/// An ed25519 signature over an entry's digest, with the key that made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntrySignature {
    pub public_key: [u8; 32],
    pub signature: [u8; 64],
}

impl EntrySignature {
    pub fn to_sc_val(&self) -> Result<ScVal> {
        let map = ScMap::sorted_from(vec![
            (
                ScVal::Symbol(ScSymbol(PUBLIC_KEY_FIELD.try_into()?)),
                ScVal::Bytes(ScBytes(self.public_key.to_vec().try_into()?)),
            ),
            (
                ScVal::Symbol(ScSymbol(SIGNATURE_FIELD.try_into()?)),
                ScVal::Bytes(ScBytes(self.signature.to_vec().try_into()?)),
            ),
        ])?;
        Ok(ScVal::Vec(Some(vec![ScVal::Map(Some(map))].try_into()?)))
    }

    /// Decodes a credential signature slot. `Void` means unsigned.
    pub fn from_sc_val(val: &ScVal) -> Result<Option<Self>> {
        let malformed = |reason: &str| ProtocolError::MalformedSignature {
            reason: reason.to_string(),
        };
        let items = match val {
            ScVal::Void => return Ok(None),
            ScVal::Vec(Some(items)) => items,
            _ => return Err(malformed("expected a vector of signature maps")),
        };
        let [ScVal::Map(Some(map))] = items.as_slice() else {
            return Err(malformed("expected exactly one signature map"));
        };

        let mut public_key = None;
        let mut signature = None;
        for entry in map.iter() {
            let (ScVal::Symbol(field), ScVal::Bytes(bytes)) = (&entry.key, &entry.val) else {
                return Err(malformed("signature map must hold symbol -> bytes"));
            };
            match field.0.as_slice() {
                b"public_key" => public_key = Some(bytes.0.to_vec()),
                b"signature" => signature = Some(bytes.0.to_vec()),
                _ => return Err(malformed("unexpected field in signature map")),
            }
        }

        let public_key: [u8; 32] = public_key
            .ok_or_else(|| malformed("missing public_key"))?
            .try_into()
            .map_err(|_| KeyError::InvalidPublicKey)?;
        let signature = signature.ok_or_else(|| malformed("missing signature"))?;
        let signature: [u8; 64] = signature
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSignatureLength(signature.len()))?;

        Ok(Some(Self {
            public_key,
            signature,
        }))
    }
}

/// An address credential: the principal, the replay-protection nonce, the
/// ledger after which the signature is void, and the signature if present.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressCredential {
    pub principal: Principal,
    pub nonce: i64,
    pub signature_expiration_ledger: u32,
    pub signature: Option<EntrySignature>,
}

/// Whose authority an entry carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Credential {
    /// Implied by the transaction source's envelope signature.
    SourceAccount,
    /// An independent principal that must sign the entry itself.
    Address(AddressCredential),
}

impl Credential {
    pub fn to_xdr(&self) -> Result<SorobanCredentials> {
        match self {
            Self::SourceAccount => Ok(SorobanCredentials::SourceAccount),
            Self::Address(c) => Ok(SorobanCredentials::Address(SorobanAddressCredentials {
                address: c.principal.to_sc_address(),
                nonce: c.nonce,
                signature_expiration_ledger: c.signature_expiration_ledger,
                signature: match &c.signature {
                    Some(sig) => sig.to_sc_val()?,
                    None => ScVal::Void,
                },
            })),
        }
    }

    pub fn from_xdr(credentials: &SorobanCredentials) -> Result<Self> {
        match credentials {
            SorobanCredentials::SourceAccount => Ok(Self::SourceAccount),
            SorobanCredentials::Address(c) => Ok(Self::Address(AddressCredential {
                principal: Principal::from_sc_address(&c.address),
                nonce: c.nonce,
                signature_expiration_ledger: c.signature_expiration_ledger,
                signature: EntrySignature::from_sc_val(&c.signature)?,
            })),
        }
    }
}
