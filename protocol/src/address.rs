//! # Principals
//!
//! A principal is anything that can authorize an invocation: an ed25519
//! account (`G...`) or a contract (`C...`). The string form is the strkey,
//! the binary form is the ledger's `ScAddress`.
//!
//! Account-only positions (transaction source, account ledger keys,
//! trustlines) use [`Principal::to_account_id`], which refuses contracts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stellar_strkey::{ed25519, Contract, Strkey};
use stellar_xdr::curr::{AccountId, Hash, MuxedAccount, PublicKey, ScAddress, Uint256};

use crate::error::{ProtocolError, Result};

/// An account or contract address.
///
/// Ordering is by kind then raw bytes. It only exists so that argument
/// lists containing addresses can be compared as multisets.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Principal {
    /// An ed25519 account, identified by its public key.
    Account([u8; 32]),
    /// A deployed contract, identified by its contract id.
    Contract([u8; 32]),
}

impl Principal {
    pub fn is_account(&self) -> bool {
        matches!(self, Self::Account(_))
    }

    pub fn is_contract(&self) -> bool {
        matches!(self, Self::Contract(_))
    }

    /// The 32 raw bytes behind the strkey.
    pub fn as_bytes(&self) -> &[u8; 32] {
        match self {
            Self::Account(bytes) | Self::Contract(bytes) => bytes,
        }
    }

    pub fn to_sc_address(&self) -> ScAddress {
        match self {
            Self::Account(key) => ScAddress::Account(account_id(key)),
            Self::Contract(id) => ScAddress::Contract(Hash(*id)),
        }
    }

    pub fn from_sc_address(address: &ScAddress) -> Self {
        match address {
            ScAddress::Account(AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(key)))) => {
                Self::Account(*key)
            }
            ScAddress::Contract(Hash(id)) => Self::Contract(*id),
        }
    }

    /// Account id for account-only positions. Contracts are rejected.
    pub fn to_account_id(&self) -> Result<AccountId> {
        match self {
            Self::Account(key) => Ok(account_id(key)),
            Self::Contract(_) => Err(ProtocolError::InvalidPrincipal {
                input: self.to_string(),
                reason: "a contract cannot be used where an account is required".into(),
            }),
        }
    }

    /// Muxed form used for the transaction source account.
    pub fn to_muxed_account(&self) -> Result<MuxedAccount> {
        match self {
            Self::Account(key) => Ok(MuxedAccount::Ed25519(Uint256(*key))),
            Self::Contract(_) => Err(ProtocolError::InvalidPrincipal {
                input: self.to_string(),
                reason: "a contract cannot be a transaction source".into(),
            }),
        }
    }
}

fn account_id(key: &[u8; 32]) -> AccountId {
    AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(*key)))
}

impl FromStr for Principal {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| ProtocolError::InvalidPrincipal {
            input: s.to_string(),
            reason: reason.to_string(),
        };
        match Strkey::from_string(s.trim()) {
            Ok(Strkey::PublicKeyEd25519(key)) => Ok(Self::Account(key.0)),
            Ok(Strkey::Contract(contract)) => Ok(Self::Contract(contract.0)),
            // Never echo a secret back in an error message.
            Ok(Strkey::PrivateKeyEd25519(_)) => Err(ProtocolError::InvalidPrincipal {
                input: "S...".into(),
                reason: "a secret key is not a principal".into(),
            }),
            Ok(_) => Err(invalid("unsupported strkey kind")),
            Err(_) => Err(invalid("not a valid strkey")),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account(key) => write!(f, "{}", ed25519::PublicKey(*key)),
            Self::Contract(id) => write!(f, "{}", Contract(*id)),
        }
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({})", self)
    }
}

impl TryFrom<String> for Principal {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Principal> for String {
    fn from(value: Principal) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Principal {
        Principal::Account([1u8; 32])
    }

    fn contract() -> Principal {
        Principal::Contract([2u8; 32])
    }

    #[test]
    fn strkey_roundtrip_for_both_kinds() {
        for p in [account(), contract()] {
            let s = p.to_string();
            assert_eq!(s.parse::<Principal>().unwrap(), p);
        }
        assert!(account().to_string().starts_with('G'));
        assert!(contract().to_string().starts_with('C'));
    }

    #[test]
    fn sc_address_roundtrip() {
        for p in [account(), contract()] {
            assert_eq!(Principal::from_sc_address(&p.to_sc_address()), p);
        }
    }

    #[test]
    fn contract_rejected_as_account() {
        match contract().to_account_id() {
            Err(ProtocolError::InvalidPrincipal { .. }) => {}
            other => panic!("expected InvalidPrincipal, got {:?}", other),
        }
        assert!(contract().to_muxed_account().is_err());
        assert!(account().to_muxed_account().is_ok());
    }

    #[test]
    fn garbage_is_invalid_principal() {
        match "GNOTAKEY".parse::<Principal>() {
            Err(ProtocolError::InvalidPrincipal { input, .. }) => assert_eq!(input, "GNOTAKEY"),
            other => panic!("expected InvalidPrincipal, got {:?}", other),
        }
    }

    #[test]
    fn secret_key_is_not_a_principal_and_is_not_echoed() {
        let secret = ed25519::PrivateKey([9u8; 32]).to_string();
        match secret.parse::<Principal>() {
            Err(err @ ProtocolError::InvalidPrincipal { .. }) => {
                assert!(!err.to_string().contains(&secret));
            }
            other => panic!("expected InvalidPrincipal, got {:?}", other),
        }
    }

    #[test]
    fn serde_uses_strkey_string() {
        let json = serde_json::to_string(&contract()).unwrap();
        assert_eq!(json, format!("\"{}\"", contract()));
        let back: Principal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, contract());
    }
}
