//! # Ledger Keys
//!
//! Every ledger slot an invocation touches is named by a [`LedgerKey`]. Keys
//! are plain values: two keys built from the same inputs are equal, and
//! equality agrees with byte equality of their XDR encodings.
//!
//! ```text
//!   Account            account entry of a G... principal
//!   Trustline          (account, credit asset) pair
//!   ContractInstance   the instance slot of a C... contract
//!   ContractCode       wasm blob, by hash
//!   ContractData       (owner, data key, durability)
//! ```
//!
//! Nonce slots are temporary contract data stored under the *authorizing*
//! principal (which may be an account), keyed by `LedgerKeyNonce`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stellar_xdr::curr::{self as xdr, Limits, ReadXdr, WriteXdr};

use crate::address::Principal;
use crate::config::Network;
use crate::crypto::hash::sha256_array;
use crate::error::{ProtocolError, Result};
use crate::value::Value;

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// A classic asset: the native lumen or an issued credit.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Asset {
    Native,
    Credit { code: String, issuer: Principal },
}

impl Asset {
    pub fn credit(code: impl Into<String>, issuer: Principal) -> Result<Self> {
        let asset = Self::Credit {
            code: code.into(),
            issuer,
        };
        asset.to_xdr_asset()?;
        Ok(asset)
    }

    pub fn to_xdr_asset(&self) -> Result<xdr::Asset> {
        match self {
            Self::Native => Ok(xdr::Asset::Native),
            Self::Credit { code, issuer } => {
                let issuer = issuer.to_account_id()?;
                match credit_code(code)? {
                    CreditCode::Four(asset_code) => {
                        Ok(xdr::Asset::CreditAlphanum4(xdr::AlphaNum4 {
                            asset_code: xdr::AssetCode4(asset_code),
                            issuer,
                        }))
                    }
                    CreditCode::Twelve(asset_code) => {
                        Ok(xdr::Asset::CreditAlphanum12(xdr::AlphaNum12 {
                            asset_code: xdr::AssetCode12(asset_code),
                            issuer,
                        }))
                    }
                }
            }
        }
    }

    fn to_trustline_asset(&self) -> Result<xdr::TrustLineAsset> {
        match self.to_xdr_asset()? {
            xdr::Asset::CreditAlphanum4(a) => Ok(xdr::TrustLineAsset::CreditAlphanum4(a)),
            xdr::Asset::CreditAlphanum12(a) => Ok(xdr::TrustLineAsset::CreditAlphanum12(a)),
            xdr::Asset::Native => Err(ProtocolError::InvalidPrincipal {
                input: self.to_string(),
                reason: "the native asset has no trustline".into(),
            }),
        }
    }

    fn from_trustline_asset(asset: &xdr::TrustLineAsset) -> Result<Self> {
        let (code, issuer) = match asset {
            xdr::TrustLineAsset::CreditAlphanum4(a) => (a.asset_code.0.to_vec(), &a.issuer),
            xdr::TrustLineAsset::CreditAlphanum12(a) => (a.asset_code.0.to_vec(), &a.issuer),
            other => {
                return Err(ProtocolError::UnsupportedLedgerKey {
                    kind: format!("trustline asset {}", other.name()),
                })
            }
        };
        let code: Vec<u8> = code.into_iter().take_while(|b| *b != 0).collect();
        let xdr::AccountId(xdr::PublicKey::PublicKeyTypeEd25519(xdr::Uint256(key))) = issuer;
        Ok(Self::Credit {
            code: String::from_utf8_lossy(&code).into_owned(),
            issuer: Principal::Account(*key),
        })
    }

    /// Address of the built-in token contract wrapping this asset on `network`.
    pub fn contract_id(&self, network: &Network) -> Result<Principal> {
        let preimage = xdr::HashIdPreimage::ContractId(xdr::HashIdPreimageContractId {
            network_id: xdr::Hash(network.id()),
            contract_id_preimage: xdr::ContractIdPreimage::Asset(self.to_xdr_asset()?),
        });
        let bytes = preimage.to_xdr(Limits::none())?;
        Ok(Principal::Contract(sha256_array(&bytes)))
    }
}

enum CreditCode {
    Four([u8; 4]),
    Twelve([u8; 12]),
}

fn credit_code(code: &str) -> Result<CreditCode> {
    let invalid = |reason: &str| ProtocolError::InvalidArgValue {
        arg_type: "asset".into(),
        reason: format!("asset code '{}' {}", code, reason),
    };
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid("must be 1-12 alphanumeric characters"));
    }
    let bytes = code.as_bytes();
    if bytes.len() <= 4 {
        let mut buf = [0u8; 4];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(CreditCode::Four(buf))
    } else if bytes.len() <= 12 {
        let mut buf = [0u8; 12];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(CreditCode::Twelve(buf))
    } else {
        Err(invalid("is longer than 12 characters"))
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Credit { code, issuer } => write!(f, "{}:{}", code, issuer),
        }
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Asset({})", self)
    }
}

impl FromStr for Asset {
    type Err = ProtocolError;

    /// `native` or `CODE:ISSUER`.
    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("native") {
            return Ok(Self::Native);
        }
        match s.split_once(':') {
            Some((code, issuer)) => Self::credit(code, issuer.parse()?),
            None => Err(ProtocolError::InvalidArgValue {
                arg_type: "asset".into(),
                reason: format!("'{}' is neither 'native' nor 'CODE:ISSUER'", s),
            }),
        }
    }
}

impl TryFrom<String> for Asset {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Asset> for String {
    fn from(value: Asset) -> Self {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// Ledger keys
// ---------------------------------------------------------------------------

/// Lifetime class of a contract data slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Durability {
    Persistent,
    Temporary,
}

impl Durability {
    fn to_xdr(self) -> xdr::ContractDataDurability {
        match self {
            Self::Persistent => xdr::ContractDataDurability::Persistent,
            Self::Temporary => xdr::ContractDataDurability::Temporary,
        }
    }

    fn from_xdr(d: xdr::ContractDataDurability) -> Self {
        match d {
            xdr::ContractDataDurability::Persistent => Self::Persistent,
            xdr::ContractDataDurability::Temporary => Self::Temporary,
        }
    }
}

/// The key of a contract data slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataKey {
    /// An authorization nonce slot.
    Nonce(i64),
    /// An ordinary contract-defined key.
    Value(Value),
}

impl DataKey {
    fn to_sc_val(&self) -> Result<xdr::ScVal> {
        match self {
            Self::Nonce(nonce) => Ok(xdr::ScVal::LedgerKeyNonce(xdr::ScNonceKey {
                nonce: *nonce,
            })),
            Self::Value(v) => v.to_sc_val(),
        }
    }
}

/// What kind of slot to build for a principal. See [`build_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyClass {
    Account,
    Trustline(Asset),
    ContractInstance,
    ContractCode { wasm_hash: [u8; 32] },
    ContractData { durability: Durability, key: DataKey },
}

/// An identifier for one ledger slot.
///
/// Serialized as base64 XDR so work-files stay readable by other ledger
/// tooling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum LedgerKey {
    Account(Principal),
    Trustline {
        account: Principal,
        asset: Asset,
    },
    ContractInstance(Principal),
    ContractCode {
        wasm_hash: [u8; 32],
    },
    ContractData {
        owner: Principal,
        key: DataKey,
        durability: Durability,
    },
}

/// Builds the key for `principal` under `class`.
///
/// Fails with [`ProtocolError::InvalidPrincipal`] when the principal has
/// the wrong kind for the class (a contract as an account key, an account
/// as a contract instance).
pub fn build_key(principal: Principal, class: KeyClass) -> Result<LedgerKey> {
    let wrong_kind = |expected: &str| ProtocolError::InvalidPrincipal {
        input: principal.to_string(),
        reason: format!("expected {} principal", expected),
    };
    match class {
        KeyClass::Account => {
            principal.to_account_id()?;
            Ok(LedgerKey::Account(principal))
        }
        KeyClass::Trustline(asset) => {
            principal.to_account_id()?;
            asset.to_trustline_asset()?;
            Ok(LedgerKey::Trustline {
                account: principal,
                asset,
            })
        }
        KeyClass::ContractInstance => {
            if !principal.is_contract() {
                return Err(wrong_kind("a contract"));
            }
            Ok(LedgerKey::ContractInstance(principal))
        }
        KeyClass::ContractCode { wasm_hash } => {
            if !principal.is_contract() {
                return Err(wrong_kind("a contract"));
            }
            Ok(LedgerKey::ContractCode { wasm_hash })
        }
        KeyClass::ContractData { durability, key } => Ok(LedgerKey::ContractData {
            owner: principal,
            key,
            durability,
        }),
    }
}

/// The temporary slot that records `nonce` as consumed for `principal`.
pub fn nonce_key(principal: Principal, nonce: i64) -> LedgerKey {
    LedgerKey::ContractData {
        owner: principal,
        key: DataKey::Nonce(nonce),
        durability: Durability::Temporary,
    }
}

/// The persistent `["Balance", holder]` slot of a token contract.
pub fn balance_key(token: Principal, holder: Principal) -> Result<LedgerKey> {
    if !token.is_contract() {
        return Err(ProtocolError::InvalidPrincipal {
            input: token.to_string(),
            reason: "a token balance lives in a contract".into(),
        });
    }
    Ok(LedgerKey::ContractData {
        owner: token,
        key: DataKey::Value(Value::Vec(vec![
            Value::Symbol("Balance".into()),
            Value::Address(holder),
        ])),
        durability: Durability::Persistent,
    })
}

pub fn instance_key(contract: Principal) -> Result<LedgerKey> {
    build_key(contract, KeyClass::ContractInstance)
}

pub fn code_key(wasm_hash: [u8; 32]) -> LedgerKey {
    LedgerKey::ContractCode { wasm_hash }
}

impl LedgerKey {
    pub fn to_xdr(&self) -> Result<xdr::LedgerKey> {
        Ok(match self {
            Self::Account(p) => xdr::LedgerKey::Account(xdr::LedgerKeyAccount {
                account_id: p.to_account_id()?,
            }),
            Self::Trustline { account, asset } => {
                xdr::LedgerKey::Trustline(xdr::LedgerKeyTrustLine {
                    account_id: account.to_account_id()?,
                    asset: asset.to_trustline_asset()?,
                })
            }
            Self::ContractInstance(contract) => {
                xdr::LedgerKey::ContractData(xdr::LedgerKeyContractData {
                    contract: contract.to_sc_address(),
                    key: xdr::ScVal::LedgerKeyContractInstance,
                    durability: xdr::ContractDataDurability::Persistent,
                })
            }
            Self::ContractCode { wasm_hash } => {
                xdr::LedgerKey::ContractCode(xdr::LedgerKeyContractCode {
                    hash: xdr::Hash(*wasm_hash),
                })
            }
            Self::ContractData {
                owner,
                key,
                durability,
            } => xdr::LedgerKey::ContractData(xdr::LedgerKeyContractData {
                contract: owner.to_sc_address(),
                key: key.to_sc_val()?,
                durability: durability.to_xdr(),
            }),
        })
    }

    pub fn from_xdr(key: &xdr::LedgerKey) -> Result<Self> {
        match key {
            xdr::LedgerKey::Account(a) => {
                let xdr::AccountId(xdr::PublicKey::PublicKeyTypeEd25519(xdr::Uint256(pk))) =
                    &a.account_id;
                Ok(Self::Account(Principal::Account(*pk)))
            }
            xdr::LedgerKey::Trustline(t) => {
                let xdr::AccountId(xdr::PublicKey::PublicKeyTypeEd25519(xdr::Uint256(pk))) =
                    &t.account_id;
                Ok(Self::Trustline {
                    account: Principal::Account(*pk),
                    asset: Asset::from_trustline_asset(&t.asset)?,
                })
            }
            xdr::LedgerKey::ContractCode(c) => Ok(Self::ContractCode {
                wasm_hash: c.hash.0,
            }),
            xdr::LedgerKey::ContractData(d) => {
                let owner = Principal::from_sc_address(&d.contract);
                let durability = Durability::from_xdr(d.durability);
                match &d.key {
                    xdr::ScVal::LedgerKeyContractInstance => Ok(Self::ContractInstance(owner)),
                    xdr::ScVal::LedgerKeyNonce(n) => Ok(Self::ContractData {
                        owner,
                        key: DataKey::Nonce(n.nonce),
                        durability,
                    }),
                    other => Ok(Self::ContractData {
                        owner,
                        key: DataKey::Value(Value::from_sc_val(other)?),
                        durability,
                    }),
                }
            }
            other => Err(ProtocolError::UnsupportedLedgerKey {
                kind: other.name().to_string(),
            }),
        }
    }

    /// Canonical binary encoding; equal keys have equal bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.to_xdr()?.to_xdr(Limits::none())?)
    }

    pub fn to_base64(&self) -> Result<String> {
        Ok(self.to_xdr()?.to_xdr_base64(Limits::none())?)
    }

    pub fn from_base64(s: &str) -> Result<Self> {
        Self::from_xdr(&xdr::LedgerKey::from_xdr_base64(s, Limits::none())?)
    }
}

impl fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account(p) => write!(f, "account({})", p),
            Self::Trustline { account, asset } => write!(f, "trustline({}, {})", account, asset),
            Self::ContractInstance(c) => write!(f, "instance({})", c),
            Self::ContractCode { wasm_hash } => write!(f, "code({})", hex::encode(wasm_hash)),
            Self::ContractData {
                owner,
                key,
                durability,
            } => {
                let d = match durability {
                    Durability::Persistent => "persistent",
                    Durability::Temporary => "temporary",
                };
                match key {
                    DataKey::Nonce(n) => write!(f, "{} data({}, nonce {})", d, owner, n),
                    DataKey::Value(v) => write!(f, "{} data({}, {})", d, owner, v),
                }
            }
        }
    }
}

impl TryFrom<String> for LedgerKey {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_base64(&value)
    }
}

impl Serialize for LedgerKey {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let encoded = self.to_base64().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&encoded)
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
    fn same_inputs_build_equal_keys_and_bytes() {
        let a = build_key(account(), KeyClass::Account).unwrap();
        let b = build_key(account(), KeyClass::Account).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_bytes().unwrap(), b.to_bytes().unwrap());
    }

    #[test]
    fn contract_as_account_key_is_invalid() {
        match build_key(contract(), KeyClass::Account) {
            Err(ProtocolError::InvalidPrincipal { .. }) => {}
            other => panic!("expected InvalidPrincipal, got {:?}", other),
        }
    }

    #[test]
    fn account_as_instance_key_is_invalid() {
        match instance_key(account()) {
            Err(ProtocolError::InvalidPrincipal { .. }) => {}
            other => panic!("expected InvalidPrincipal, got {:?}", other),
        }
    }

    #[test]
    fn native_trustline_is_invalid() {
        assert!(build_key(account(), KeyClass::Trustline(Asset::Native)).is_err());
        let usdc = Asset::credit("USDC", Principal::Account([3u8; 32])).unwrap();
        assert!(build_key(account(), KeyClass::Trustline(usdc)).is_ok());
    }

    #[test]
    fn xdr_roundtrip_all_kinds() {
        let usdc = Asset::credit("USDC", Principal::Account([3u8; 32])).unwrap();
        let longcode = Asset::credit("LONGASSET1", Principal::Account([3u8; 32])).unwrap();
        let keys = vec![
            build_key(account(), KeyClass::Account).unwrap(),
            build_key(account(), KeyClass::Trustline(usdc)).unwrap(),
            build_key(account(), KeyClass::Trustline(longcode)).unwrap(),
            instance_key(contract()).unwrap(),
            code_key([9u8; 32]),
            nonce_key(account(), -42),
            balance_key(contract(), account()).unwrap(),
        ];
        for key in keys {
            let back = LedgerKey::from_xdr(&key.to_xdr().unwrap()).unwrap();
            assert_eq!(back, key);
            assert_eq!(LedgerKey::from_base64(&key.to_base64().unwrap()).unwrap(), key);
        }
    }

    #[test]
    fn nonce_keys_are_temporary_and_distinct() {
        let a = nonce_key(account(), 1);
        let b = nonce_key(account(), 2);
        assert_ne!(a.to_bytes().unwrap(), b.to_bytes().unwrap());
        match a {
            LedgerKey::ContractData { durability, .. } => {
                assert_eq!(durability, Durability::Temporary)
            }
            other => panic!("expected contract data, got {:?}", other),
        }
    }

    #[test]
    fn asset_parse_and_display() {
        let issuer = Principal::Account([3u8; 32]);
        let s = format!("USDC:{}", issuer);
        let asset: Asset = s.parse().unwrap();
        assert_eq!(asset.to_string(), s);
        assert_eq!("native".parse::<Asset>().unwrap(), Asset::Native);
        assert!("TOOLONGASSETCODE:x".parse::<Asset>().is_err());
    }

    #[test]
    fn asset_contract_id_depends_on_network() {
        let native_test = Asset::Native.contract_id(&Network::testnet()).unwrap();
        let native_pub = Asset::Native.contract_id(&Network::public()).unwrap();
        assert!(native_test.is_contract());
        assert_ne!(native_test, native_pub);
        assert_eq!(
            native_test.to_string(),
            "CDLZFC3SYJYDZT7K67VZ75HPJVIEUVNIXF47ZG2FB2RMQQVU2HHGCYSC"
        );
    }

    #[test]
    fn ledger_key_serde_is_base64_xdr() {
        let key = nonce_key(account(), 7);
        let json = serde_json::to_string(&key).unwrap();
        let back: LedgerKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
