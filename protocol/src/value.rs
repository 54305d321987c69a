//! Invocation argument values.
//!
//! Arguments are restricted to a small fixed taxonomy. Anything outside it,
//! whether it arrives as a typed JSON parameter or inside decoded XDR, is
//! rejected with [`ProtocolError::UnsupportedArgType`] instead of being
//! passed through opaquely: the air-gapped signer has to be able to show a
//! human exactly what is being authorized.

use std::fmt;

use serde::{Deserialize, Serialize};
use stellar_xdr::curr::{Int128Parts, ScBytes, ScSymbol, ScVal, ScVec};

use crate::address::Principal;
use crate::error::{ProtocolError, Result};

/// Longest symbol the ledger accepts.
pub const MAX_SYMBOL_LEN: usize = 32;

/// A single invocation argument.
///
/// `Ord` is derived so argument lists can be compared as multisets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Bool(bool),
    I128(i128),
    Address(Principal),
    Symbol(String),
    Bytes(Vec<u8>),
    Vec(Vec<Value>),
}

/// Checks that `symbol` is a valid ledger symbol: at most 32 characters
/// from `[A-Za-z0-9_]`.
pub fn validate_symbol(symbol: &str) -> Result<()> {
    let invalid = |reason: &str| ProtocolError::InvalidSymbol {
        symbol: symbol.to_string(),
        reason: reason.to_string(),
    };
    if symbol.len() > MAX_SYMBOL_LEN {
        return Err(invalid("longer than 32 characters"));
    }
    if !symbol
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(invalid("only [A-Za-z0-9_] are allowed"));
    }
    Ok(())
}

pub(crate) fn to_sc_symbol(symbol: &str) -> Result<ScSymbol> {
    validate_symbol(symbol)?;
    Ok(ScSymbol(symbol.try_into()?))
}

pub(crate) fn from_sc_symbol(symbol: &ScSymbol) -> Result<String> {
    let s = String::from_utf8(symbol.0.to_vec()).map_err(|e| ProtocolError::InvalidSymbol {
        symbol: hex::encode(symbol.0.to_vec()),
        reason: e.to_string(),
    })?;
    validate_symbol(&s)?;
    Ok(s)
}

impl Value {
    /// A symbol value, validated.
    pub fn symbol(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        validate_symbol(&s)?;
        Ok(Self::Symbol(s))
    }

    /// Name of the variant as used in typed parameters.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::I128(_) => "i128",
            Self::Address(_) => "address",
            Self::Symbol(_) => "symbol",
            Self::Bytes(_) => "bytes",
            Self::Vec(_) => "vec",
        }
    }

    pub fn to_sc_val(&self) -> Result<ScVal> {
        Ok(match self {
            Self::Bool(b) => ScVal::Bool(*b),
            Self::I128(n) => ScVal::I128(Int128Parts {
                hi: (*n >> 64) as i64,
                lo: *n as u64,
            }),
            Self::Address(p) => ScVal::Address(p.to_sc_address()),
            Self::Symbol(s) => ScVal::Symbol(to_sc_symbol(s)?),
            Self::Bytes(b) => ScVal::Bytes(ScBytes(b.clone().try_into()?)),
            Self::Vec(items) => {
                let vals = items
                    .iter()
                    .map(Value::to_sc_val)
                    .collect::<Result<Vec<_>>>()?;
                ScVal::Vec(Some(ScVec(vals.try_into()?)))
            }
        })
    }

    pub fn from_sc_val(val: &ScVal) -> Result<Self> {
        Ok(match val {
            ScVal::Bool(b) => Self::Bool(*b),
            ScVal::I128(Int128Parts { hi, lo }) => {
                Self::I128(((*hi as i128) << 64) | (*lo as i128))
            }
            ScVal::Address(a) => Self::Address(Principal::from_sc_address(a)),
            ScVal::Symbol(s) => Self::Symbol(from_sc_symbol(s)?),
            ScVal::Bytes(b) => Self::Bytes(b.0.to_vec()),
            ScVal::Vec(Some(items)) => Self::Vec(
                items
                    .iter()
                    .map(Value::from_sc_val)
                    .collect::<Result<Vec<_>>>()?,
            ),
            other => {
                return Err(ProtocolError::UnsupportedArgType {
                    found: other.name().to_string(),
                })
            }
        })
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i128> for Value {
    fn from(n: i128) -> Self {
        Self::I128(n)
    }
}

impl From<Principal> for Value {
    fn from(p: Principal) -> Self {
        Self::Address(p)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::I128(n) => write!(f, "{}", n),
            Self::Address(p) => write!(f, "{}", p),
            Self::Symbol(s) => write!(f, ":{}", s),
            Self::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Self::Vec(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// The structured-parameter form of an argument: `{ "value": .., "type": .. }`.
///
/// `i128` values are written as decimal strings so they survive JSON
/// readers that only have doubles. Numbers are accepted on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedArg {
    pub value: serde_json::Value,
    #[serde(rename = "type")]
    pub arg_type: String,
}

impl TypedArg {
    pub fn to_value(&self) -> Result<Value> {
        let bad = |reason: &str| ProtocolError::InvalidArgValue {
            arg_type: self.arg_type.clone(),
            reason: reason.to_string(),
        };
        match self.arg_type.as_str() {
            "bool" => match &self.value {
                serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
                serde_json::Value::String(s) => s
                    .parse::<bool>()
                    .map(Value::Bool)
                    .map_err(|_| bad("expected true or false")),
                _ => Err(bad("expected a boolean")),
            },
            "i128" => {
                let text = match &self.value {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Number(n) => n.to_string(),
                    _ => return Err(bad("expected an integer")),
                };
                text.trim()
                    .parse::<i128>()
                    .map(Value::I128)
                    .map_err(|e| bad(&e.to_string()))
            }
            "address" => match &self.value {
                serde_json::Value::String(s) => Ok(Value::Address(s.parse()?)),
                _ => Err(bad("expected a strkey string")),
            },
            "symbol" => match &self.value {
                serde_json::Value::String(s) => Value::symbol(s.as_str()),
                _ => Err(bad("expected a string")),
            },
            "bytes" => match &self.value {
                serde_json::Value::String(s) => hex::decode(s.trim_start_matches("0x"))
                    .map(Value::Bytes)
                    .map_err(|e| bad(&e.to_string())),
                _ => Err(bad("expected a hex string")),
            },
            "vec" => {
                let items: Vec<TypedArg> = serde_json::from_value(self.value.clone())
                    .map_err(|e| bad(&e.to_string()))?;
                Ok(Value::Vec(
                    items
                        .iter()
                        .map(TypedArg::to_value)
                        .collect::<Result<Vec<_>>>()?,
                ))
            }
            other => Err(ProtocolError::UnsupportedArgType {
                found: other.to_string(),
            }),
        }
    }

    pub fn from_value(value: &Value) -> Self {
        let json = match value {
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::I128(n) => serde_json::Value::String(n.to_string()),
            Value::Address(p) => serde_json::Value::String(p.to_string()),
            Value::Symbol(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::String(hex::encode(b)),
            Value::Vec(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|item| {
                        let arg = TypedArg::from_value(item);
                        serde_json::json!({ "value": arg.value, "type": arg.arg_type })
                    })
                    .collect(),
            ),
        };
        Self {
            value: json,
            arg_type: value.type_name().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn typed(value: serde_json::Value, ty: &str) -> TypedArg {
        TypedArg {
            value,
            arg_type: ty.to_string(),
        }
    }

    #[test]
    fn i128_extremes_survive_sc_val() {
        for n in [0i128, -1, i128::MIN, i128::MAX, 1 << 70] {
            let v = Value::I128(n);
            assert_eq!(Value::from_sc_val(&v.to_sc_val().unwrap()).unwrap(), v);
        }
    }

    #[test]
    fn nested_vec_survives_sc_val() {
        let v = Value::Vec(vec![
            Value::Bool(true),
            Value::Address(Principal::Contract([4u8; 32])),
            Value::Vec(vec![Value::Bytes(vec![1, 2, 3])]),
            Value::symbol("Balance").unwrap(),
        ]);
        assert_eq!(Value::from_sc_val(&v.to_sc_val().unwrap()).unwrap(), v);
    }

    #[test]
    fn unsupported_sc_val_is_rejected() {
        match Value::from_sc_val(&ScVal::U32(7)) {
            Err(ProtocolError::UnsupportedArgType { found }) => assert_eq!(found, "U32"),
            other => panic!("expected UnsupportedArgType, got {:?}", other),
        }
    }

    #[test]
    fn typed_i128_accepts_string_and_number() {
        assert_eq!(typed(json!("100"), "i128").to_value().unwrap(), Value::I128(100));
        assert_eq!(typed(json!(-5), "i128").to_value().unwrap(), Value::I128(-5));
        assert!(typed(json!("1.5"), "i128").to_value().is_err());
    }

    #[test]
    fn typed_unknown_type_is_unsupported() {
        match typed(json!(1.0), "f64").to_value() {
            Err(ProtocolError::UnsupportedArgType { found }) => assert_eq!(found, "f64"),
            other => panic!("expected UnsupportedArgType, got {:?}", other),
        }
    }

    #[test]
    fn typed_form_roundtrips() {
        let v = Value::Vec(vec![
            Value::I128(i128::MAX),
            Value::Bool(false),
            Value::Bytes(vec![0xde, 0xad]),
            Value::Address(Principal::Account([5u8; 32])),
        ]);
        assert_eq!(TypedArg::from_value(&v).to_value().unwrap(), v);
    }

    #[test]
    fn symbol_validation() {
        assert!(validate_symbol("swap_tokens_01").is_ok());
        assert!(validate_symbol(&"a".repeat(33)).is_err());
        match validate_symbol("no-dash") {
            Err(ProtocolError::InvalidSymbol { symbol, .. }) => assert_eq!(symbol, "no-dash"),
            other => panic!("expected InvalidSymbol, got {:?}", other),
        }
    }

    #[test]
    fn display_is_readable() {
        let v = Value::Vec(vec![Value::I128(10), Value::Bool(true)]);
        assert_eq!(v.to_string(), "[10, true]");
    }
}
