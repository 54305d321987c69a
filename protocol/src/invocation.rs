//! # Invocation Trees
//!
//! An authorization covers a whole tree of contract calls: the root call
//! the principal makes plus every nested call it authorizes on its behalf.
//! The tree is a recursive value. Two trees are the same authorization iff
//! they are deeply equal, and [`InvocationNode::digest`] content-addresses a
//! tree by hashing its canonical binary form.
//!
//! Two interchangeable encodings exist:
//!
//! - the ledger's binary `SorobanAuthorizedInvocation` ([`InvocationNode::to_xdr`])
//! - a structured parameter form ([`InvocationParams`]) for JSON work-files

use std::fmt;

use serde::{Deserialize, Serialize};
use stellar_xdr::curr::{
    InvokeContractArgs, Limits, SorobanAuthorizedFunction, SorobanAuthorizedInvocation, WriteXdr,
};

use crate::address::Principal;
use crate::crypto::hash::sha256_array;
use crate::error::{ProtocolError, Result};
use crate::value::{from_sc_symbol, to_sc_symbol, validate_symbol, TypedArg, Value};

/// One contract call and the sub-calls it authorizes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvocationNode {
    pub contract: Principal,
    pub function: String,
    pub args: Vec<Value>,
    pub sub_invocations: Vec<InvocationNode>,
}

impl InvocationNode {
    /// Builds a node. The target must be a contract and the function name a
    /// valid symbol.
    pub fn new(
        contract: Principal,
        function: impl Into<String>,
        args: Vec<Value>,
        sub_invocations: Vec<InvocationNode>,
    ) -> Result<Self> {
        if !contract.is_contract() {
            return Err(ProtocolError::InvalidPrincipal {
                input: contract.to_string(),
                reason: "only contracts can be invoked".into(),
            });
        }
        let function = function.into();
        validate_symbol(&function)?;
        Ok(Self {
            contract,
            function,
            args,
            sub_invocations,
        })
    }

    /// A node with no sub-invocations.
    pub fn leaf(
        contract: Principal,
        function: impl Into<String>,
        args: Vec<Value>,
    ) -> Result<Self> {
        Self::new(contract, function, args, Vec::new())
    }

    /// Arguments sorted, for order-insensitive comparison.
    pub fn sorted_args(&self) -> Vec<Value> {
        let mut args = self.args.clone();
        args.sort();
        args
    }

    /// Every call in the tree with its depth, depth-first, root at depth 0.
    pub fn walk(&self) -> Vec<(usize, &InvocationNode)> {
        let mut calls = Vec::with_capacity(self.call_count());
        let mut stack = vec![(0, self)];
        while let Some((depth, node)) = stack.pop() {
            calls.push((depth, node));
            stack.extend(node.sub_invocations.iter().rev().map(|sub| (depth + 1, sub)));
        }
        calls
    }

    /// Total number of calls in the tree, root included.
    pub fn call_count(&self) -> usize {
        1 + self
            .sub_invocations
            .iter()
            .map(InvocationNode::call_count)
            .sum::<usize>()
    }

    /// The call itself, as the ledger's host-function arguments.
    pub fn to_invoke_args(&self) -> Result<InvokeContractArgs> {
        let args = self
            .args
            .iter()
            .map(Value::to_sc_val)
            .collect::<Result<Vec<_>>>()?;
        Ok(InvokeContractArgs {
            contract_address: self.contract.to_sc_address(),
            function_name: to_sc_symbol(&self.function)?,
            args: args.try_into()?,
        })
    }

    pub fn to_xdr(&self) -> Result<SorobanAuthorizedInvocation> {
        let subs = self
            .sub_invocations
            .iter()
            .map(InvocationNode::to_xdr)
            .collect::<Result<Vec<_>>>()?;
        Ok(SorobanAuthorizedInvocation {
            function: SorobanAuthorizedFunction::ContractFn(self.to_invoke_args()?),
            sub_invocations: subs.try_into()?,
        })
    }

    pub fn from_xdr(invocation: &SorobanAuthorizedInvocation) -> Result<Self> {
        let call = match &invocation.function {
            SorobanAuthorizedFunction::ContractFn(call) => call,
            other => {
                return Err(ProtocolError::UnsupportedInvocation {
                    kind: other.name().to_string(),
                })
            }
        };
        let args = call
            .args
            .iter()
            .map(Value::from_sc_val)
            .collect::<Result<Vec<_>>>()?;
        let subs = invocation
            .sub_invocations
            .iter()
            .map(InvocationNode::from_xdr)
            .collect::<Result<Vec<_>>>()?;
        Self::new(
            Principal::from_sc_address(&call.contract_address),
            from_sc_symbol(&call.function_name)?,
            args,
            subs,
        )
    }

    pub fn to_xdr_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.to_xdr()?.to_xdr(Limits::none())?)
    }

    /// SHA-256 of the canonical binary form.
    pub fn digest(&self) -> Result<[u8; 32]> {
        Ok(sha256_array(&self.to_xdr_bytes()?))
    }

    pub fn to_params(&self) -> InvocationParams {
        InvocationParams {
            function: FunctionParams {
                contract_address: self.contract,
                function_name: self.function.clone(),
                args: self.args.iter().map(TypedArg::from_value).collect(),
            },
            sub_invocations: self
                .sub_invocations
                .iter()
                .map(InvocationNode::to_params)
                .collect(),
        }
    }
}

impl fmt::Display for InvocationNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}(", self.contract, self.function)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")?;
        if !self.sub_invocations.is_empty() {
            write!(f, " +{} sub-invocation(s)", self.sub_invocations.len())?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Structured parameter form
// ---------------------------------------------------------------------------

/// The call part of [`InvocationParams`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionParams {
    pub contract_address: Principal,
    pub function_name: String,
    #[serde(default)]
    pub args: Vec<TypedArg>,
}

/// JSON-friendly invocation tree:
///
/// ```json
/// {
///   "function": { "contractAddress": "C...", "functionName": "swap",
///                 "args": [{ "value": "G...", "type": "address" }] },
///   "subInvocations": []
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationParams {
    pub function: FunctionParams,
    #[serde(default)]
    pub sub_invocations: Vec<InvocationParams>,
}

impl InvocationParams {
    pub fn to_node(&self) -> Result<InvocationNode> {
        let args = self
            .function
            .args
            .iter()
            .map(TypedArg::to_value)
            .collect::<Result<Vec<_>>>()?;
        let subs = self
            .sub_invocations
            .iter()
            .map(InvocationParams::to_node)
            .collect::<Result<Vec<_>>>()?;
        InvocationNode::new(
            self.function.contract_address,
            self.function.function_name.clone(),
            args,
            subs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token() -> Principal {
        Principal::Contract([2u8; 32])
    }

    fn swap_tree() -> InvocationNode {
        let transfer = InvocationNode::leaf(
            token(),
            "transfer",
            vec![
                Value::Address(Principal::Account([1u8; 32])),
                Value::Address(Principal::Contract([3u8; 32])),
                Value::I128(100),
            ],
        )
        .unwrap();
        InvocationNode::new(
            Principal::Contract([3u8; 32]),
            "swap",
            vec![Value::I128(100), Value::Bool(true)],
            vec![transfer],
        )
        .unwrap()
    }

    #[test]
    fn walk_visits_calls_depth_first() {
        let tree = swap_tree();
        let calls = tree.walk();
        assert_eq!(calls.len(), tree.call_count());
        assert_eq!(calls[0].0, 0);
        assert_eq!(calls[0].1, &tree);
        assert!(calls[1..].iter().all(|(depth, _)| *depth >= 1));
        assert_eq!(calls[1].1, &tree.sub_invocations[0]);
    }

    #[test]
    fn account_target_is_rejected() {
        match InvocationNode::leaf(Principal::Account([1u8; 32]), "f", vec![]) {
            Err(ProtocolError::InvalidPrincipal { .. }) => {}
            other => panic!("expected InvalidPrincipal, got {:?}", other),
        }
    }

    #[test]
    fn bad_function_name_is_rejected() {
        match InvocationNode::leaf(token(), "not valid!", vec![]) {
            Err(ProtocolError::InvalidSymbol { .. }) => {}
            other => panic!("expected InvalidSymbol, got {:?}", other),
        }
    }

    #[test]
    fn xdr_roundtrip_is_deep_equal() {
        let tree = swap_tree();
        assert_eq!(InvocationNode::from_xdr(&tree.to_xdr().unwrap()).unwrap(), tree);
        assert_eq!(tree.call_count(), 2);
    }

    #[test]
    fn params_roundtrip_is_deep_equal() {
        let tree = swap_tree();
        let json = serde_json::to_string(&tree.to_params()).unwrap();
        let params: InvocationParams = serde_json::from_str(&json).unwrap();
        assert_eq!(params.to_node().unwrap(), tree);
    }

    #[test]
    fn digest_is_deterministic_and_content_addressed() {
        let a = swap_tree();
        let b = swap_tree();
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());

        let mut c = swap_tree();
        c.sub_invocations[0].args[2] = Value::I128(101);
        assert_ne!(a.digest().unwrap(), c.digest().unwrap());
    }

    #[test]
    fn params_with_unsupported_arg_type_fail() {
        let params: InvocationParams = serde_json::from_value(json!({
            "function": {
                "contractAddress": token().to_string(),
                "functionName": "deposit",
                "args": [{ "value": 1, "type": "u64" }]
            }
        }))
        .unwrap();
        match params.to_node() {
            Err(ProtocolError::UnsupportedArgType { found }) => assert_eq!(found, "u64"),
            other => panic!("expected UnsupportedArgType, got {:?}", other),
        }
    }
}
