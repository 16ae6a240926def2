//! ABI call encoding for target contracts.
//!
//! A [`ContractInterface`] wraps the contract's ABI description and turns a
//! function name plus typed arguments into calldata, the same bytes the
//! contract's own dispatcher expects: the 4-byte selector of the canonical
//! signature followed by the argument words in declaration order.

use ethers::abi::token::{LenientTokenizer, Tokenizer};
use ethers::abi::{Abi, Function, Token};
use ethers::types::Bytes;
use serde_json::Value;

use crate::prelude::*;

#[derive(Debug, Clone)]
pub struct ContractInterface {
    abi: Abi,
}

/// A calldata payload resolved back to the function it invokes.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCall {
    pub name: String,
    pub signature: String,
    pub args: Vec<Token>,
}

/// `name(type1,type2,...)`, the string the selector is hashed from.
pub fn canonical_signature(function: &Function) -> String {
    let inputs = function
        .inputs
        .iter()
        .map(|param| param.kind.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("{}({inputs})", function.name)
}

impl ContractInterface {
    pub fn new(abi: Abi) -> Self {
        ContractInterface { abi }
    }

    /// Accepts a bare ABI array or a compiler artifact with an `abi` field.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| Error::JsonParse(e.to_string()))?;
        let abi_value = match value {
            Value::Object(mut artifact) => artifact
                .remove("abi")
                .ok_or_else(|| Error::Encoding("artifact has no `abi` field".to_string()))?,
            other => other,
        };
        let abi: Abi = serde_json::from_value(abi_value)
            .map_err(|e| Error::Encoding(format!("invalid ABI description: {e}")))?;
        Ok(ContractInterface { abi })
    }

    /// Human-readable signatures, e.g. `function createProfile(string username)`.
    pub fn from_human_readable(signatures: &[&str]) -> Result<Self> {
        let abi = ethers::abi::parse_abi(signatures)
            .map_err(|e| Error::Encoding(format!("invalid ABI signature: {e}")))?;
        Ok(ContractInterface { abi })
    }

    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    fn overloads(&self, name: &str) -> Result<&Vec<Function>> {
        self.abi
            .functions_by_name(name)
            .map_err(|_| Error::Encoding(format!("function `{name}` not found in interface")))
    }

    pub fn encode_call(&self, name: &str, args: &[Token]) -> Result<Bytes> {
        let overloads = self.overloads(name)?;
        let function = overloads
            .iter()
            .find(|function| {
                let kinds = function
                    .inputs
                    .iter()
                    .map(|param| param.kind.clone())
                    .collect::<Vec<_>>();
                Token::types_check(args, &kinds)
            })
            .ok_or_else(|| {
                let expected = overloads
                    .iter()
                    .map(canonical_signature)
                    .collect::<Vec<_>>()
                    .join(" | ");
                Error::Encoding(format!(
                    "arguments {args:?} do not match any overload of `{name}`: {expected}"
                ))
            })?;

        function
            .encode_input(args)
            .map(Bytes::from)
            .map_err(|e| Error::Encoding(format!("failed to encode `{name}`: {e}")))
    }

    /// Tokenizes each argument leniently against the declared parameter type
    /// (`"42"` for a `uint256`, `"0xabc..."` for an `address`).
    pub fn encode_call_from_strs(&self, name: &str, args: &[&str]) -> Result<Bytes> {
        let overloads = self.overloads(name)?;
        let mut last_error = None;
        for function in overloads.iter().filter(|f| f.inputs.len() == args.len()) {
            let tokens = function
                .inputs
                .iter()
                .zip(args)
                .map(|(param, arg)| LenientTokenizer::tokenize(&param.kind, arg))
                .collect::<std::result::Result<Vec<_>, _>>();
            match tokens {
                Ok(tokens) => {
                    return function
                        .encode_input(&tokens)
                        .map(Bytes::from)
                        .map_err(|e| Error::Encoding(format!("failed to encode `{name}`: {e}")))
                }
                Err(e) => last_error = Some(format!("{}: {e}", canonical_signature(function))),
            }
        }
        Err(Error::Encoding(match last_error {
            Some(reason) => format!("arguments {args:?} do not fit `{name}`: {reason}"),
            None => format!("no overload of `{name}` takes {} arguments", args.len()),
        }))
    }

    pub fn decode_call(&self, data: &[u8]) -> Result<DecodedCall> {
        if data.len() < 4 {
            return Err(Error::Encoding(format!(
                "calldata is {} bytes, shorter than a selector",
                data.len()
            )));
        }
        let (selector, body) = data.split_at(4);
        let function = self
            .abi
            .functions()
            .find(|function| function.short_signature() == selector)
            .ok_or_else(|| {
                Error::Encoding(format!("unknown selector 0x{}", hex::encode(selector)))
            })?;
        let args = function
            .decode_input(body)
            .map_err(|e| Error::Encoding(format!("failed to decode `{}`: {e}", function.name)))?;
        Ok(DecodedCall {
            name: function.name.clone(),
            signature: canonical_signature(function),
            args,
        })
    }
}
