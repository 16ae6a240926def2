//! Calldata for the forwarder and target entry points the relay touches.

use ethers::abi::{decode, encode, ParamType, Token};
use ethers::types::{Address, Bytes, U256};
use ethers::utils::id;
use lazy_static::lazy_static;

use crate::forwarder::ForwardRequestData;
use crate::prelude::*;

pub const EXECUTE_SIGNATURE: &str = "execute((address,address,uint256,uint256,uint48,bytes,bytes))";
pub const NONCES_SIGNATURE: &str = "nonces(address)";
pub const IS_TRUSTED_FORWARDER_SIGNATURE: &str = "isTrustedForwarder(address)";

lazy_static! {
    static ref EXECUTE_SELECTOR: [u8; 4] = id(EXECUTE_SIGNATURE);
    static ref NONCES_SELECTOR: [u8; 4] = id(NONCES_SIGNATURE);
    static ref IS_TRUSTED_FORWARDER_SELECTOR: [u8; 4] = id(IS_TRUSTED_FORWARDER_SIGNATURE);
}

fn with_selector(selector: &[u8; 4], tokens: &[Token]) -> Bytes {
    let mut data = selector.to_vec();
    data.extend(encode(tokens));
    Bytes::from(data)
}

pub fn execute_calldata(request: &ForwardRequestData) -> Bytes {
    with_selector(
        &EXECUTE_SELECTOR,
        &[Token::Tuple(vec![
            Token::Address(request.from),
            Token::Address(request.to),
            Token::Uint(request.value),
            Token::Uint(request.gas),
            Token::Uint(U256::from(request.deadline)),
            Token::Bytes(request.data.to_vec()),
            Token::Bytes(request.signature.to_vec()),
        ])],
    )
}

pub fn nonces_calldata(owner: Address) -> Bytes {
    with_selector(&NONCES_SELECTOR, &[Token::Address(owner)])
}

pub fn is_trusted_forwarder_calldata(forwarder: Address) -> Bytes {
    with_selector(&IS_TRUSTED_FORWARDER_SELECTOR, &[Token::Address(forwarder)])
}

pub fn decode_uint256(output: &[u8]) -> Result<U256> {
    match decode(&[ParamType::Uint(256)], output).as_deref() {
        Ok([Token::Uint(value)]) => Ok(*value),
        _ => Err(Error::Network(format!(
            "unexpected uint256 return data 0x{}",
            hex::encode(output)
        ))),
    }
}

/// `None` when the output is not a single ABI bool, e.g. the target is an EOA
/// or does not implement ERC-2771.
pub fn decode_bool(output: &[u8]) -> Option<bool> {
    match decode(&[ParamType::Bool], output).as_deref() {
        Ok([Token::Bool(value)]) => Some(*value),
        _ => None,
    }
}
