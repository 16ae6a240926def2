//! Structured decoding of forwarder revert data.

use std::fmt;

use ethers::abi::{decode, encode, ParamType, Token};
use ethers::types::{Address, Bytes, U256};
use ethers::utils::id;
use lazy_static::lazy_static;

const INVALID_SIGNER: &str = "ERC2771ForwarderInvalidSigner(address,address)";
const MISMATCHED_VALUE: &str = "ERC2771ForwarderMismatchedValue(uint256,uint256)";
const EXPIRED_REQUEST: &str = "ERC2771ForwarderExpiredRequest(uint48)";
const UNTRUSTFUL_TARGET: &str = "ERC2771UntrustfulTarget(address,address)";
const ERROR_STRING: &str = "Error(string)";
const PANIC: &str = "Panic(uint256)";

lazy_static! {
    static ref INVALID_SIGNER_SELECTOR: [u8; 4] = id(INVALID_SIGNER);
    static ref MISMATCHED_VALUE_SELECTOR: [u8; 4] = id(MISMATCHED_VALUE);
    static ref EXPIRED_REQUEST_SELECTOR: [u8; 4] = id(EXPIRED_REQUEST);
    static ref UNTRUSTFUL_TARGET_SELECTOR: [u8; 4] = id(UNTRUSTFUL_TARGET);
    static ref ERROR_STRING_SELECTOR: [u8; 4] = id(ERROR_STRING);
    static ref PANIC_SELECTOR: [u8; 4] = id(PANIC);
}

/// Reasons the forwarder (or the call it makes) can revert with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwarderRevert {
    InvalidSigner { signer: Address, from: Address },
    MismatchedValue { requested_value: U256, msg_value: U256 },
    ExpiredRequest { deadline: u64 },
    UntrustfulTarget { target: Address, forwarder: Address },
    /// `require(..., "reason")` style revert.
    Message { reason: String },
    Panic { code: U256 },
    Unknown { data: Bytes },
}

impl ForwarderRevert {
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }
        let (selector, args) = data.split_at(4);
        let revert = if selector == INVALID_SIGNER_SELECTOR.as_slice() {
            match decode(&[ParamType::Address, ParamType::Address], args).ok()?.as_slice() {
                [Token::Address(signer), Token::Address(from)] => ForwarderRevert::InvalidSigner {
                    signer: *signer,
                    from: *from,
                },
                _ => return None,
            }
        } else if selector == MISMATCHED_VALUE_SELECTOR.as_slice() {
            match decode(&[ParamType::Uint(256), ParamType::Uint(256)], args).ok()?.as_slice() {
                [Token::Uint(requested_value), Token::Uint(msg_value)] => {
                    ForwarderRevert::MismatchedValue {
                        requested_value: *requested_value,
                        msg_value: *msg_value,
                    }
                }
                _ => return None,
            }
        } else if selector == EXPIRED_REQUEST_SELECTOR.as_slice() {
            match decode(&[ParamType::Uint(48)], args).ok()?.as_slice() {
                [Token::Uint(deadline)] => ForwarderRevert::ExpiredRequest {
                    deadline: deadline.low_u64(),
                },
                _ => return None,
            }
        } else if selector == UNTRUSTFUL_TARGET_SELECTOR.as_slice() {
            match decode(&[ParamType::Address, ParamType::Address], args).ok()?.as_slice() {
                [Token::Address(target), Token::Address(forwarder)] => {
                    ForwarderRevert::UntrustfulTarget {
                        target: *target,
                        forwarder: *forwarder,
                    }
                }
                _ => return None,
            }
        } else if selector == ERROR_STRING_SELECTOR.as_slice() {
            match decode(&[ParamType::String], args).ok()?.as_slice() {
                [Token::String(reason)] => ForwarderRevert::Message {
                    reason: reason.clone(),
                },
                _ => return None,
            }
        } else if selector == PANIC_SELECTOR.as_slice() {
            match decode(&[ParamType::Uint(256)], args).ok()?.as_slice() {
                [Token::Uint(code)] => ForwarderRevert::Panic { code: *code },
                _ => return None,
            }
        } else {
            ForwarderRevert::Unknown {
                data: Bytes::from(data.to_vec()),
            }
        };
        Some(revert)
    }

    /// Revert data as the contract would emit it.
    pub fn abi_encode(&self) -> Bytes {
        let (selector, tokens): (&[u8; 4], Vec<Token>) = match self {
            ForwarderRevert::InvalidSigner { signer, from } => (
                &*INVALID_SIGNER_SELECTOR,
                vec![Token::Address(*signer), Token::Address(*from)],
            ),
            ForwarderRevert::MismatchedValue {
                requested_value,
                msg_value,
            } => (
                &*MISMATCHED_VALUE_SELECTOR,
                vec![Token::Uint(*requested_value), Token::Uint(*msg_value)],
            ),
            ForwarderRevert::ExpiredRequest { deadline } => (
                &*EXPIRED_REQUEST_SELECTOR,
                vec![Token::Uint(U256::from(*deadline))],
            ),
            ForwarderRevert::UntrustfulTarget { target, forwarder } => (
                &*UNTRUSTFUL_TARGET_SELECTOR,
                vec![Token::Address(*target), Token::Address(*forwarder)],
            ),
            ForwarderRevert::Message { reason } => {
                (&*ERROR_STRING_SELECTOR, vec![Token::String(reason.clone())])
            }
            ForwarderRevert::Panic { code } => (&*PANIC_SELECTOR, vec![Token::Uint(*code)]),
            ForwarderRevert::Unknown { data } => return data.clone(),
        };
        let mut out = selector.to_vec();
        out.extend(encode(&tokens));
        Bytes::from(out)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ForwarderRevert::InvalidSigner { .. } => "ERC2771ForwarderInvalidSigner",
            ForwarderRevert::MismatchedValue { .. } => "ERC2771ForwarderMismatchedValue",
            ForwarderRevert::ExpiredRequest { .. } => "ERC2771ForwarderExpiredRequest",
            ForwarderRevert::UntrustfulTarget { .. } => "ERC2771UntrustfulTarget",
            ForwarderRevert::Message { .. } => "Error",
            ForwarderRevert::Panic { .. } => "Panic",
            ForwarderRevert::Unknown { .. } => "Unknown",
        }
    }

    pub fn explanation(&self) -> String {
        match self {
            ForwarderRevert::InvalidSigner { signer, from } => format!(
                "The signature recovers to {signer:?} instead of {from:?}, so the forwarder rejected it."
            ),
            ForwarderRevert::MismatchedValue {
                requested_value,
                msg_value,
            } => format!(
                "The request forwards {requested_value} wei but the transaction carried {msg_value} wei."
            ),
            ForwarderRevert::ExpiredRequest { deadline } => {
                format!("The request deadline {deadline} passed before execution.")
            }
            ForwarderRevert::UntrustfulTarget { target, forwarder } => format!(
                "Target {target:?} does not accept calls forwarded by {forwarder:?}."
            ),
            ForwarderRevert::Message { reason } => {
                format!("The target call reverted with reason: {reason}")
            }
            ForwarderRevert::Panic { code } => {
                format!("The target call panicked with code 0x{code:x}.")
            }
            ForwarderRevert::Unknown { data } => {
                format!("Unrecognized revert data {data}.")
            }
        }
    }

    pub fn possible_causes(&self) -> Vec<&'static str> {
        match self {
            ForwarderRevert::InvalidSigner { .. } => vec![
                "Nonce mismatch (signature was created with a stale nonce or the request was already executed)",
                "Domain separator mismatch (name, version, chain id or forwarder address)",
                "Wrong signer address",
                "Signature format issue",
            ],
            ForwarderRevert::MismatchedValue { .. } => {
                vec!["The relayer did not attach the requested value to the transaction"]
            }
            ForwarderRevert::ExpiredRequest { .. } => vec![
                "The request waited too long between signing and execution",
                "Client clock is ahead of the chain",
            ],
            ForwarderRevert::UntrustfulTarget { .. } => vec![
                "Target contract was deployed with a different trusted forwarder",
                "Relayer is configured with the wrong forwarder address",
            ],
            ForwarderRevert::Message { .. } | ForwarderRevert::Panic { .. } => {
                vec!["The target contract rejected the call itself"]
            }
            ForwarderRevert::Unknown { .. } => vec![],
        }
    }
}

impl fmt::Display for ForwarderRevert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), self.explanation())
    }
}
