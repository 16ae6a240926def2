pub mod calls;
mod eip712;
mod request;
mod revert;

use std::fmt;

use ethers::types::H256;

pub use eip712::{ForwarderDomain, TypedForwardRequest, FORWARD_REQUEST_TYPE};
pub use request::{
    ForwardRequest, ForwardRequestData, SerializedForwardRequest, SignedForwardRequest,
};
pub use revert::ForwarderRevert;

/// A failed `execute`, with the decoded reason when the revert data was
/// recognizable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionFailure {
    pub revert: Option<ForwarderRevert>,
    pub message: String,
    /// Set when the transaction was mined and then reverted.
    pub transaction_hash: Option<H256>,
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.revert {
            Some(revert) => write!(f, "{revert}"),
            None => write!(f, "{}", self.message),
        }
    }
}
