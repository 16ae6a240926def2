use std::convert::Infallible;

use ethers::abi::{encode, Token};
use ethers::types::transaction::eip712::{EIP712Domain, Eip712};
use ethers::types::{Address, U256};
use ethers::utils::keccak256;
use lazy_static::lazy_static;

use crate::consts::{DEFAULT_CHAIN_ID, FORWARDER_DOMAIN_NAME, FORWARDER_DOMAIN_VERSION};
use crate::forwarder::ForwardRequest;

pub const FORWARD_REQUEST_TYPE: &str = concat!(
    "ForwardRequest(address from,address to,uint256 value,uint256 gas,",
    "uint256 nonce,uint48 deadline,bytes data)"
);

lazy_static! {
    static ref FORWARD_REQUEST_TYPE_HASH: [u8; 32] = keccak256(FORWARD_REQUEST_TYPE);
}

/// The forwarder's EIP-712 domain. Signatures are only valid against the
/// contract and chain named here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwarderDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl ForwarderDomain {
    pub fn new(verifying_contract: Address) -> Self {
        ForwarderDomain {
            name: FORWARDER_DOMAIN_NAME.to_string(),
            version: FORWARDER_DOMAIN_VERSION.to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            verifying_contract,
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn eip712_domain(&self) -> EIP712Domain {
        EIP712Domain {
            name: Some(self.name.clone()),
            version: Some(self.version.clone()),
            chain_id: Some(U256::from(self.chain_id)),
            verifying_contract: Some(self.verifying_contract),
            salt: None,
        }
    }
}

/// A [`ForwardRequest`] bound to the domain it is signed under.
#[derive(Debug, Clone, Copy)]
pub struct TypedForwardRequest<'a> {
    pub request: &'a ForwardRequest,
    pub domain: &'a ForwarderDomain,
}

impl<'a> TypedForwardRequest<'a> {
    pub fn new(request: &'a ForwardRequest, domain: &'a ForwarderDomain) -> Self {
        TypedForwardRequest { request, domain }
    }
}

impl Eip712 for TypedForwardRequest<'_> {
    type Error = Infallible;

    fn domain(&self) -> Result<EIP712Domain, Self::Error> {
        Ok(self.domain.eip712_domain())
    }

    fn type_hash() -> Result<[u8; 32], Self::Error> {
        Ok(*FORWARD_REQUEST_TYPE_HASH)
    }

    fn struct_hash(&self) -> Result<[u8; 32], Self::Error> {
        let request = self.request;
        Ok(keccak256(encode(&[
            Token::FixedBytes(FORWARD_REQUEST_TYPE_HASH.to_vec()),
            Token::Address(request.from),
            Token::Address(request.to),
            Token::Uint(request.value),
            Token::Uint(request.gas),
            Token::Uint(request.nonce),
            Token::Uint(U256::from(request.deadline)),
            Token::FixedBytes(keccak256(&request.data).to_vec()),
        ])))
    }
}
