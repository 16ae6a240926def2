//! Client side of gasless calls: encode, sign against a fresh nonce, hand the
//! signed request to a relayer.

mod nonce;
mod relay_client;
mod signer;

use ethers::abi::Token;
use ethers::types::{Address, Bytes, U256};
use log::info;

pub use nonce::{ForwarderNonceReader, NonceOracle};
pub use relay_client::RelayClient;
pub use signer::{AgentError, MetaTxSigner, SignOutcome, SigningAgent};

use crate::consts::DEFAULT_META_TX_GAS;
use crate::encoder::ContractInterface;
use crate::forwarder::SignedForwardRequest;
use crate::prelude::*;
use crate::relayer::api::RelayResponse;

/// Calls functions of one target contract through a relayer.
#[derive(Debug, Clone)]
pub struct MetaTransactions<N, A> {
    signer: MetaTxSigner<N, A>,
    relay: RelayClient,
    interface: ContractInterface,
    target: Address,
}

impl<N: NonceOracle, A: SigningAgent> MetaTransactions<N, A> {
    pub fn new(
        signer: MetaTxSigner<N, A>,
        relay: RelayClient,
        interface: ContractInterface,
        target: Address,
    ) -> Self {
        MetaTransactions {
            signer,
            relay,
            interface,
            target,
        }
    }

    pub fn signer(&self) -> &MetaTxSigner<N, A> {
        &self.signer
    }

    pub fn relay(&self) -> &RelayClient {
        &self.relay
    }

    /// Encodes and signs without submitting.
    pub async fn prepare(
        &self,
        function: &str,
        args: &[Token],
        value: U256,
        gas: U256,
    ) -> Result<SignedForwardRequest> {
        let data: Bytes = self.interface.encode_call(function, args)?;
        self.signer
            .sign(self.target, value, gas, data)
            .await?
            .into_result()
    }

    /// `function(args)` with no value attached and the default gas limit.
    pub async fn execute(&self, function: &str, args: &[Token]) -> Result<RelayResponse> {
        self.execute_with(function, args, U256::zero(), U256::from(DEFAULT_META_TX_GAS))
            .await
    }

    pub async fn execute_with(
        &self,
        function: &str,
        args: &[Token],
        value: U256,
        gas: U256,
    ) -> Result<RelayResponse> {
        let signed = self.prepare(function, args, value, gas).await?;
        info!(
            "Submitting {function} for {:?} with nonce {}",
            signed.request().from,
            signed.request().nonce
        );
        self.relay.submit(&signed).await
    }
}
