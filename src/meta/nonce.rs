use std::sync::Arc;

use async_trait::async_trait;
use ethers::providers::Middleware;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, TransactionRequest, U256};

use crate::forwarder::calls::{decode_uint256, nonces_calldata};
use crate::prelude::*;

/// Source of the forwarder's current nonce for a sender. Every call is a
/// fresh round trip.
#[async_trait]
pub trait NonceOracle: Send + Sync {
    async fn fetch_nonce(&self, owner: Address) -> Result<U256>;
}

/// Reads `nonces(owner)` straight from the forwarder contract.
#[derive(Debug)]
pub struct ForwarderNonceReader<M> {
    provider: Arc<M>,
    forwarder: Address,
}

impl<M> Clone for ForwarderNonceReader<M> {
    fn clone(&self) -> Self {
        ForwarderNonceReader {
            provider: self.provider.clone(),
            forwarder: self.forwarder,
        }
    }
}

impl<M: Middleware> ForwarderNonceReader<M> {
    pub fn new(provider: Arc<M>, forwarder: Address) -> Self {
        ForwarderNonceReader {
            provider,
            forwarder,
        }
    }
}

#[async_trait]
impl<M: Middleware + 'static> NonceOracle for ForwarderNonceReader<M> {
    async fn fetch_nonce(&self, owner: Address) -> Result<U256> {
        let tx: TypedTransaction = TransactionRequest::new()
            .to(self.forwarder)
            .data(nonces_calldata(owner))
            .into();
        let output = self
            .provider
            .call(&tx, None)
            .await
            .map_err(|e| Error::Network(format!("failed to read nonce: {e}")))?;
        decode_uint256(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::{encode, Token};
    use ethers::providers::Provider;
    use ethers::types::Bytes;

    #[tokio::test]
    async fn reads_nonce_from_forwarder() {
        let (provider, mock) = Provider::mocked();
        mock.push::<Bytes, _>(Bytes::from(encode(&[Token::Uint(U256::from(7))])))
            .unwrap();

        let reader = ForwarderNonceReader::new(Arc::new(provider), Address::repeat_byte(0x46));
        assert_eq!(
            reader.fetch_nonce(Address::repeat_byte(0x01)).await.unwrap(),
            U256::from(7)
        );
    }

    #[tokio::test]
    async fn transport_failure_is_a_network_error() {
        let (provider, _mock) = Provider::mocked();
        let reader = ForwarderNonceReader::new(Arc::new(provider), Address::repeat_byte(0x46));

        let err = reader
            .fetch_nonce(Address::repeat_byte(0x01))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network(_)));
        assert!(err.is_retryable());
    }
}
