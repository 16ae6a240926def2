use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, MiddlewareError, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, BlockId, BlockNumber, Bytes, TransactionReceipt, TransactionRequest, H256, U256};
use log::{debug, info, warn};
use thiserror::Error;

use crate::forwarder::calls::{
    decode_bool, decode_uint256, execute_calldata, is_trusted_forwarder_calldata, nonces_calldata,
};
use crate::forwarder::ForwardRequestData;
use crate::prelude::*;
use crate::relayer::RelayerConfig;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("execution reverted: {message}")]
    Reverted {
        data: Option<Bytes>,
        message: String,
        transaction_hash: Option<H256>,
    },
    #[error("no receipt for {0:?} within the timeout")]
    Timeout(H256),
    #[error("transaction {0:?} was dropped from the mempool")]
    Dropped(H256),
}

/// Everything the relayer needs from the chain. Implementations must be safe
/// to share between concurrent requests.
#[async_trait]
pub trait ForwarderChain: Send + Sync {
    fn relayer_address(&self) -> Address;

    fn forwarder_address(&self) -> Address;

    async fn nonces(&self, owner: Address) -> std::result::Result<U256, ChainError>;

    async fn is_trusted_forwarder(
        &self,
        target: Address,
        forwarder: Address,
    ) -> std::result::Result<bool, ChainError>;

    /// Sends `execute` with `request.value` attached and waits for one
    /// confirmation. A mined-but-reverted transaction is an error.
    async fn execute(
        &self,
        request: &ForwardRequestData,
    ) -> std::result::Result<TransactionReceipt, ChainError>;
}

type RelayerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// [`ForwarderChain`] over JSON-RPC, paying gas with the relayer's key.
#[derive(Debug, Clone)]
pub struct EthersForwarder {
    client: Arc<RelayerClient>,
    forwarder: Address,
    receipt_timeout: Duration,
}

fn classify<E: MiddlewareError>(err: E) -> ChainError {
    let revert_data = err.as_error_response().and_then(|resp| resp.as_revert_data());
    let is_revert = err
        .as_error_response()
        .map(|resp| resp.is_revert())
        .unwrap_or(false);
    if is_revert || revert_data.is_some() {
        ChainError::Reverted {
            data: revert_data,
            message: err.to_string(),
            transaction_hash: None,
        }
    } else {
        ChainError::Transport(err.to_string())
    }
}

async fn eth_call<M: Middleware>(
    provider: &M,
    tx: &TypedTransaction,
    block: Option<BlockId>,
) -> std::result::Result<Bytes, ChainError> {
    provider.call(tx, block).await.map_err(classify)
}

/// A target that reverts or returns something other than a bool does not
/// trust the forwarder. Transport failures stay errors.
fn trust_from_call(
    output: std::result::Result<Bytes, ChainError>,
) -> std::result::Result<bool, ChainError> {
    match output {
        Ok(output) => Ok(decode_bool(&output).unwrap_or(false)),
        Err(ChainError::Reverted { .. }) => Ok(false),
        Err(err) => Err(err),
    }
}

/// Replays a mined-but-reverted transaction at its block to recover the
/// revert data.
async fn revert_of_mined<M: Middleware>(
    provider: &M,
    tx: &TypedTransaction,
    receipt: &TransactionReceipt,
) -> ChainError {
    let block = receipt
        .block_number
        .map(|number| BlockId::Number(BlockNumber::Number(number)));
    let data = match eth_call(provider, tx, block).await {
        Ok(_) => None,
        Err(ChainError::Reverted { data, .. }) => data,
        Err(other) => {
            debug!("Replay of {:?} failed: {other}", receipt.transaction_hash);
            None
        }
    };
    ChainError::Reverted {
        data,
        message: format!(
            "transaction {:?} was mined with status 0",
            receipt.transaction_hash
        ),
        transaction_hash: Some(receipt.transaction_hash),
    }
}

impl EthersForwarder {
    pub async fn connect(config: &RelayerConfig) -> Result<Self> {
        let url = reqwest::Url::parse(&config.rpc_url)
            .map_err(|e| Error::Config(format!("RPC_URL is invalid: {e}")))?;
        let http_client = reqwest::Client::builder()
            .timeout(config.rpc_timeout)
            .build()
            .map_err(|e| Error::GenericRequest(e.to_string()))?;
        let provider = Provider::new(Http::new_with_client(url, http_client));

        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| Error::Network(format!("failed to read chain id: {e}")))?
            .as_u64();
        if chain_id != config.domain.chain_id {
            warn!(
                "RPC reports chain id {chain_id} but signatures are expected for chain id {}",
                config.domain.chain_id
            );
        }

        let wallet = config.relayer_key.clone().with_chain_id(chain_id);
        info!("Relayer wallet {:?} on chain {chain_id}", wallet.address());
        Ok(EthersForwarder {
            client: Arc::new(SignerMiddleware::new(provider, wallet)),
            forwarder: config.forwarder_address,
            receipt_timeout: config.receipt_timeout,
        })
    }

    async fn view(&self, to: Address, data: Bytes) -> std::result::Result<Bytes, ChainError> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        eth_call(self.client.provider(), &tx, None).await
    }
}

#[async_trait]
impl ForwarderChain for EthersForwarder {
    fn relayer_address(&self) -> Address {
        self.client.address()
    }

    fn forwarder_address(&self) -> Address {
        self.forwarder
    }

    async fn nonces(&self, owner: Address) -> std::result::Result<U256, ChainError> {
        let output = self.view(self.forwarder, nonces_calldata(owner)).await?;
        decode_uint256(&output).map_err(|e| ChainError::Transport(e.to_string()))
    }

    async fn is_trusted_forwarder(
        &self,
        target: Address,
        forwarder: Address,
    ) -> std::result::Result<bool, ChainError> {
        trust_from_call(
            self.view(target, is_trusted_forwarder_calldata(forwarder))
                .await,
        )
    }

    async fn execute(
        &self,
        request: &ForwardRequestData,
    ) -> std::result::Result<TransactionReceipt, ChainError> {
        let tx: TypedTransaction = TransactionRequest::new()
            .to(self.forwarder)
            .data(execute_calldata(request))
            .value(request.value)
            .into();

        let pending = self
            .client
            .send_transaction(tx.clone(), None)
            .await
            .map_err(classify)?;
        let hash = *pending;
        info!("Submitted execute for {:?}: {hash:?}", request.from);

        let receipt = tokio::time::timeout(self.receipt_timeout, pending.confirmations(1))
            .await
            .map_err(|_| ChainError::Timeout(hash))?
            .map_err(|e| ChainError::Transport(e.to_string()))?
            .ok_or(ChainError::Dropped(hash))?;

        if receipt.status.map(|status| status.is_zero()).unwrap_or(false) {
            let mut replay = tx;
            replay.set_from(self.client.address());
            return Err(revert_of_mined(self.client.provider(), &replay, &receipt).await);
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forwarder::ForwarderRevert;
    use ethers::abi::{encode, Token};
    use ethers::providers::{HttpClientError, JsonRpcError, MockResponse, ProviderError};
    use serde_json::json;

    fn invalid_signer() -> ForwarderRevert {
        ForwarderRevert::InvalidSigner {
            signer: Address::repeat_byte(0x11),
            from: Address::repeat_byte(0x22),
        }
    }

    fn reverted_with(data: &Bytes) -> JsonRpcError {
        JsonRpcError {
            code: 3,
            message: "execution reverted".to_string(),
            data: Some(json!(format!("0x{}", hex::encode(data)))),
        }
    }

    fn over_http(err: JsonRpcError) -> ProviderError {
        ProviderError::JsonRpcClientError(Box::new(HttpClientError::JsonRpcError(err)))
    }

    fn call_tx() -> TypedTransaction {
        TransactionRequest::new()
            .to(Address::repeat_byte(0x46))
            .data(Bytes::from(vec![0x12, 0x34]))
            .into()
    }

    #[test]
    fn rpc_revert_keeps_the_revert_data() {
        let revert = invalid_signer();
        match classify(over_http(reverted_with(&revert.abi_encode()))) {
            ChainError::Reverted {
                data: Some(data), ..
            } => assert_eq!(ForwarderRevert::decode(&data), Some(revert)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn nested_revert_data_is_found() {
        let revert = invalid_signer();
        let err = JsonRpcError {
            code: -32000,
            message: "execution reverted".to_string(),
            data: Some(json!({ "data": format!("0x{}", hex::encode(revert.abi_encode())) })),
        };
        assert!(matches!(
            classify(over_http(err)),
            ChainError::Reverted { data: Some(_), .. }
        ));
    }

    #[test]
    fn non_revert_errors_are_transport_errors() {
        let nonce_too_low = JsonRpcError {
            code: -32000,
            message: "nonce too low".to_string(),
            data: None,
        };
        assert!(matches!(
            classify(over_http(nonce_too_low)),
            ChainError::Transport(_)
        ));
        assert!(matches!(
            classify(ProviderError::CustomError("connection refused".to_string())),
            ChainError::Transport(_)
        ));
    }

    #[tokio::test]
    async fn mocked_call_revert_is_classified() {
        let (provider, mock) = Provider::mocked();
        let revert = invalid_signer();
        mock.push_response(MockResponse::Error(reverted_with(&revert.abi_encode())));

        match eth_call(&provider, &call_tx(), None).await {
            Err(ChainError::Reverted {
                data: Some(data), ..
            }) => assert_eq!(ForwarderRevert::decode(&data), Some(revert)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn reverting_trust_query_means_untrusted() {
        let (provider, mock) = Provider::mocked();
        mock.push_response(MockResponse::Error(reverted_with(&Bytes::default())));
        assert_eq!(
            trust_from_call(eth_call(&provider, &call_tx(), None).await),
            Ok(false)
        );

        mock.push::<Bytes, _>(Bytes::from(encode(&[Token::Bool(true)])))
            .unwrap();
        assert_eq!(
            trust_from_call(eth_call(&provider, &call_tx(), None).await),
            Ok(true)
        );

        // An EOA answers with empty output.
        mock.push::<Bytes, _>(Bytes::default()).unwrap();
        assert_eq!(
            trust_from_call(eth_call(&provider, &call_tx(), None).await),
            Ok(false)
        );
    }

    #[tokio::test]
    async fn unreachable_node_fails_the_trust_query() {
        let (provider, _mock) = Provider::mocked();
        assert!(matches!(
            trust_from_call(eth_call(&provider, &call_tx(), None).await),
            Err(ChainError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn mined_revert_is_replayed_for_its_reason() {
        let (provider, mock) = Provider::mocked();
        let revert = invalid_signer();
        mock.push_response(MockResponse::Error(reverted_with(&revert.abi_encode())));
        let receipt = TransactionReceipt {
            transaction_hash: H256::repeat_byte(0x07),
            block_number: Some(42u64.into()),
            status: Some(0u64.into()),
            ..Default::default()
        };

        match revert_of_mined(&provider, &call_tx(), &receipt).await {
            ChainError::Reverted {
                data: Some(data),
                transaction_hash,
                ..
            } => {
                assert_eq!(ForwarderRevert::decode(&data), Some(revert));
                assert_eq!(transaction_hash, Some(receipt.transaction_hash));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
