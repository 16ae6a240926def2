use std::time::Duration;

use async_trait::async_trait;
use ethers::types::{Address, U256};
use log::info;
use reqwest::Client;

use crate::consts::DEFAULT_HTTP_TIMEOUT_SECS;
use crate::forwarder::SignedForwardRequest;
use crate::helpers::{parse_decimal_u256, BaseUrl};
use crate::meta::NonceOracle;
use crate::prelude::*;
use crate::relayer::api::{HealthResponse, NonceResponse, RelayBody, RelayResponse};
use crate::req::HttpClient;

/// Talks to a relayer over HTTP.
#[derive(Debug, Clone)]
pub struct RelayClient {
    pub http_client: HttpClient,
}

impl RelayClient {
    /// Defaults to a local relayer and a client with a bounded timeout.
    pub fn new(client: Option<Client>, base_url: Option<BaseUrl>) -> Result<RelayClient> {
        let client = match client {
            Some(client) => client,
            None => Client::builder()
                .timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
                .build()
                .map_err(|e| Error::GenericRequest(e.to_string()))?,
        };
        let base_url = base_url.unwrap_or(BaseUrl::Localhost).get_url();

        Ok(RelayClient {
            http_client: HttpClient { client, base_url },
        })
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let text = self.http_client.get("/health").await?;
        serde_json::from_str(&text).map_err(|e| Error::JsonParse(e.to_string()))
    }

    pub async fn nonce(&self, address: Address) -> Result<U256> {
        let text = self.http_client.get(&format!("/nonce/{address:?}")).await?;
        let response: NonceResponse =
            serde_json::from_str(&text).map_err(|e| Error::JsonParse(e.to_string()))?;
        parse_decimal_u256("nonce", &response.nonce)
    }

    /// Posts a signed request to `/relay`. A non-2xx answer comes back as
    /// [`Error::RelayRejected`] with the relayer's diagnosis attached.
    pub async fn submit(&self, signed: &SignedForwardRequest) -> Result<RelayResponse> {
        let body = RelayBody {
            request: signed.to_serialized(),
        };
        let data = serde_json::to_string(&body).map_err(|e| Error::JsonParse(e.to_string()))?;

        let text = self.http_client.post("/relay", data).await?;
        let response: RelayResponse =
            serde_json::from_str(&text).map_err(|e| Error::JsonParse(e.to_string()))?;
        info!(
            "Meta-transaction from {:?} relayed: {:?}",
            signed.request().from,
            response.hash
        );
        Ok(response)
    }
}

#[async_trait]
impl NonceOracle for RelayClient {
    async fn fetch_nonce(&self, owner: Address) -> Result<U256> {
        self.nonce(owner).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_local_relayer() {
        let client = RelayClient::new(None, None).unwrap();
        assert_eq!(client.http_client.base_url, "http://localhost:3001");

        let client =
            RelayClient::new(None, Some(BaseUrl::Custom("https://relay.example/".into()))).unwrap();
        assert_eq!(client.http_client.base_url, "https://relay.example");
    }

    #[tokio::test]
    async fn unreachable_relayer_is_a_retryable_network_error() {
        let client =
            RelayClient::new(None, Some(BaseUrl::Custom("http://127.0.0.1:1".into()))).unwrap();
        let err = client.fetch_nonce(Address::zero()).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)), "{err:?}");
        assert!(err.is_retryable());
    }
}
