use std::str::FromStr;
use std::time::Duration;

use ethers::signers::LocalWallet;
use ethers::types::Address;

use crate::consts::{
    DEFAULT_CHAIN_ID, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_RECEIPT_TIMEOUT_SECS,
    DEFAULT_RELAYER_PORT, FORWARDER_DOMAIN_NAME, FORWARDER_DOMAIN_VERSION,
};
use crate::forwarder::ForwarderDomain;
use crate::prelude::*;

/// Relayer settings, read once at startup and never mutated.
#[derive(Clone)]
pub struct RelayerConfig {
    pub rpc_url: String,
    pub relayer_key: LocalWallet,
    pub forwarder_address: Address,
    pub social_core_address: Address,
    pub port: u16,
    pub domain: ForwarderDomain,
    pub rpc_timeout: Duration,
    pub receipt_timeout: Duration,
}

impl std::fmt::Debug for RelayerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayerConfig")
            .field("rpc_url", &self.rpc_url)
            .field("relayer_key", &"***")
            .field("forwarder_address", &self.forwarder_address)
            .field("social_core_address", &self.social_core_address)
            .field("port", &self.port)
            .field("domain", &self.domain)
            .field("rpc_timeout", &self.rpc_timeout)
            .field("receipt_timeout", &self.receipt_timeout)
            .finish()
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn optional<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key).map(|value| value.trim().to_string()) {
        Some(value) if !value.is_empty() => value
            .parse()
            .map_err(|e| Error::Config(format!("{key}={value:?} is invalid: {e}"))),
        _ => Ok(default),
    }
}

fn address<F>(lookup: &F, key: &str) -> Result<Address>
where
    F: Fn(&str) -> Option<String>,
{
    let value = required(lookup, key)?;
    value
        .parse()
        .map_err(|e| Error::Config(format!("{key}={value:?} is not an address: {e}")))
}

impl RelayerConfig {
    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let relayer_key = LocalWallet::from_str(&required(&lookup, "RELAYER_PRIVATE_KEY")?)
            .map_err(|e| Error::PrivateKeyParse(e.to_string()))?;
        let forwarder_address = address(&lookup, "FORWARDER_ADDRESS")?;

        Ok(RelayerConfig {
            rpc_url: required(&lookup, "RPC_URL")?,
            relayer_key,
            forwarder_address,
            social_core_address: address(&lookup, "SOCIAL_CORE_ADDRESS")?,
            port: optional(&lookup, "PORT", DEFAULT_RELAYER_PORT)?,
            domain: ForwarderDomain {
                name: optional(&lookup, "FORWARDER_DOMAIN_NAME", FORWARDER_DOMAIN_NAME.to_string())?,
                version: optional(
                    &lookup,
                    "FORWARDER_DOMAIN_VERSION",
                    FORWARDER_DOMAIN_VERSION.to_string(),
                )?,
                chain_id: optional(&lookup, "CHAIN_ID", DEFAULT_CHAIN_ID)?,
                verifying_contract: forwarder_address,
            },
            rpc_timeout: Duration::from_secs(optional(
                &lookup,
                "RPC_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
            receipt_timeout: Duration::from_secs(optional(
                &lookup,
                "RECEIPT_TIMEOUT_SECS",
                DEFAULT_RECEIPT_TIMEOUT_SECS,
            )?),
        })
    }
}
