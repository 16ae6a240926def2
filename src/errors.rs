use ethers::types::{Address, H256, U256};
use thiserror::Error;

use crate::forwarder::ExecutionFailure;
use crate::relayer::api::RelayErrorBody;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Encoding error: {0}")]
    Encoding(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Nonce changed during signing: expected {expected}, got {observed}. Please retry.")]
    NonceRace { expected: U256, observed: U256 },
    #[error("Signing request was rejected by the wallet")]
    UserRejected,
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Missing required fields: {0}")]
    MissingFields(String),
    #[error("Target {target:?} does not trust forwarder {forwarder:?}")]
    UntrustedForwarder { target: Address, forwarder: Address },
    #[error("Request expired: deadline {deadline} is before current time {now}")]
    ExpiredRequest { deadline: u64, now: u64 },
    #[error("Execution reverted: {0}")]
    ExecutionReverted(ExecutionFailure),
    #[error("Transaction {hash:?} was sent but not confirmed: {reason}")]
    Unconfirmed { hash: H256, reason: String },
    #[error("Relayer rejected request: status code: {status_code}, error: {}, message: {}", body.error, body.message)]
    RelayRejected {
        status_code: u16,
        body: Box<RelayErrorBody>,
    },
    #[error("Config error: {0}")]
    Config(String),
    #[error("Json parse error {0:?}")]
    JsonParse(String),
    #[error("Wallet error {0:?}")]
    Wallet(String),
    #[error("Private key parse error {0:?}")]
    PrivateKeyParse(String),
    #[error("Signature failure {0:?}")]
    SignatureFailure(String),
    #[error("Generic request error: {0:?}")]
    GenericRequest(String),
}

impl Error {
    /// Machine-readable name carried in relayer error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Encoding(_) => "EncodingError",
            Error::Network(_) => "NetworkError",
            Error::NonceRace { .. } => "NonceRaceError",
            Error::UserRejected => "UserRejectedError",
            Error::Validation(_) | Error::MissingFields(_) | Error::JsonParse(_) => {
                "ValidationError"
            }
            Error::UntrustedForwarder { .. } => "UntrustedForwarderError",
            Error::ExpiredRequest { .. } => "ExpiredRequestError",
            Error::ExecutionReverted(_) => "ExecutionRevertedError",
            Error::Unconfirmed { .. } => "UnconfirmedTransactionError",
            Error::RelayRejected { .. } => "RelayRejectedError",
            Error::Config(_) => "ConfigError",
            Error::Wallet(_) | Error::PrivateKeyParse(_) | Error::SignatureFailure(_) => {
                "SignatureError"
            }
            Error::GenericRequest(_) => "RequestError",
        }
    }

    /// Whether repeating the same call unchanged can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}
