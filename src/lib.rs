#![deny(unreachable_pub)]
mod consts;
pub mod encoder;
mod errors;
pub mod forwarder;
mod helpers;
pub mod meta;
pub mod prelude;
pub mod relayer;
mod req;

pub use consts::{
    DEFAULT_CHAIN_ID, DEFAULT_DEADLINE_WINDOW_SECS, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_META_TX_GAS, DEFAULT_RECEIPT_TIMEOUT_SECS, DEFAULT_RELAYER_PORT,
    FORWARDER_DOMAIN_NAME, FORWARDER_DOMAIN_VERSION, LOCAL_RELAYER_URL, MAX_DEADLINE,
};
pub use encoder::{ContractInterface, DecodedCall};
pub use errors::Error;
pub use forwarder::{
    ExecutionFailure, ForwardRequest, ForwardRequestData, ForwarderDomain, ForwarderRevert,
    SerializedForwardRequest, SignedForwardRequest,
};
pub use helpers::BaseUrl;
pub use meta::{
    ForwarderNonceReader, MetaTransactions, MetaTxSigner, NonceOracle, RelayClient, SignOutcome,
    SigningAgent,
};
pub use relayer::api::{RelayErrorBody, RelayResponse};
pub use relayer::{EthersForwarder, ForwarderChain, RelayerConfig, RelayerService};
pub use req::HttpClient;
