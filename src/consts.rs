pub const LOCAL_RELAYER_URL: &str = "http://localhost:3001";

/// Somnia testnet
pub const DEFAULT_CHAIN_ID: u64 = 50312;
pub const FORWARDER_DOMAIN_NAME: &str = "SocialForwarder";
pub const FORWARDER_DOMAIN_VERSION: &str = "1";

pub const DEFAULT_RELAYER_PORT: u16 = 3001;

/// Seconds a freshly signed request stays executable.
pub const DEFAULT_DEADLINE_WINDOW_SECS: u64 = 3600;
pub const DEFAULT_META_TX_GAS: u64 = 1_000_000;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 120;

/// `deadline` is a `uint48` in the forwarder.
pub const MAX_DEADLINE: u64 = (1 << 48) - 1;
