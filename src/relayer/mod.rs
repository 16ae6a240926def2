//! The relaying service: the only party holding a funded key.
//!
//! It accepts signed forward requests over HTTP, checks that the target trusts
//! the forwarder and that the request has not expired, submits the forwarder's
//! `execute` and waits for the receipt. Failures come back as a structured
//! [`api::RelayErrorBody`], never retried here.

pub mod api;
pub mod chain;
mod config;
mod receipt;
mod server;
mod service;

pub use chain::{ChainError, EthersForwarder, ForwarderChain};
pub use config::RelayerConfig;
pub use receipt::{LogSummary, ReceiptStatus, ReceiptSummary};
pub use server::{router, serve, status_for, ApiError};
pub use service::RelayerService;
