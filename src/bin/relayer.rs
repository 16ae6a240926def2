use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use log::{error, info};
use social_relay::prelude::Result;
use social_relay::relayer::{serve, EthersForwarder, ForwarderChain, RelayerConfig, RelayerService};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {e}");
        return;
    }
    info!("Shutting down relayer");
}

async fn run(config: RelayerConfig) -> Result<()> {
    let chain = EthersForwarder::connect(&config).await?;
    info!("Relayer address: {:?}", chain.relayer_address());
    info!("Forwarder address: {:?}", config.forwarder_address);
    info!("SocialCore address: {:?}", config.social_core_address);

    let service = Arc::new(RelayerService::new(
        chain,
        config.social_core_address,
        config.domain.clone(),
    ));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).map_err(|e| {
        social_relay::Error::Config(format!("failed to bind port {}: {e}", config.port))
    })?;
    serve(service, listener, shutdown_signal()).await
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match RelayerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };
    info!("Starting relayer with {config:?}");

    if let Err(e) = run(config).await {
        error!("Relayer stopped: {e}");
        std::process::exit(1);
    }
}
