use std::env;
use std::str::FromStr;

use ethers::abi::Token;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use log::{error, info};
use social_relay::prelude::Result;
use social_relay::{
    BaseUrl, ContractInterface, Error, ForwarderDomain, MetaTransactions, MetaTxSigner,
    RelayClient,
};

fn env_var(key: &str) -> Result<String> {
    env::var(key).map_err(|_| {
        Error::Config(format!(
            "{key} environment variable not found. Please set it in your .env file or environment."
        ))
    })
}

fn env_address(key: &str) -> Result<Address> {
    env_var(key)?
        .parse()
        .map_err(|e| Error::Config(format!("{key} is not an address: {e}")))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    dotenv::dotenv().ok();

    let username = env::args().nth(1).unwrap_or_else(|| "alice".to_string());
    let wallet = LocalWallet::from_str(&env_var("USER_PRIVATE_KEY")?)
        .map_err(|e| Error::PrivateKeyParse(e.to_string()))?;
    let forwarder = env_address("FORWARDER_ADDRESS")?;
    let social_core = env_address("SOCIAL_CORE_ADDRESS")?;
    let base_url = env::var("RELAYER_URL").ok().map(BaseUrl::Custom);
    info!("User wallet: {:?}", wallet.address());

    let relay = RelayClient::new(None, base_url)?;
    let health = relay.health().await?;
    info!(
        "Relayer {:?} is {} on chain {}",
        health.relayer_address, health.status, health.chain_id
    );

    let domain = ForwarderDomain::new(forwarder).with_chain_id(health.chain_id);
    let signer = MetaTxSigner::new(relay.clone(), wallet, domain);
    let interface =
        ContractInterface::from_human_readable(&["function createProfile(string username)"])?;
    let meta = MetaTransactions::new(signer, relay, interface, social_core);

    match meta
        .execute("createProfile", &[Token::String(username.clone())])
        .await
    {
        Ok(response) => {
            info!("Profile {username:?} created in {:?}", response.hash);
            info!("Gas used: {:?}", response.receipt.gas_used);
            Ok(())
        }
        Err(Error::RelayRejected { status_code, body }) => {
            error!("Relayer answered {status_code}: {}", body.message);
            if let Some(explanation) = &body.explanation {
                error!("Explanation: {explanation}");
            }
            for cause in &body.possible_causes {
                error!("  - {cause}");
            }
            Err(Error::RelayRejected { status_code, body })
        }
        Err(e) => {
            error!("Failed to create profile: {e}");
            Err(e)
        }
    }
}
