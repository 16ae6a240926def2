use std::time::Duration;

use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, Signature, U256};
use log::{debug, info, warn};
use thiserror::Error;

use crate::consts::{DEFAULT_DEADLINE_WINDOW_SECS, MAX_DEADLINE};
use crate::forwarder::{ForwardRequest, ForwarderDomain, SignedForwardRequest, TypedForwardRequest};
use crate::helpers::now_unix;
use crate::meta::NonceOracle;
use crate::prelude::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("signing request was rejected")]
    Rejected,
    #[error("signing failed: {0}")]
    Failed(String),
}

/// Whoever holds the sender's key: a local wallet, or a remote wallet that may
/// ask a human and wait indefinitely.
#[async_trait]
pub trait SigningAgent: Send + Sync {
    fn signer_address(&self) -> Address;

    async fn sign_forward_request(
        &self,
        typed: &TypedForwardRequest<'_>,
    ) -> std::result::Result<Signature, AgentError>;
}

#[async_trait]
impl SigningAgent for LocalWallet {
    fn signer_address(&self) -> Address {
        self.address()
    }

    async fn sign_forward_request(
        &self,
        typed: &TypedForwardRequest<'_>,
    ) -> std::result::Result<Signature, AgentError> {
        self.sign_typed_data(typed)
            .await
            .map_err(|e| AgentError::Failed(e.to_string()))
    }
}

/// What a signing attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutcome {
    Signed(SignedForwardRequest),
    /// The nonce moved while the agent was signing; the signature was thrown
    /// away.
    NonceRace { expected: U256, observed: U256 },
    UserRejected,
}

impl SignOutcome {
    pub fn into_result(self) -> Result<SignedForwardRequest> {
        match self {
            SignOutcome::Signed(signed) => Ok(signed),
            SignOutcome::NonceRace { expected, observed } => {
                Err(Error::NonceRace { expected, observed })
            }
            SignOutcome::UserRejected => Err(Error::UserRejected),
        }
    }
}

/// Builds and signs forward requests bound to the sender's current nonce.
#[derive(Debug, Clone)]
pub struct MetaTxSigner<N, A> {
    nonce_oracle: N,
    agent: A,
    domain: ForwarderDomain,
    deadline_window: Duration,
}

impl<N: NonceOracle, A: SigningAgent> MetaTxSigner<N, A> {
    pub fn new(nonce_oracle: N, agent: A, domain: ForwarderDomain) -> Self {
        MetaTxSigner {
            nonce_oracle,
            agent,
            domain,
            deadline_window: Duration::from_secs(DEFAULT_DEADLINE_WINDOW_SECS),
        }
    }

    /// How far in the future signed requests expire. Whole seconds, at least
    /// one; checked when signing.
    pub fn with_deadline_window(mut self, deadline_window: Duration) -> Self {
        self.deadline_window = deadline_window;
        self
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn domain(&self) -> &ForwarderDomain {
        &self.domain
    }

    pub fn address(&self) -> Address {
        self.agent.signer_address()
    }

    /// Fetches the nonce, signs, then fetches it again. A signature over a
    /// nonce that changed in between is never returned.
    pub async fn sign(
        &self,
        to: Address,
        value: U256,
        gas: U256,
        data: Bytes,
    ) -> Result<SignOutcome> {
        let window = self.deadline_window.as_secs();
        if window == 0 {
            return Err(Error::Validation(
                "deadline window must be at least one second".to_string(),
            ));
        }
        let deadline = now_unix()
            .checked_add(window)
            .filter(|deadline| *deadline <= MAX_DEADLINE)
            .ok_or_else(|| {
                Error::Validation(format!("a deadline window of {window}s does not fit in uint48"))
            })?;

        let from = self.agent.signer_address();
        let expected = self.nonce_oracle.fetch_nonce(from).await?;
        debug!("Nonce for {from:?} before signing: {expected}");

        let request = ForwardRequest {
            from,
            to,
            value,
            gas,
            nonce: expected,
            deadline,
            data,
        };

        let typed = TypedForwardRequest::new(&request, &self.domain);
        let signature = match self.agent.sign_forward_request(&typed).await {
            Ok(signature) => signature,
            Err(AgentError::Rejected) => {
                info!("Signing of request for {from:?} was rejected");
                return Ok(SignOutcome::UserRejected);
            }
            Err(AgentError::Failed(message)) => return Err(Error::SignatureFailure(message)),
        };

        let observed = self.nonce_oracle.fetch_nonce(from).await?;
        if observed != expected {
            warn!("Nonce for {from:?} moved from {expected} to {observed} while signing");
            return Ok(SignOutcome::NonceRace { expected, observed });
        }

        Ok(SignOutcome::Signed(SignedForwardRequest::new(
            request, signature,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    /// Returns 5, then 5 + `bump` on every later call.
    struct SteppingOracle {
        calls: AtomicU64,
        bump: u64,
    }

    #[async_trait]
    impl NonceOracle for SteppingOracle {
        async fn fetch_nonce(&self, _owner: Address) -> Result<U256> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(U256::from(if call == 0 { 5 } else { 5 + self.bump }))
        }
    }

    struct DecliningAgent;

    #[async_trait]
    impl SigningAgent for DecliningAgent {
        fn signer_address(&self) -> Address {
            Address::repeat_byte(0xaa)
        }

        async fn sign_forward_request(
            &self,
            _typed: &TypedForwardRequest<'_>,
        ) -> std::result::Result<Signature, AgentError> {
            Err(AgentError::Rejected)
        }
    }

    fn signer<A: SigningAgent>(bump: u64, agent: A) -> MetaTxSigner<SteppingOracle, A> {
        MetaTxSigner::new(
            SteppingOracle {
                calls: AtomicU64::new(0),
                bump,
            },
            agent,
            ForwarderDomain::new(Address::repeat_byte(0x46)),
        )
    }

    fn wallet() -> LocalWallet {
        DEV_KEY.parse().unwrap()
    }

    #[tokio::test]
    async fn signs_with_the_current_nonce() {
        let signer = signer(0, wallet());
        let target = Address::repeat_byte(0xd7);
        let before = now_unix();

        let signed = signer
            .sign(target, U256::zero(), U256::from(1_000_000), Bytes::from(vec![1, 2, 3]))
            .await
            .unwrap()
            .into_result()
            .unwrap();

        let request = signed.request();
        assert_eq!(request.nonce, U256::from(5));
        assert_eq!(request.to, target);
        assert!(request.deadline >= before + 3600);
        assert_eq!(
            request.recover_signer(signer.domain(), signed.signature()),
            Some(wallet().address())
        );
    }

    #[tokio::test]
    async fn nonce_change_during_signing_discards_the_signature() {
        let outcome = signer(1, wallet())
            .sign(Address::zero(), U256::zero(), U256::one(), Bytes::from(vec![1]))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SignOutcome::NonceRace {
                expected: U256::from(5),
                observed: U256::from(6)
            }
        );
        assert!(matches!(outcome.into_result(), Err(Error::NonceRace { .. })));
    }

    #[tokio::test]
    async fn rejection_is_reported_as_an_outcome() {
        let outcome = signer(0, DecliningAgent)
            .sign(Address::zero(), U256::zero(), U256::one(), Bytes::from(vec![1]))
            .await
            .unwrap();
        assert_eq!(outcome, SignOutcome::UserRejected);
        assert!(matches!(outcome.into_result(), Err(Error::UserRejected)));
    }

    #[tokio::test]
    async fn deadline_window_is_configurable() {
        let signer = signer(0, wallet()).with_deadline_window(Duration::from_secs(60));
        let before = now_unix();
        let outcome = signer
            .sign(Address::zero(), U256::zero(), U256::one(), Bytes::from(vec![1]))
            .await
            .unwrap();
        let SignOutcome::Signed(signed) = outcome else {
            panic!("expected a signed request");
        };
        assert!(signed.request().deadline >= before + 60);
        assert!(signed.request().deadline < before + 3600);
    }

    #[tokio::test]
    async fn deadline_window_must_land_in_the_future_and_fit_uint48() {
        for window in [
            Duration::ZERO,
            Duration::from_millis(500),
            Duration::from_secs(MAX_DEADLINE),
            Duration::from_secs(u64::MAX),
        ] {
            let signer = signer(0, wallet()).with_deadline_window(window);
            let err = signer
                .sign(Address::zero(), U256::zero(), U256::one(), Bytes::from(vec![1]))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{window:?}: {err:?}");
            assert_eq!(signer.nonce_oracle.calls.load(Ordering::SeqCst), 0);
        }
    }
}
