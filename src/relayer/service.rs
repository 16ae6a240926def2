use std::sync::Arc;

use dashmap::DashMap;
use ethers::types::{Address, U256};
use log::{error, info, warn};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::forwarder::{
    ExecutionFailure, ForwardRequestData, ForwarderDomain, ForwarderRevert,
    SerializedForwardRequest,
};
use crate::helpers::now_unix;
use crate::prelude::*;
use crate::relayer::api::{HealthResponse, RelayResponse};
use crate::relayer::chain::{ChainError, ForwarderChain};
use crate::relayer::ReceiptSummary;

impl From<ChainError> for Error {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Transport(message) => Error::Network(message),
            ChainError::Reverted {
                data,
                message,
                transaction_hash,
            } => Error::ExecutionReverted(ExecutionFailure {
                revert: data.as_deref().and_then(ForwarderRevert::decode),
                message,
                transaction_hash,
            }),
            ChainError::Timeout(hash) => Error::Unconfirmed {
                hash,
                reason: "timed out waiting for the receipt".to_string(),
            },
            ChainError::Dropped(hash) => Error::Unconfirmed {
                hash,
                reason: "dropped from the mempool".to_string(),
            },
        }
    }
}

type SenderLocks = DashMap<Address, Arc<Mutex<()>>>;

/// Holds one sender's lock. Dropping it releases the lock and removes the
/// sender's entry once nobody else holds or waits on it.
struct SenderSlot<'a> {
    locks: &'a SenderLocks,
    from: Address,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<'a> SenderSlot<'a> {
    async fn acquire(locks: &'a SenderLocks, from: Address) -> SenderSlot<'a> {
        let lock = locks
            .entry(from)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        let mut slot = SenderSlot {
            locks,
            from,
            guard: None,
        };
        slot.guard = Some(lock.lock_owned().await);
        slot
    }
}

impl Drop for SenderSlot<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.from, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Validates and executes relayed requests.
///
/// Requests from different senders run in parallel. Requests from the same
/// sender are serialized, so the later one observes the nonce consumed by the
/// earlier one and fails the forwarder's signature check instead of racing it.
pub struct RelayerService<C> {
    chain: C,
    social_core_address: Address,
    domain: ForwarderDomain,
    sender_locks: SenderLocks,
}

impl<C: ForwarderChain> RelayerService<C> {
    pub fn new(chain: C, social_core_address: Address, domain: ForwarderDomain) -> Self {
        RelayerService {
            chain,
            social_core_address,
            domain,
            sender_locks: DashMap::new(),
        }
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "ok".to_string(),
            message: "Relayer is running".to_string(),
            relayer_address: self.chain.relayer_address(),
            forwarder_address: self.chain.forwarder_address(),
            social_core_address: self.social_core_address,
            chain_id: self.domain.chain_id,
        }
    }

    /// Always a fresh read from the forwarder.
    pub async fn nonce(&self, owner: Address) -> Result<U256> {
        let nonce = self.chain.nonces(owner).await?;
        info!("Nonce requested for {owner:?}: {nonce}");
        Ok(nonce)
    }

    pub async fn relay(
        &self,
        request_id: &str,
        serialized: SerializedForwardRequest,
    ) -> Result<RelayResponse> {
        let (request, claimed_nonce) = serialized.into_request_data()?;
        info!(
            "[{request_id}] Received meta-transaction from {:?} to {:?}: value {}, gas {}, deadline {}, {} data bytes",
            request.from,
            request.to,
            request.value,
            request.gas,
            request.deadline,
            request.data.len()
        );

        let _slot = SenderSlot::acquire(&self.sender_locks, request.from).await;

        self.log_nonce_diagnostics(request_id, &request, claimed_nonce)
            .await;

        let forwarder = self.chain.forwarder_address();
        let trusted = self
            .chain
            .is_trusted_forwarder(request.to, forwarder)
            .await?;
        if !trusted {
            warn!("[{request_id}] {:?} does not trust forwarder {forwarder:?}", request.to);
            return Err(Error::UntrustedForwarder {
                target: request.to,
                forwarder,
            });
        }

        let now = now_unix();
        if request.deadline < now {
            warn!("[{request_id}] Request expired at {} (now {now})", request.deadline);
            return Err(Error::ExpiredRequest {
                deadline: request.deadline,
                now,
            });
        }

        let receipt = self.chain.execute(&request).await.map_err(|err| {
            let err = Error::from(err);
            error!("[{request_id}] Error relaying transaction: {err}");
            err
        })?;
        info!(
            "[{request_id}] Meta-transaction executed: {:?}",
            receipt.transaction_hash
        );

        Ok(RelayResponse {
            success: true,
            hash: receipt.transaction_hash,
            receipt: ReceiptSummary::from(&receipt),
        })
    }

    /// Senders with a relay in flight.
    pub fn active_senders(&self) -> usize {
        self.sender_locks.len()
    }

    /// Nonce enforcement is the forwarder's job; this only explains in the
    /// logs why a request is about to fail.
    async fn log_nonce_diagnostics(
        &self,
        request_id: &str,
        request: &ForwardRequestData,
        claimed_nonce: Option<U256>,
    ) {
        let current = match self.chain.nonces(request.from).await {
            Ok(nonce) => nonce,
            Err(err) => {
                warn!("[{request_id}] Could not fetch nonce: {err}");
                return;
            }
        };
        info!("[{request_id}] Current nonce for {:?}: {current}", request.from);

        if let Some(claimed) = claimed_nonce.filter(|claimed| *claimed != current) {
            warn!("[{request_id}] Request was signed with nonce {claimed}, forwarder expects {current}");
        }
        let recovered = request
            .parsed_signature()
            .and_then(|sig| request.with_nonce(current).recover_signer(&self.domain, &sig));
        if recovered != Some(request.from) {
            warn!(
                "[{request_id}] Signature recovers to {recovered:?} under nonce {current}, not {:?}; the forwarder will reject it",
                request.from
            );
        }
    }
}
