use crate::{config::Config, error::Error};
use builder_core::{
    bid_tracker::BidTracker, chain_spec::ChainSpec, clock::Clock, signer::Signer,
    types::BuilderState, wallet::Wallet,
};
use builder_engine::ChainService;
use ethereum_consensus::{
    phase0::{DepositMessage, VoluntaryExit},
    primitives::Epoch,
    ssz::prelude::{Bytes32, HashTreeRoot},
};
use ethers::types::{Bytes, U256 as EthersU256};
use parking_lot::RwLock;
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Withdrawal credentials prefix for builder deposits (§4.5): `0x03 || 11 zero bytes || address`.
const BUILDER_WITHDRAWAL_PREFIX: u8 = 0x03;

/// Drives the fork-gate, registration, wait-for-registration, and balance-monitor phases
/// described in §4.5. Owns the single writer lock on `BuilderState`; every other component only
/// ever reads a snapshot of it.
pub struct LifecycleManager {
    config: Config,
    clock: Arc<Clock>,
    chain_spec: Arc<ChainSpec>,
    chain_service: Arc<ChainService>,
    wallet: Arc<Wallet>,
    signer: Arc<Signer>,
    bid_tracker: Arc<BidTracker>,
    builder_state: Arc<RwLock<BuilderState>>,
}

impl LifecycleManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        clock: Arc<Clock>,
        chain_spec: Arc<ChainSpec>,
        chain_service: Arc<ChainService>,
        wallet: Arc<Wallet>,
        signer: Arc<Signer>,
        bid_tracker: Arc<BidTracker>,
        builder_state: Arc<RwLock<BuilderState>>,
    ) -> Self {
        Self { config, clock, chain_spec, chain_service, wallet, signer, bid_tracker, builder_state }
    }

    pub fn builder_state(&self) -> Arc<RwLock<BuilderState>> {
        self.builder_state.clone()
    }

    /// Runs the fork gate, registration, wait-for-registration, then the balance monitor loop
    /// until shutdown. Exits early (without running the balance monitor) if registration fails
    /// non-retriably.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if !self.wait_for_fork_gate(&mut shutdown).await {
            return
        }

        if self.chain_service.get_builder_registration(self.signer.public_key()).await.ok().flatten().is_none() {
            if let Err(err) = self.register(&mut shutdown).await {
                error!(%err, "builder registration failed, stopping lifecycle manager");
                return
            }
        }

        if !self.wait_for_registration(&mut shutdown).await {
            return
        }

        self.run_balance_monitor(shutdown).await;
    }

    /// Blocks until the current epoch has activated Gloas, polling once per epoch. Returns
    /// `false` if shutdown fires first.
    async fn wait_for_fork_gate(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        loop {
            let epoch = self.clock.current_epoch();
            if self.chain_spec.is_gloas_at_epoch(epoch) {
                info!(epoch, "gloas fork is active");
                return true
            }
            info!(epoch, "waiting for gloas fork activation");
            tokio::select! {
                _ = tokio::time::sleep(self.clock_tick()) => {}
                _ = shutdown.changed() => return false,
            }
        }
    }

    fn clock_tick(&self) -> Duration {
        Duration::from_secs(self.chain_spec.seconds_per_slot)
    }

    /// Builds, signs, and submits a deposit transaction, retrying every
    /// `registration_retry_secs` on retriable failures until shutdown fires.
    async fn register(&self, shutdown: &mut watch::Receiver<bool>) -> Result<(), Error> {
        loop {
            match self.submit_deposit().await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(%err, "deposit submission failed, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(self.config.registration_retry_secs)) => {}
                        _ = shutdown.changed() => return Err(err),
                    }
                }
            }
        }
    }

    async fn submit_deposit(&self) -> Result<(), Error> {
        self.deposit(self.config.deposit_amount_gwei).await
    }

    /// Shared by initial registration and balance top-ups: both submit the same `deposit()` call
    /// against the deposit contract, just with a different amount.
    async fn deposit(&self, amount_gwei: u64) -> Result<(), Error> {
        let withdrawal_credentials = builder_withdrawal_credentials(self.wallet.address());

        let mut message = DepositMessage {
            public_key: self.signer.public_key().clone(),
            withdrawal_credentials: withdrawal_credentials.clone(),
            amount: amount_gwei,
        };
        let signature = self
            .signer
            .sign_deposit_message(message.clone(), &self.chain_spec.genesis_fork_version)?;

        let deposit_data_root = deposit_data_root(&mut message, &signature)?;

        let calldata = encode_deposit_call(
            self.signer.public_key().as_ref(),
            withdrawal_credentials.as_ref(),
            signature.as_ref(),
            deposit_data_root.as_ref(),
        );

        let amount_wei = EthersU256::from(amount_gwei) * EthersU256::from(1_000_000_000u64);
        let to = ethers::types::Address::from_slice(self.chain_spec.deposit_contract_address.as_ref());
        let hash = self
            .wallet
            .build_and_send(to, amount_wei, Bytes::from(calldata), self.config.deposit_gas_limit.into())
            .await?;

        let receipt = self
            .wallet
            .await_receipt(hash, Duration::from_secs(self.config.receipt_timeout_secs))
            .await?;
        info!(?hash, block = ?receipt.block_number, "deposit confirmed");
        Ok(())
    }

    /// Polls once per slot until the builder's registration appears with a nonzero index.
    async fn wait_for_registration(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        loop {
            self.chain_service.invalidate_builder_cache(self.signer.public_key());
            match self.chain_service.get_builder_registration(self.signer.public_key()).await {
                Ok(Some(registration)) if registration.index != 0 => {
                    let epoch = self.clock.current_epoch();
                    let mut state = self.builder_state.write();
                    state.mark_registered(registration.index, epoch as Epoch);
                    state.balance = registration.balance;
                    info!(index = registration.index, "builder registration observed on chain");
                    return true
                }
                Ok(_) => {}
                Err(err) => warn!(%err, "could not poll builder registration"),
            }
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(self.chain_spec.seconds_per_slot)) => {}
                _ = shutdown.changed() => return false,
            }
        }
    }

    /// Every `balance_monitor_interval_secs`, tops up the deposit if `effective_balance` (on-chain
    /// balance minus pending bid reservations) drops below `topup_threshold_gwei`.
    async fn run_balance_monitor(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(self.config.balance_monitor_interval_secs)) => {}
                _ = shutdown.changed() => return,
            }

            self.chain_service.invalidate_builder_cache(self.signer.public_key());
            let registration = match self.chain_service.get_builder_registration(self.signer.public_key()).await {
                Ok(Some(registration)) => registration,
                Ok(None) => continue,
                Err(err) => {
                    warn!(%err, "could not refresh builder balance");
                    continue
                }
            };
            self.builder_state.write().balance = registration.balance;

            let pending = self.bid_tracker.pending_payments();
            let effective_balance = registration.balance.saturating_sub(pending.min(u64::MAX as u128) as u64);
            if effective_balance < self.config.topup_threshold_gwei {
                let amount = self.config.topup_amount_gwei.max(self.config.topup_threshold_gwei);
                info!(effective_balance, amount, "topping up builder balance");
                if let Err(err) = self.deposit(amount).await {
                    error!(%err, "top-up deposit failed");
                }
            }
        }
    }

    /// Signs and submits a voluntary exit for this builder's validator index (operator-initiated,
    /// not part of the automatic supervised loop).
    pub async fn voluntary_exit(&self, current_epoch: Epoch) -> Result<(), Error> {
        let index = self.builder_state.read().index;
        let exit = VoluntaryExit { epoch: current_epoch, validator_index: index };
        let signature = self.signer.sign_voluntary_exit(
            exit.clone(),
            &self.chain_spec.genesis_fork_version,
            &self.chain_spec.genesis_validators_root,
        )?;
        let signed = ethereum_consensus::phase0::SignedVoluntaryExit { message: exit, signature };
        self.chain_service.submit_voluntary_exit(&signed).await?;
        self.builder_state.write().mark_exited(current_epoch);
        Ok(())
    }
}

fn builder_withdrawal_credentials(address: ethers::types::Address) -> Bytes32 {
    let mut bytes = [0u8; 32];
    bytes[0] = BUILDER_WITHDRAWAL_PREFIX;
    bytes[12..].copy_from_slice(address.as_bytes());
    Bytes32::try_from(bytes.to_vec()).expect("32 bytes fits Bytes32")
}

fn deposit_data_root(
    message: &mut DepositMessage,
    signature: &ethereum_consensus::primitives::BlsSignature,
) -> Result<ethereum_consensus::ssz::prelude::Node, Error> {
    let mut deposit_data = ethereum_consensus::phase0::DepositData {
        public_key: message.public_key.clone(),
        withdrawal_credentials: message.withdrawal_credentials.clone(),
        amount: message.amount,
        signature: signature.clone(),
    };
    deposit_data.hash_tree_root().map_err(|e| Error::Consensus(e.into()))
}

/// ABI-encodes `deposit(bytes,bytes,bytes,bytes32)`: selector, then the four head words (each
/// argument's byte offset), then each `bytes` argument length-prefixed and right-padded to a
/// 32-byte boundary.
fn encode_deposit_call(pubkey: &[u8], withdrawal_credentials: &[u8], signature: &[u8], root: &[u8]) -> Vec<u8> {
    use ethers::abi::{Function, Param, ParamType, StateMutability, Token};

    #[allow(deprecated)]
    let function = Function {
        name: "deposit".to_string(),
        inputs: vec![
            Param { name: "pubkey".to_string(), kind: ParamType::Bytes, internal_type: None },
            Param {
                name: "withdrawal_credentials".to_string(),
                kind: ParamType::Bytes,
                internal_type: None,
            },
            Param { name: "signature".to_string(), kind: ParamType::Bytes, internal_type: None },
            Param {
                name: "deposit_data_root".to_string(),
                kind: ParamType::FixedBytes(32),
                internal_type: None,
            },
        ],
        outputs: vec![],
        constant: None,
        state_mutability: StateMutability::Payable,
    };

    let mut root_bytes = [0u8; 32];
    root_bytes.copy_from_slice(root);

    function
        .encode_input(&[
            Token::Bytes(pubkey.to_vec()),
            Token::Bytes(withdrawal_credentials.to_vec()),
            Token::Bytes(signature.to_vec()),
            Token::FixedBytes(root_bytes.to_vec()),
        ])
        .expect("deposit call args match the deposit contract ABI")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_withdrawal_credentials_carries_0x03_prefix_and_address() {
        let address = ethers::types::Address::from_low_u64_be(0xdead_beef);
        let credentials = builder_withdrawal_credentials(address);
        let bytes: &[u8] = credentials.as_ref();
        assert_eq!(bytes[0], 0x03);
        assert!(bytes[1..12].iter().all(|b| *b == 0));
        assert_eq!(&bytes[12..], address.as_bytes());
    }

    #[test]
    fn test_encode_deposit_call_starts_with_function_selector() {
        let calldata = encode_deposit_call(&[1u8; 48], &[2u8; 32], &[3u8; 96], &[4u8; 32]);
        assert_eq!(calldata.len() % 32, 4);
        assert!(calldata.len() > 4);
    }
}
