use crate::config::Config;
use builder_api::{AppState, Server as ApiServer};
use builder_core::{
    bid_tracker::BidTracker, bids_won_store::BidsWonStore, clock::Clock,
    payload_cache::PayloadCache, scheduler::Scheduler, signer::Signer, types::BuilderState,
    wallet::Wallet,
};
use builder_engine::{ChainService, EngineClient, JwtSecret, Pipeline};
use builder_lifecycle::LifecycleManager;
use epbs_bidder::Bidder;
use ethereum_consensus::{crypto::SecretKey, state_transition::Context};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use url::Url;

fn parse_secret_key(hex_str: &str) -> eyre::Result<SecretKey> {
    let bytes = hex::decode(hex_str.strip_prefix("0x").unwrap_or(hex_str))?;
    SecretKey::try_from(bytes.as_slice()).map_err(|e| eyre::eyre!("invalid secret key: {e:?}"))
}

fn parse_local_wallet(hex_str: &str) -> eyre::Result<ethers::signers::LocalWallet> {
    use eyre::WrapErr;
    hex_str.parse::<ethers::signers::LocalWallet>().wrap_err("invalid wallet private key")
}

/// Wires the five core components (clock/scheduler are pure values, not tasks) and every
/// supporting service together, then spawns one task per long-running loop. Mirrors the
/// teacher's `Service::run` -- collect tasks, `join_all` them -- but threads a shared shutdown
/// signal through every task instead of relying on the tasks to exit on their own.
pub struct Daemon {
    config: Config,
}

impl Daemon {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(self) -> eyre::Result<()> {
        let config = self.config;
        let context = Arc::new(Context::try_from(&config.network)?);
        let chain_spec = Arc::new(config.chain_spec);
        let clock = Arc::new(Clock::new(
            chain_spec.genesis_time,
            chain_spec.seconds_per_slot,
            chain_spec.slots_per_epoch,
        ));
        let scheduler = Arc::new(Scheduler::new(config.schedule));

        let signing_key = parse_secret_key(&config.builder_privkey)?;
        let signer = Arc::new(Signer::new(signing_key));
        info!(public_key = %signer.public_key(), "builder identity loaded");

        let beacon_node_url: Url = config.cl_client.parse()?;
        let chain_service = Arc::new(ChainService::new(beacon_node_url.clone(), context.clone()));

        let jwt = JwtSecret::from_file(&config.el_jwt_secret)?;
        let engine_client = Arc::new(EngineClient::new(config.el_engine_api.clone(), jwt));

        let payload_cache = Arc::new(PayloadCache::new());
        let bid_tracker = Arc::new(BidTracker::new());
        let bids_won_store =
            Arc::new(BidsWonStore::new(config.bids_won_store_capacity.unwrap_or(
                builder_core::bids_won_store::DEFAULT_CAPACITY,
            )));
        let builder_state = Arc::new(RwLock::new(BuilderState::new(signer.public_key().clone())));

        let pipeline = Arc::new(Pipeline::new(
            engine_client.clone(),
            scheduler.clone(),
            payload_cache.clone(),
            config.fee_recipient.clone(),
            std::time::Duration::from_millis(config.payload_build_delay_ms),
            std::time::Duration::from_millis(config.build_deadline_ms),
        ));

        let bidder = Arc::new(Bidder::new(
            config.epbs,
            clock.clone(),
            scheduler.clone(),
            chain_spec.genesis_fork_version.clone(),
            chain_spec.genesis_validators_root.clone(),
            signer.clone(),
            bid_tracker.clone(),
            bids_won_store.clone(),
            builder_state.clone(),
            beacon_node_url.clone(),
        ));

        let api_state = AppState {
            config: Arc::new(config.builder_api),
            payload_cache: payload_cache.clone(),
            bids_won_store: bids_won_store.clone(),
            validator_store: Arc::new(builder_api::ValidatorStore::new()),
            signer: signer.clone(),
            context: context.clone(),
            genesis_fork_version: chain_spec.genesis_fork_version.clone(),
            genesis_validators_root: chain_spec.genesis_validators_root.clone(),
        };
        let api_server = ApiServer::new(api_state);

        let lifecycle_manager = if let Some(lifecycle_config) = config.lifecycle {
            let wallet_signer = parse_local_wallet(&config.wallet_privkey)?;
            let wallet = Arc::new(Wallet::new(&config.el_rpc, wallet_signer).await?);
            Some(Arc::new(LifecycleManager::new(
                lifecycle_config,
                clock.clone(),
                chain_spec.clone(),
                chain_service.clone(),
                wallet,
                signer.clone(),
                bid_tracker.clone(),
                builder_state.clone(),
            )))
        } else {
            None
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut tasks = Vec::new();

        {
            let chain_service = chain_service.clone();
            tasks.push(tokio::spawn(async move { chain_service.stream_head_events().await }));
        }
        {
            let chain_service = chain_service.clone();
            tasks.push(tokio::spawn(
                async move { chain_service.stream_payload_attributes_events().await },
            ));
        }
        {
            let pipeline = pipeline.clone();
            let attributes = chain_service.subscribe_payload_attributes();
            let shutdown_rx = shutdown_rx.clone();
            tasks.push(tokio::spawn(async move { pipeline.run(attributes, shutdown_rx).await }));
        }
        {
            let bidder = bidder.clone();
            let ready = pipeline.subscribe();
            let shutdown_rx = shutdown_rx.clone();
            tasks.push(tokio::spawn(async move { bidder.run(ready, shutdown_rx).await }));
        }
        api_server.spawn();
        if let Some(manager) = lifecycle_manager.clone() {
            let shutdown_rx = shutdown_rx.clone();
            tasks.push(tokio::spawn(async move { manager.run(shutdown_rx).await }));
        }

        tokio::signal::ctrl_c().await.ok();
        info!("shutdown signal received, stopping...");
        let _ = shutdown_tx.send(true);

        for task in tasks {
            let _ = task.await;
        }

        Ok(())
    }
}
