use crate::{config::Config, error::Error, state::BidderState};
use builder_core::{
    bid_tracker::BidTracker,
    bids_won_store::BidsWonStore,
    clock::Clock,
    pubsub::Subscription,
    scheduler::Scheduler,
    signer::Signer,
    types::{BidWonEntry, BuilderState, ExecutionPayloadBid, PayloadReadyEvent},
    units::{gwei_to_wei, wei_to_eth},
};
use ethereum_consensus::{
    primitives::{Hash32, Root, Slot, Version},
    ssz::prelude::{HashTreeRoot, Node, U256},
};
use parking_lot::RwLock;
use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};
use tokio::sync::watch;
use tracing::{info, warn};
use url::Url;

/// Runs the per-slot ePBS bid loop described in §4.3: wait for the bid window to open, submit
/// strictly-increasing bids until the window closes or a win is observed, then either reveal the
/// full payload or release the slot's balance reservation.
pub struct Bidder {
    config: Config,
    clock: Arc<Clock>,
    scheduler: Arc<Scheduler>,
    genesis_fork_version: Version,
    genesis_validators_root: Root,
    signer: Arc<Signer>,
    bid_tracker: Arc<BidTracker>,
    bids_won_store: Arc<BidsWonStore>,
    builder_state: Arc<RwLock<BuilderState>>,
    http: reqwest::Client,
    beacon_node_url: Url,
}

impl Bidder {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        clock: Arc<Clock>,
        scheduler: Arc<Scheduler>,
        genesis_fork_version: Version,
        genesis_validators_root: Root,
        signer: Arc<Signer>,
        bid_tracker: Arc<BidTracker>,
        bids_won_store: Arc<BidsWonStore>,
        builder_state: Arc<RwLock<BuilderState>>,
        beacon_node_url: Url,
    ) -> Self {
        Self {
            config,
            clock,
            scheduler,
            genesis_fork_version,
            genesis_validators_root,
            signer,
            bid_tracker,
            bids_won_store,
            builder_state,
            http: reqwest::Client::new(),
            beacon_node_url,
        }
    }

    /// Consumes `PayloadReadyEvent`s and keeps at most one slot's bid loop running at a time,
    /// cancelling an in-flight loop the moment a later slot's event arrives.
    pub async fn run(
        self: Arc<Self>,
        mut payload_events: Subscription<PayloadReadyEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut current: Option<(Slot, tokio::task::AbortHandle)> = None;
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        if let Some((_, handle)) = current.take() {
                            handle.abort();
                        }
                        break
                    }
                }
                event = payload_events.recv() => {
                    let Some(event) = event else { break };
                    if !self.scheduler.is_eligible(event.slot) {
                        continue
                    }
                    if let Some((slot, handle)) = &current {
                        if event.slot > *slot {
                            handle.abort();
                            current = None;
                        } else if event.slot < *slot {
                            continue
                        }
                    }
                    let bidder = self.clone();
                    let slot = event.slot;
                    let shutdown_rx = shutdown.clone();
                    let handle = tokio::spawn(async move {
                        let final_state = bidder.run_slot(event, shutdown_rx).await;
                        info!(slot, ?final_state, "bid loop finished");
                    });
                    current = Some((slot, handle.abort_handle()));
                }
            }
        }
    }

    async fn run_slot(
        &self,
        event: PayloadReadyEvent,
        mut shutdown: watch::Receiver<bool>,
    ) -> BidderState {
        let slot = event.slot;
        let slot_start = self.clock.start_of_slot(slot);

        if let Some(wait) = signed_offset_until(slot_start, self.config.bid_start_time_ms) {
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.changed() => return BidderState::Lost,
            }
        }

        let bid_end = offset_instant(slot_start, self.config.bid_end_time_ms);

        let blob_kzg_commitments_root = if event.blobs_bundle.is_empty() {
            Node::default()
        } else {
            match commitments_root(&event) {
                Ok(root) => root,
                Err(err) => return BidderState::Failed(format!("commitments root: {err}")),
            }
        };

        let mut subsidy: u128 = 0;
        let mut value = (event.block_value as u128 + subsidy).max(self.config.bid_min_amount);
        if let Err(err) = self.bid_tracker.reserve(slot, value, value, self.available_balance()) {
            return BidderState::Failed(format!("could not reserve bid balance: {err}"))
        }

        let mut state = BidderState::Bidding;
        loop {
            if SystemTime::now() >= bid_end {
                break
            }

            let bid = ExecutionPayloadBid {
                slot,
                parent_block_hash: event.parent_block_hash.clone(),
                parent_block_root: event.parent_block_root.clone(),
                block_hash: event.block_hash.clone(),
                builder_public_key: self.signer.public_key().clone(),
                value: U256::from(value),
                execution_payment: U256::from(value),
                blob_kzg_commitments_root: blob_kzg_commitments_root.clone(),
            };

            match self.submit_bid(bid) {
                Ok(submission) => {
                    if let Err(err) = tokio::select! {
                        result = submission => result,
                        _ = shutdown.changed() => return self.release_and_return(slot, BidderState::Lost),
                    } {
                        warn!(slot, %err, "bid submission failed, will retry with a larger subsidy");
                        subsidy += self.config.bid_increase;
                        value = (event.block_value as u128 + subsidy).max(self.config.bid_min_amount);
                    }
                }
                Err(err) => return self.release_and_return(slot, BidderState::Failed(err.to_string())),
            }

            match self.check_won(slot).await {
                Ok(true) => {
                    state = BidderState::RevealPending;
                    break
                }
                Ok(false) => {}
                Err(err) => warn!(slot, %err, "could not check win status"),
            }

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(self.config.bid_interval_ms)) => {}
                _ = shutdown.changed() => return self.release_and_return(slot, BidderState::Lost),
            }

            value = (value + self.config.bid_increase).max(self.config.bid_min_amount);
        }

        if !matches!(state, BidderState::RevealPending) {
            return self.release_and_return(slot, BidderState::Lost)
        }

        if let Some(wait) = signed_offset_until(slot_start, self.config.reveal_time_ms) {
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.changed() => return self.release_and_return(slot, BidderState::Lost),
            }
        }

        match self.reveal(&event).await {
            Ok(()) => {
                let value_wei = gwei_to_wei(value);
                let timestamp_ms = SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0);
                self.bids_won_store.insert(BidWonEntry {
                    slot,
                    block_hash: event.block_hash.clone(),
                    num_transactions: event.payload.transactions.len(),
                    num_blobs: event.blobs_bundle.len(),
                    value_eth: wei_to_eth(value_wei),
                    value_wei,
                    timestamp_ms,
                });
                self.bid_tracker.release(slot);
                BidderState::RevealPending
            }
            Err(err) => self.release_and_return(slot, BidderState::Failed(err.to_string())),
        }
    }

    fn release_and_return(&self, slot: Slot, state: BidderState) -> BidderState {
        self.bid_tracker.release(slot);
        state
    }

    fn available_balance(&self) -> u64 {
        let state = self.builder_state.read();
        state.balance
    }

    fn submit_bid(
        &self,
        bid: ExecutionPayloadBid,
    ) -> Result<impl std::future::Future<Output = Result<(), Error>> + '_, Error> {
        let signed = self.signer.sign_execution_payload_bid(
            bid,
            &self.genesis_fork_version,
            &self.genesis_validators_root,
        )?;
        let url = format!("{}eth/v1/beacon/pool/execution_payload_bids", self.beacon_node_url);
        Ok(async move {
            self.http.post(&url).json(&signed).send().await?.error_for_status()?;
            Ok(())
        })
    }

    async fn check_won(&self, slot: Slot) -> Result<bool, Error> {
        let url = format!("{}eth/v1/beacon/builder/won/{}", self.beacon_node_url, slot);
        let response = self.http.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false)
        }
        #[derive(serde::Deserialize)]
        struct Envelope {
            data: bool,
        }
        let envelope: Envelope = response.error_for_status()?.json().await?;
        Ok(envelope.data)
    }

    async fn reveal(&self, event: &PayloadReadyEvent) -> Result<(), Error> {
        let url = format!("{}eth/v1/beacon/pool/execution_payloads", self.beacon_node_url);
        #[derive(serde::Serialize)]
        struct Reveal<'a> {
            payload: &'a builder_core::types::ExecutionPayload,
            blobs_bundle: &'a builder_core::types::BlobsBundle,
        }
        let body = Reveal { payload: &event.payload, blobs_bundle: &event.blobs_bundle };
        let response = self.http.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::RevealRejected(format!("status {status}")))
        }
        Ok(())
    }
}

fn commitments_root(event: &PayloadReadyEvent) -> Result<Node, ethereum_consensus::Error> {
    use ethereum_consensus::{
        deneb::mainnet::MAX_BLOB_COMMITMENTS_PER_BLOCK, ssz::prelude::List,
    };
    let mut commitments: List<_, MAX_BLOB_COMMITMENTS_PER_BLOCK> =
        List::try_from(event.blobs_bundle.commitments.clone())
            .map_err(|e| ethereum_consensus::Error::Merkleization(format!("{e:?}").into()))?;
    commitments.hash_tree_root()
}

/// `slot_start` shifted by a millisecond offset that may be negative (before the slot begins).
fn offset_instant(slot_start: SystemTime, offset_ms: i64) -> SystemTime {
    if offset_ms >= 0 {
        slot_start + Duration::from_millis(offset_ms as u64)
    } else {
        slot_start - Duration::from_millis((-offset_ms) as u64)
    }
}

/// `None` once `slot_start + offset_ms` has already passed (bid windows can open immediately,
/// e.g. `bid_start_time_ms == 0`).
fn signed_offset_until(slot_start: SystemTime, offset_ms: i64) -> Option<Duration> {
    let target = offset_instant(slot_start, offset_ms);
    target.duration_since(SystemTime::now()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_offset_until_future_returns_some() {
        let slot_start = SystemTime::now() + Duration::from_secs(10);
        assert!(signed_offset_until(slot_start, 0).is_some());
    }

    #[test]
    fn test_signed_offset_until_past_returns_none() {
        let slot_start = SystemTime::now();
        assert!(signed_offset_until(slot_start, -5000).is_none());
    }
}
