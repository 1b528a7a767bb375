//! Drives §4.2's build loop: on every `payload_attributes` event for an eligible slot, ask the
//! execution client to start building, wait for it to finish, and publish the result so the
//! bidder and the Builder API server can pick it up.
use builder_core::{
    payload_cache::PayloadCache,
    pubsub::{Publisher, Subscription},
    scheduler::Scheduler,
    types::{PayloadAttributes, PayloadReadyEvent},
};
use ethereum_consensus::primitives::ExecutionAddress;
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{client::EngineClient, error::Error};

/// How long `get_payload` is polled for a given `payload_id` before the build is given up on.
const GET_PAYLOAD_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct Pipeline {
    engine: Arc<EngineClient>,
    scheduler: Arc<Scheduler>,
    cache: Arc<PayloadCache>,
    ready: Publisher<PayloadReadyEvent>,
    fee_recipient: ExecutionAddress,
    payload_build_delay: Duration,
    build_deadline: Duration,
}

impl Pipeline {
    pub fn new(
        engine: Arc<EngineClient>,
        scheduler: Arc<Scheduler>,
        cache: Arc<PayloadCache>,
        fee_recipient: ExecutionAddress,
        payload_build_delay: Duration,
        build_deadline: Duration,
    ) -> Self {
        Self {
            engine,
            scheduler,
            cache,
            ready: Publisher::new(),
            fee_recipient,
            payload_build_delay,
            build_deadline,
        }
    }

    pub fn subscribe(&self) -> Subscription<PayloadReadyEvent> {
        self.ready.subscribe()
    }

    /// Consumes `payload_attributes` events and spawns one build task per eligible slot. A build
    /// for an earlier slot is left to run to completion even if a later slot's attributes arrive
    /// first -- unlike the bidder, an in-flight EL build isn't cheap to cancel and a stale result
    /// is simply never looked up by slot-keyed consumers.
    pub async fn run(
        self: Arc<Self>,
        mut attributes: Subscription<PayloadAttributes>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break
                    }
                }
                event = attributes.recv() => {
                    let Some(event) = event else { break };
                    if !self.scheduler.is_eligible(event.slot) {
                        continue
                    }
                    let pipeline = self.clone();
                    tokio::spawn(async move { pipeline.build(event).await });
                }
            }
        }
    }

    async fn build(&self, attributes: PayloadAttributes) {
        let slot = attributes.slot;
        tokio::time::sleep(self.payload_build_delay).await;

        let mut attributes = attributes;
        attributes.fee_recipient = self.fee_recipient.clone();

        let payload_id = match self
            .engine
            .forkchoice_updated(&attributes.parent_block_hash, Some(&attributes), self.build_deadline)
            .await
        {
            Ok(Some(payload_id)) => payload_id,
            Ok(None) => {
                warn!(slot, "execution client declined to start a build");
                return
            }
            Err(err) => {
                warn!(slot, %err, "forkchoice update with attributes failed");
                return
            }
        };

        let deadline = tokio::time::Instant::now() + self.build_deadline;
        loop {
            match self.engine.get_payload(&payload_id, self.build_deadline).await {
                Ok((payload, blobs_bundle, block_value_wei, execution_requests)) => {
                    let event = PayloadReadyEvent {
                        slot,
                        block_hash: payload.block_hash.clone(),
                        parent_block_hash: attributes.parent_block_hash.clone(),
                        parent_block_root: attributes.parent_block_root.clone(),
                        prev_randao: attributes.prev_randao.clone(),
                        fee_recipient: attributes.fee_recipient.clone(),
                        gas_limit: payload.gas_limit,
                        payload,
                        blobs_bundle,
                        execution_requests: Some(execution_requests).filter(|r| !r.is_empty()),
                        block_value: (block_value_wei / 1_000_000_000) as u64,
                    };
                    info!(slot, block_hash = %event.block_hash, "payload ready");
                    self.cache.insert(event.clone());
                    self.ready.publish(event);
                    return
                }
                Err(Error::PayloadNotReady(_)) => {
                    if tokio::time::Instant::now() >= deadline {
                        warn!(slot, %payload_id, "gave up waiting for payload to become ready");
                        return
                    }
                    tokio::time::sleep(GET_PAYLOAD_POLL_INTERVAL).await;
                }
                Err(err) => {
                    warn!(slot, %err, "get_payload failed");
                    return
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use builder_core::scheduler::{Config as SchedulerConfig, ScheduleMode};

    #[test]
    fn test_scheduler_gates_ineligible_slots() {
        let scheduler =
            Scheduler::new(SchedulerConfig { mode: ScheduleMode::EveryNth, every_nth: Some(2), ..Default::default() });
        assert!(scheduler.is_eligible(10));
        assert!(!scheduler.is_eligible(11));
    }
}
