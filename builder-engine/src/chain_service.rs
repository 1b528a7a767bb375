use crate::error::Error;
use beacon_api_client::mainnet::Client as BeaconApiClient;
use builder_core::{pubsub::Publisher, types::PayloadAttributes};
use ethereum_consensus::{
    networks::typical_genesis_time, primitives::BlsPublicKey, state_transition::Context,
};
use futures_util::StreamExt;
use parking_lot::RwLock;
use reqwest_eventsource::{Event, EventSource};
use serde::Deserialize;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct HeadEvent {
    pub slot: String,
    pub block: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuilderRegistration {
    pub index: u64,
    pub balance: u64,
}

/// `/eth/v1/events?topics=payload_attributes` envelope, per the stable beacon API event stream.
#[derive(Debug, Clone, Deserialize)]
struct PayloadAttributesWire {
    data: PayloadAttributesDataWire,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
struct PayloadAttributesDataWire {
    proposal_slot: String,
    proposer_index: String,
    parent_block_root: String,
    parent_block_hash: String,
    payload_attributes: InnerPayloadAttributesWire,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
struct InnerPayloadAttributesWire {
    timestamp: String,
    prev_randao: String,
    suggested_fee_recipient: String,
    parent_beacon_block_root: String,
}

impl TryFrom<PayloadAttributesWire> for PayloadAttributes {
    type Error = crate::wire::ConvertError;

    fn try_from(wire: PayloadAttributesWire) -> Result<Self, Self::Error> {
        use crate::wire::{fixed_bytes, quantity_from_hex_or_decimal, ConvertError};

        let bad_length = || ConvertError::Merkleization("wrong fixed-byte length".into());
        let data = wire.data;
        let inner = data.payload_attributes;
        Ok(PayloadAttributes {
            slot: quantity_from_hex_or_decimal(&data.proposal_slot)?,
            parent_block_hash: fixed_bytes::<32>(&data.parent_block_hash)?
                .as_ref()
                .try_into()
                .map_err(|_| bad_length())?,
            parent_block_root: fixed_bytes::<32>(&data.parent_block_root)?
                .as_ref()
                .try_into()
                .map_err(|_| bad_length())?,
            proposer_index: quantity_from_hex_or_decimal(&data.proposer_index)?,
            fee_recipient: fixed_bytes::<20>(&inner.suggested_fee_recipient)?
                .as_ref()
                .try_into()
                .map_err(|_| bad_length())?,
            prev_randao: fixed_bytes::<32>(&inner.prev_randao)?
                .as_ref()
                .try_into()
                .map_err(|_| bad_length())?,
            timestamp: quantity_from_hex_or_decimal(&inner.timestamp)?,
            withdrawals: Vec::new(),
            parent_beacon_block_root: fixed_bytes::<32>(&inner.parent_beacon_block_root)?
                .as_ref()
                .try_into()
                .map_err(|_| bad_length())?,
        })
    }
}

/// Wraps the pinned `beacon_api_client` for the endpoints it already knows about (genesis,
/// validators, proposer duties) and goes straight to `reqwest` for everything ePBS-specific that
/// a pre-Gloas client library has no types for (builder registry lookups, execution payload bid
/// submission, the SSE event stream). Head and payload-attributes events are republished on
/// broadcast channels so multiple components (the bidder, the lifecycle manager) can each keep
/// their own pace without contending on a single receiver.
pub struct ChainService {
    api: BeaconApiClient,
    http: reqwest::Client,
    beacon_node_url: Url,
    context: Arc<Context>,
    head: Publisher<HeadEvent>,
    payload_attributes: Publisher<PayloadAttributes>,
    builder_cache: RwLock<HashMap<BlsPublicKey, BuilderRegistration>>,
}

impl ChainService {
    pub fn new(beacon_node_url: Url, context: Arc<Context>) -> Self {
        let api = BeaconApiClient::new(beacon_node_url.clone());
        Self {
            api,
            http: reqwest::Client::new(),
            beacon_node_url,
            context,
            head: Publisher::new(),
            payload_attributes: Publisher::new(),
            builder_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Mirrors the teacher's fallback chain: trust the hardcoded network context first, then
    /// ask the beacon node, then fall back to a best guess so a dev-net without genesis
    /// metadata doesn't block startup entirely.
    pub async fn genesis_time(&self) -> u64 {
        if let Ok(genesis_time) = self.context.genesis_time() {
            return genesis_time
        }
        if let Ok(details) = self.api.get_genesis_details().await {
            return details.genesis_time
        }
        warn!("could not get genesis time from context or beacon node; using best guess");
        typical_genesis_time(&self.context)
    }

    pub fn subscribe_head(&self) -> builder_core::pubsub::Subscription<HeadEvent> {
        self.head.subscribe()
    }

    pub fn subscribe_payload_attributes(
        &self,
    ) -> builder_core::pubsub::Subscription<PayloadAttributes> {
        self.payload_attributes.subscribe()
    }

    /// Runs until the underlying SSE connection is closed or errors out; the caller is expected
    /// to run this in its own task and restart it on return.
    pub async fn stream_head_events(&self) {
        let url = format!("{}eth/v1/events?topics=head", self.beacon_node_url);
        let mut source = match self.http.get(&url).eventsource() {
            Ok(source) => source,
            Err(err) => {
                warn!(%err, "could not open head event stream");
                return
            }
        };
        while let Some(event) = source.next().await {
            match event {
                Ok(Event::Message(message)) => match serde_json::from_str::<HeadEvent>(&message.data) {
                    Ok(event) => {
                        self.head.publish(event);
                    }
                    Err(err) => warn!(%err, "could not parse head event"),
                },
                Ok(Event::Open) => debug!("head event stream opened"),
                Err(err) => {
                    warn!(%err, "head event stream error");
                    break
                }
            }
        }
    }

    /// Runs until the underlying SSE connection is closed or errors out; the caller is expected
    /// to run this in its own task and restart it on return.
    pub async fn stream_payload_attributes_events(&self) {
        let url = format!("{}eth/v1/events?topics=payload_attributes", self.beacon_node_url);
        let mut source = match self.http.get(&url).eventsource() {
            Ok(source) => source,
            Err(err) => {
                warn!(%err, "could not open payload attributes event stream");
                return
            }
        };
        while let Some(event) = source.next().await {
            match event {
                Ok(Event::Message(message)) => {
                    match serde_json::from_str::<PayloadAttributesWire>(&message.data) {
                        Ok(wire) => match PayloadAttributes::try_from(wire) {
                            Ok(attributes) => {
                                self.payload_attributes.publish(attributes);
                            }
                            Err(err) => warn!(%err, "could not convert payload attributes event"),
                        },
                        Err(err) => warn!(%err, "could not parse payload attributes event"),
                    }
                }
                Ok(Event::Open) => debug!("payload attributes event stream opened"),
                Err(err) => {
                    warn!(%err, "payload attributes event stream error");
                    break
                }
            }
        }
    }

    /// No ePBS-specific endpoint is defined for this in the stable beacon API yet; we treat a
    /// builder registry entry as an opaque JSON object under `/eth/v1/beacon/builder/{pubkey}`
    /// and only read the two fields the lifecycle manager needs.
    pub async fn get_builder_registration(
        &self,
        pubkey: &BlsPublicKey,
    ) -> Result<Option<BuilderRegistration>, Error> {
        if let Some(cached) = self.builder_cache.read().get(pubkey).cloned() {
            return Ok(Some(cached))
        }
        let url = format!("{}eth/v1/beacon/builder/{}", self.beacon_node_url, pubkey);
        let response = self.http.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None)
        }
        let response = response.error_for_status()?;
        #[derive(Deserialize)]
        struct Envelope {
            data: BuilderRegistration,
        }
        let envelope: Envelope = response.json().await?;
        self.builder_cache.write().insert(pubkey.clone(), envelope.data.clone());
        Ok(Some(envelope.data))
    }

    pub fn invalidate_builder_cache(&self, pubkey: &BlsPublicKey) {
        self.builder_cache.write().remove(pubkey);
    }

    pub async fn submit_voluntary_exit(
        &self,
        exit: &ethereum_consensus::phase0::SignedVoluntaryExit,
    ) -> Result<(), Error> {
        let url = format!("{}eth/v1/beacon/pool/voluntary_exits", self.beacon_node_url);
        self.http.post(&url).json(exit).send().await?.error_for_status()?;
        Ok(())
    }

    pub fn context(&self) -> &Context {
        &self.context
    }
}

trait EventSourceExt {
    fn eventsource(self) -> Result<EventSource, reqwest_eventsource::CannotCloneRequestError>;
}

impl EventSourceExt for reqwest::RequestBuilder {
    fn eventsource(self) -> Result<EventSource, reqwest_eventsource::CannotCloneRequestError> {
        EventSource::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_registration_deserializes_from_json() {
        let json = r#"{"index": 7, "balance": 32000000000}"#;
        let registration: BuilderRegistration = serde_json::from_str(json).unwrap();
        assert_eq!(registration.index, 7);
        assert_eq!(registration.balance, 32_000_000_000);
    }
}
