use crate::{
    error::Error,
    jwt::JwtSecret,
    wire::{self, GetPayloadResponseWire},
};
use backoff::{future::retry, ExponentialBackoff};
use builder_core::types::{BlobsBundle, ExecutionPayload, PayloadAttributes};
use ethereum_consensus::primitives::Hash32;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{sync::atomic::{AtomicI64, Ordering}, time::Duration};
use tracing::{debug, warn};

const FORKCHOICE_UPDATED_METHOD: &str = "engine_forkchoiceUpdatedV3";
const GET_PAYLOAD_METHOD: &str = "engine_getPayloadV4";

#[derive(Debug, Serialize)]
struct ForkchoiceState {
    head_block_hash: String,
    safe_block_hash: String,
    finalized_block_hash: String,
}

#[derive(Debug, Deserialize)]
struct PayloadStatus {
    #[allow(dead_code)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct ForkchoiceUpdatedResult {
    #[allow(dead_code)]
    payload_status: PayloadStatus,
    payload_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// Speaks the authenticated Engine API JSON-RPC surface: `forkchoiceUpdated` to hand the
/// execution client new attributes, `getPayload` to collect the built block once it's ready.
/// Every call is retried with exponential backoff, bounded by the caller-supplied deadline —
/// the pipeline in `epbs-bidder` decides how much of a slot's budget a given call gets.
pub struct EngineClient {
    http: reqwest::Client,
    endpoint: String,
    jwt: JwtSecret,
    rpc_id: AtomicI64,
}

impl EngineClient {
    pub fn new(endpoint: impl Into<String>, jwt: JwtSecret) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            jwt,
            rpc_id: AtomicI64::new(0),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, Error> {
        let token = self.jwt.bearer_token()?;
        let id = self.rpc_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let parsed: JsonRpcResponse<Value> = response.json().await?;
        if let Some(err) = parsed.error {
            return Err(Error::Rpc { code: err.code, message: err.message })
        }
        parsed.result.ok_or_else(|| Error::Rpc { code: 0, message: "empty result".into() })
    }

    async fn call_with_retry(&self, method: &str, params: Value, deadline: Duration) -> Result<Value, Error> {
        let policy = ExponentialBackoff { max_elapsed_time: Some(deadline), ..Default::default() };
        retry(policy, || async {
            self.call(method, params.clone()).await.map_err(|err| {
                warn!(%method, %err, "engine API call failed, retrying");
                backoff::Error::transient(err)
            })
        })
        .await
    }

    /// `engine_forkchoiceUpdatedV3`. Returns the `payload_id` the execution client assigned to
    /// the build job, or `None` if it declined to start one (no attributes supplied, or it's
    /// still syncing).
    pub async fn forkchoice_updated(
        &self,
        head_block_hash: &Hash32,
        attributes: Option<&PayloadAttributes>,
        deadline: Duration,
    ) -> Result<Option<String>, Error> {
        let state = ForkchoiceState {
            head_block_hash: wire::hex_from_bytes(head_block_hash.as_ref()),
            safe_block_hash: wire::hex_from_bytes(head_block_hash.as_ref()),
            finalized_block_hash: wire::hex_from_bytes(head_block_hash.as_ref()),
        };
        let params = json!([state, attributes.map(payload_attributes_to_wire)]);
        let result = self.call_with_retry(FORKCHOICE_UPDATED_METHOD, params, deadline).await?;
        let parsed: ForkchoiceUpdatedResult = serde_json::from_value(result)?;
        debug!(payload_id = ?parsed.payload_id, "forkchoice updated");
        Ok(parsed.payload_id)
    }

    /// `engine_getPayloadV4`. A non-existent `payload_id` surfaces as `Error::PayloadNotReady`
    /// immediately (not retried -- the bidder pipeline polls again on its own schedule); any
    /// other error (transient network failure, 5xx) is retried with backoff the same way
    /// `forkchoice_updated` is.
    pub async fn get_payload(
        &self,
        payload_id: &str,
        deadline: Duration,
    ) -> Result<(ExecutionPayload, BlobsBundle, u128, Vec<u8>), Error> {
        let params = json!([payload_id]);
        let policy = ExponentialBackoff { max_elapsed_time: Some(deadline), ..Default::default() };
        let result = retry(policy, || async {
            self.call(GET_PAYLOAD_METHOD, params.clone()).await.map_err(|err| match err {
                Error::Rpc { code: -38001, .. } => backoff::Error::permanent(err),
                err => {
                    warn!(method = GET_PAYLOAD_METHOD, %err, "engine API call failed, retrying");
                    backoff::Error::transient(err)
                }
            })
        })
        .await
        .map_err(|err| match err {
            Error::Rpc { code: -38001, .. } => Error::PayloadNotReady(payload_id.to_string()),
            err => err,
        })?;
        let wire: GetPayloadResponseWire = serde_json::from_value(result)?;
        let payload = wire::payload_from_wire(wire.execution_payload)
            .map_err(|e| Error::Rpc { code: 0, message: e.to_string() })?;
        let blobs_bundle = wire::blobs_bundle_from_wire(wire.blobs_bundle)
            .map_err(|e| Error::Rpc { code: 0, message: e.to_string() })?;
        let block_value = wire::quantity_from_hex(&wire.block_value)
            .map_err(|e| Error::Rpc { code: 0, message: e.to_string() })?;
        let execution_requests = wire
            .execution_requests
            .iter()
            .flat_map(|s| s.strip_prefix("0x").unwrap_or(s).as_bytes().to_vec())
            .collect();
        Ok((payload, blobs_bundle, block_value, execution_requests))
    }
}

fn payload_attributes_to_wire(attributes: &PayloadAttributes) -> Value {
    json!({
        "timestamp": format!("0x{:x}", attributes.timestamp),
        "prevRandao": wire::hex_from_bytes(attributes.prev_randao.as_ref()),
        "suggestedFeeRecipient": wire::hex_from_bytes(attributes.fee_recipient.as_ref()),
        "withdrawals": [],
        "parentBeaconBlockRoot": wire::hex_from_bytes(attributes.parent_beacon_block_root.as_ref()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_attributes_to_wire_hex_encodes_timestamp() {
        let attributes = PayloadAttributes {
            slot: 1,
            parent_block_hash: Default::default(),
            parent_block_root: Default::default(),
            proposer_index: 0,
            fee_recipient: Default::default(),
            prev_randao: Default::default(),
            timestamp: 255,
            withdrawals: vec![],
            parent_beacon_block_root: Default::default(),
        };
        let wire = payload_attributes_to_wire(&attributes);
        assert_eq!(wire["timestamp"], "0xff");
    }
}
