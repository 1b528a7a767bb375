use crate::{error::Error, state::AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use builder_core::{
    signing::{verify_signed_builder_message, verify_signed_builder_message_with_chain_domain},
    types::{BidWonEntry, SignedValidatorRegistration},
};
use ethereum_consensus::primitives::Hash32;
use hyper::server::conn::AddrIncoming;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::task::JoinHandle;
use tracing::{error, info, trace};

pub type RelayServer = axum::Server<AddrIncoming, axum::routing::IntoMakeService<Router>>;

fn parse_hash32(s: &str) -> Result<Hash32, Error> {
    let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s)).map_err(|_| Error::InvalidHex)?;
    Hash32::try_from(bytes.as_slice()).map_err(|_| Error::InvalidHex)
}

async fn handle_status() -> impl IntoResponse {
    StatusCode::OK
}

async fn handle_register_validators(
    State(state): State<AppState>,
    Json(mut registrations): Json<Vec<SignedValidatorRegistration>>,
) -> Result<(), Error> {
    trace!(count = registrations.len(), "processing validator registrations");
    for registration in registrations.iter_mut() {
        if !verify_registration(registration, &state) {
            return Err(Error::InvalidRegistrationSignature)
        }
    }
    for registration in registrations {
        state.validator_store.insert(registration.message);
    }
    Ok(())
}

/// Accepts a registration if either the conventional zero-fork/zero-root builder domain or the
/// chain's real genesis domain verifies it.
fn verify_registration(registration: &mut SignedValidatorRegistration, state: &AppState) -> bool {
    let public_key = registration.message.public_key.clone();
    if verify_signed_builder_message(
        &mut registration.message,
        &registration.signature,
        &public_key,
        &state.context,
    )
    .is_ok()
    {
        return true
    }
    verify_signed_builder_message_with_chain_domain(
        &mut registration.message,
        &registration.signature,
        &public_key,
        &state.genesis_fork_version,
        &state.genesis_validators_root,
    )
    .is_ok()
}

#[derive(Debug, Deserialize)]
struct HeaderParams {
    slot: u64,
    parent_hash: String,
    #[allow(dead_code)]
    pubkey: String,
}

async fn handle_get_header(
    State(state): State<AppState>,
    Path(params): Path<HeaderParams>,
) -> Result<Response, Error> {
    let parent_hash = parse_hash32(&params.parent_hash)?;
    let Some(event) = state.payload_cache.get(params.slot, &parent_hash) else {
        return Ok(StatusCode::NO_CONTENT.into_response())
    };

    let header = event.payload.to_header().map_err(|e| Error::Consensus(e.into()))?;
    // `event.block_value` is Gwei by convention; `value` on the wire is wei.
    let value = builder_core::units::gwei_to_wei(event.block_value as u128)
        + state.config.header_value_subsidy;

    let bid = builder_core::types::BuilderBid {
        header,
        blob_kzg_commitments: commitments_list(&event)?,
        execution_requests: Default::default(),
        value: ethereum_consensus::ssz::prelude::U256::from(value),
        public_key: state.signer.public_key().clone(),
    };
    let signed = state.signer.sign_builder_bid(bid, &state.context).map_err(Error::Consensus)?;

    trace!(slot = params.slot, value, "returning builder bid");
    Ok(Json(json!({ "version": "fulu", "data": signed })).into_response())
}

fn commitments_list(
    event: &builder_core::types::PayloadReadyEvent,
) -> Result<
    ethereum_consensus::ssz::prelude::List<
        ethereum_consensus::deneb::polynomial_commitments::KzgCommitment,
        { ethereum_consensus::deneb::mainnet::MAX_BLOB_COMMITMENTS_PER_BLOCK },
    >,
    Error,
> {
    let commitments = event
        .blobs_bundle
        .commitments
        .iter()
        .map(|c| {
            ethereum_consensus::deneb::polynomial_commitments::KzgCommitment::try_from(
                AsRef::<[u8]>::as_ref(c),
            )
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| Error::InvalidHex)?;
    ethereum_consensus::ssz::prelude::List::try_from(commitments).map_err(|_| Error::InvalidHex)
}

async fn handle_blinded_blocks(
    State(state): State<AppState>,
    Json(mut blinded): Json<Value>,
) -> Result<Json<Value>, Error> {
    let header = blinded
        .pointer("/message/body/execution_payload_header")
        .ok_or(Error::InvalidHex)?;
    let block_hash_hex =
        header.get("block_hash").and_then(Value::as_str).ok_or(Error::InvalidHex)?;
    let block_hash = parse_hash32(block_hash_hex)?;

    let event = state
        .payload_cache
        .get_by_block_hash(&block_hash)
        .ok_or_else(|| Error::NoPayloadForBlock(block_hash.clone()))?;

    let submitted: Vec<String> = blinded
        .pointer("/message/body/blob_kzg_commitments")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| v.as_str().map(|s| s.to_lowercase()))
        .collect();
    let cached: Vec<String> = event
        .blobs_bundle
        .commitments
        .iter()
        .map(|c| format!("0x{}", hex::encode(AsRef::<[u8]>::as_ref(c))))
        .collect();
    if submitted != cached {
        return Err(Error::BlobCommitmentsMismatch)
    }

    let payload_json = serde_json::to_value(&event.payload).map_err(|_| Error::InvalidHex)?;
    if let Some(body) = blinded.pointer_mut("/message/body").and_then(Value::as_object_mut) {
        body.remove("execution_payload_header");
        body.insert("execution_payload".to_string(), payload_json);
    }

    let kzg_proofs: Vec<String> = event
        .blobs_bundle
        .proofs
        .iter()
        .map(|p| format!("0x{}", hex::encode(AsRef::<[u8]>::as_ref(p))))
        .collect();
    let blobs: Vec<String> = event
        .blobs_bundle
        .blobs
        .iter()
        .map(|b| format!("0x{}", hex::encode(AsRef::<[u8]>::as_ref(b))))
        .collect();

    info!(block_hash = %block_hash, "assembled full signed block contents");
    Ok(Json(json!({
        "version": "fulu",
        "data": {
            "signed_block": blinded,
            "kzg_proofs": kzg_proofs,
            "blobs": blobs,
        }
    })))
}

#[derive(Debug, Deserialize)]
struct PageParams {
    offset: Option<usize>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct Page {
    total: usize,
    data: Vec<BidWonEntry>,
}

const DEFAULT_PAGE_LIMIT: usize = 200;
const MAX_PAGE_LIMIT: usize = 500;

async fn handle_bid_traces(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Json<Page> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT);
    let offset = params.offset.unwrap_or(0);
    let (data, total) = state.bids_won_store.get_page(offset, limit);
    Json(Page { total, data })
}

async fn handle_registered_validators(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "count": state.validator_store.len() }))
}

pub struct Server {
    state: AppState,
}

impl Server {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn serve(&self) -> RelayServer {
        let write_routes = Router::new()
            .route("/eth/v1/builder/validators", post(handle_register_validators))
            .route("/eth/v1/builder/blinded_blocks", post(handle_blinded_blocks))
            .route_layer(middleware::from_fn_with_state(self.state.clone(), crate::auth::require_token));

        let router = Router::new()
            .route("/eth/v1/builder/status", get(handle_status))
            .route("/eth/v1/builder/header/:slot/:parent_hash/:pubkey", get(handle_get_header))
            .route(
                "/relay/v1/data/bidtraces/proposer_payload_delivered",
                get(handle_bid_traces),
            )
            .route("/relay/v1/data/validator_registration", get(handle_registered_validators))
            .merge(write_routes)
            .with_state(self.state.clone());

        let addr = SocketAddr::from((self.state.config.host, self.state.config.port));
        axum::Server::bind(&addr).serve(router.into_make_service())
    }

    pub fn spawn(&self) -> JoinHandle<()> {
        let server = self.serve();
        let addr = server.local_addr();
        tokio::spawn(async move {
            info!("listening at {addr}...");
            if let Err(err) = server.await {
                error!(%err, "error while listening for incoming connections");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hash32_accepts_0x_prefix() {
        let hex_str = format!("0x{}", "11".repeat(32));
        assert!(parse_hash32(&hex_str).is_ok());
    }

    #[test]
    fn test_parse_hash32_rejects_wrong_length() {
        assert!(parse_hash32("0x1234").is_err());
    }

    #[test]
    fn test_page_limit_is_capped() {
        let limit = Some(10_000usize).unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT);
        assert_eq!(limit, MAX_PAGE_LIMIT);
    }
}
