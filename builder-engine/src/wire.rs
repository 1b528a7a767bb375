//! JSON shapes exchanged with the execution client over the Engine API: camelCase field names,
//! `0x`-prefixed hex quantities and byte strings, the usual JSON-RPC conventions. Converted into
//! our own SSZ-capable types immediately after deserialization so the rest of the system never
//! sees this wire format.
use builder_core::types::{BlobsBundle, ExecutionPayload, Transaction};
use ethereum_consensus::ssz::prelude::*;
use serde::{Deserialize, Serialize};

pub mod quantity {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{value:x}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        u64::from_str_radix(s, 16).map_err(D::Error::custom)
    }
}

fn decode_hex_bytes(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
}

fn encode_hex_bytes(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalWire {
    #[serde(with = "quantity")]
    pub index: u64,
    #[serde(with = "quantity")]
    pub validator_index: u64,
    pub address: String,
    #[serde(with = "quantity")]
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPayloadWire {
    pub parent_hash: String,
    pub fee_recipient: String,
    pub state_root: String,
    pub receipts_root: String,
    pub logs_bloom: String,
    pub prev_randao: String,
    #[serde(with = "quantity")]
    pub block_number: u64,
    #[serde(with = "quantity")]
    pub gas_limit: u64,
    #[serde(with = "quantity")]
    pub gas_used: u64,
    #[serde(with = "quantity")]
    pub timestamp: u64,
    pub extra_data: String,
    pub base_fee_per_gas: String,
    pub block_hash: String,
    pub transactions: Vec<String>,
    pub withdrawals: Vec<WithdrawalWire>,
    #[serde(with = "quantity")]
    pub blob_gas_used: u64,
    #[serde(with = "quantity")]
    pub excess_blob_gas: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobsBundleWire {
    pub commitments: Vec<String>,
    pub proofs: Vec<String>,
    pub blobs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPayloadResponseWire {
    pub execution_payload: ExecutionPayloadWire,
    pub block_value: String,
    pub blobs_bundle: BlobsBundleWire,
    #[serde(default)]
    pub execution_requests: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("invalid hex in engine API response: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("SSZ container rejected a field of the wrong length: {0}")]
    Merkleization(String),
}

pub(crate) fn fixed_bytes<const N: usize>(hex_str: &str) -> Result<ByteVector<N>, ConvertError> {
    let bytes = decode_hex_bytes(hex_str)?;
    ByteVector::<N>::try_from(bytes).map_err(|e| ConvertError::Merkleization(format!("{e:?}")))
}

/// Beacon API fields (slot, proposer_index, timestamp) are plain decimal strings, unlike the
/// `0x`-hex quantities the execution client speaks over the Engine API.
pub(crate) fn quantity_from_hex_or_decimal(s: &str) -> Result<u64, ConvertError> {
    s.parse().map_err(|_| ConvertError::Merkleization(format!("bad decimal quantity `{s}`")))
}

pub fn payload_from_wire(wire: ExecutionPayloadWire) -> Result<ExecutionPayload, ConvertError> {
    let transactions: Vec<Transaction> = wire
        .transactions
        .iter()
        .map(|tx| -> Result<Transaction, ConvertError> {
            let bytes = decode_hex_bytes(tx)?;
            Transaction::try_from(bytes).map_err(|e| ConvertError::Merkleization(format!("{e:?}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let withdrawals = wire
        .withdrawals
        .into_iter()
        .map(|w| {
            Ok(ethereum_consensus::capella::Withdrawal {
                index: w.index as usize,
                validator_index: w.validator_index as usize,
                address: fixed_bytes::<20>(&w.address)?.as_ref().try_into().unwrap(),
                amount: w.amount,
            })
        })
        .collect::<Result<Vec<_>, ConvertError>>()?;

    Ok(ExecutionPayload {
        parent_hash: fixed_bytes::<32>(&wire.parent_hash)?.as_ref().try_into().unwrap(),
        fee_recipient: fixed_bytes::<20>(&wire.fee_recipient)?.as_ref().try_into().unwrap(),
        state_root: fixed_bytes::<32>(&wire.state_root)?.as_ref().try_into().unwrap(),
        receipts_root: fixed_bytes::<32>(&wire.receipts_root)?.as_ref().try_into().unwrap(),
        logs_bloom: fixed_bytes::<256>(&wire.logs_bloom)?,
        prev_randao: fixed_bytes::<32>(&wire.prev_randao)?.as_ref().try_into().unwrap(),
        block_number: wire.block_number,
        gas_limit: wire.gas_limit,
        gas_used: wire.gas_used,
        timestamp: wire.timestamp,
        extra_data: ByteList::try_from(decode_hex_bytes(&wire.extra_data)?)
            .map_err(|e| ConvertError::Merkleization(format!("{e:?}")))?,
        base_fee_per_gas: U256::from(quantity_from_hex(&wire.base_fee_per_gas)?),
        block_hash: fixed_bytes::<32>(&wire.block_hash)?.as_ref().try_into().unwrap(),
        transactions: List::try_from(transactions)
            .map_err(|e| ConvertError::Merkleization(format!("{e:?}")))?,
        withdrawals: List::try_from(withdrawals)
            .map_err(|e| ConvertError::Merkleization(format!("{e:?}")))?,
        blob_gas_used: wire.blob_gas_used,
        excess_blob_gas: wire.excess_blob_gas,
    })
}

pub fn blobs_bundle_from_wire(wire: BlobsBundleWire) -> Result<BlobsBundle, ConvertError> {
    let commitments =
        wire.commitments.iter().map(|c| fixed_bytes::<48>(c)).collect::<Result<Vec<_>, _>>()?;
    let proofs = wire
        .proofs
        .iter()
        .map(|p| {
            let raw = decode_hex_bytes(p)?;
            Ok(BlobsBundle::normalize_proof(&raw))
        })
        .collect::<Result<Vec<_>, ConvertError>>()?;
    let blobs =
        wire.blobs.iter().map(|b| fixed_bytes::<131072>(b)).collect::<Result<Vec<_>, _>>()?;
    Ok(BlobsBundle { commitments, proofs, blobs })
}

pub fn quantity_from_hex(s: &str) -> Result<u128, ConvertError> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    u128::from_str_radix(trimmed, 16).map_err(|_| ConvertError::Merkleization(format!("bad quantity `{s}`")))
}

pub fn hex_from_bytes(bytes: &[u8]) -> String {
    encode_hex_bytes(bytes)
}
