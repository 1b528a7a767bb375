use ethereum_consensus::{
    capella::Withdrawal,
    primitives::{ExecutionAddress, Hash32},
    ssz::prelude::*,
};

pub const MAX_TRANSACTIONS_PER_PAYLOAD: usize = 1_048_576;
pub const MAX_BYTES_PER_TRANSACTION: usize = 1_073_741_824;
pub const MAX_WITHDRAWALS_PER_PAYLOAD: usize = 16;
pub const MAX_EXTRA_DATA_BYTES: usize = 32;

pub type Transaction = List<u8, MAX_BYTES_PER_TRANSACTION>;

#[derive(Debug, Clone, Default, SimpleSerialize, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExecutionPayload {
    pub parent_hash: Hash32,
    pub fee_recipient: ExecutionAddress,
    pub state_root: Node,
    pub receipts_root: Node,
    pub logs_bloom: ByteVector<256>,
    pub prev_randao: Bytes32,
    #[cfg_attr(feature = "serde", serde(with = "crate::serde::as_str"))]
    pub block_number: u64,
    #[cfg_attr(feature = "serde", serde(with = "crate::serde::as_str"))]
    pub gas_limit: u64,
    #[cfg_attr(feature = "serde", serde(with = "crate::serde::as_str"))]
    pub gas_used: u64,
    #[cfg_attr(feature = "serde", serde(with = "crate::serde::as_str"))]
    pub timestamp: u64,
    pub extra_data: ByteList<MAX_EXTRA_DATA_BYTES>,
    pub base_fee_per_gas: U256,
    pub block_hash: Hash32,
    pub transactions: List<Transaction, MAX_TRANSACTIONS_PER_PAYLOAD>,
    pub withdrawals: List<Withdrawal, MAX_WITHDRAWALS_PER_PAYLOAD>,
    #[cfg_attr(feature = "serde", serde(with = "crate::serde::as_str"))]
    pub blob_gas_used: u64,
    #[cfg_attr(feature = "serde", serde(with = "crate::serde::as_str"))]
    pub excess_blob_gas: u64,
}

impl ExecutionPayload {
    /// Builds the header counterpart of this payload, merkleizing the list fields into
    /// `transactions_root`/`withdrawals_root` the way a relay must before signing a bid.
    pub fn to_header(&self) -> Result<ExecutionPayloadHeader, MerkleizationError> {
        let mut transactions = self.transactions.clone();
        let mut withdrawals = self.withdrawals.clone();
        Ok(ExecutionPayloadHeader {
            parent_hash: self.parent_hash.clone(),
            fee_recipient: self.fee_recipient.clone(),
            state_root: self.state_root.clone(),
            receipts_root: self.receipts_root.clone(),
            logs_bloom: self.logs_bloom.clone(),
            prev_randao: self.prev_randao,
            block_number: self.block_number,
            gas_limit: self.gas_limit,
            gas_used: self.gas_used,
            timestamp: self.timestamp,
            extra_data: self.extra_data.clone(),
            base_fee_per_gas: self.base_fee_per_gas,
            block_hash: self.block_hash.clone(),
            transactions_root: transactions.hash_tree_root()?,
            withdrawals_root: withdrawals.hash_tree_root()?,
            blob_gas_used: self.blob_gas_used,
            excess_blob_gas: self.excess_blob_gas,
        })
    }
}

#[derive(Debug, Clone, Default, SimpleSerialize, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExecutionPayloadHeader {
    pub parent_hash: Hash32,
    pub fee_recipient: ExecutionAddress,
    pub state_root: Node,
    pub receipts_root: Node,
    pub logs_bloom: ByteVector<256>,
    pub prev_randao: Bytes32,
    #[cfg_attr(feature = "serde", serde(with = "crate::serde::as_str"))]
    pub block_number: u64,
    #[cfg_attr(feature = "serde", serde(with = "crate::serde::as_str"))]
    pub gas_limit: u64,
    #[cfg_attr(feature = "serde", serde(with = "crate::serde::as_str"))]
    pub gas_used: u64,
    #[cfg_attr(feature = "serde", serde(with = "crate::serde::as_str"))]
    pub timestamp: u64,
    pub extra_data: ByteList<MAX_EXTRA_DATA_BYTES>,
    pub base_fee_per_gas: U256,
    pub block_hash: Hash32,
    pub transactions_root: Node,
    pub withdrawals_root: Node,
    #[cfg_attr(feature = "serde", serde(with = "crate::serde::as_str"))]
    pub blob_gas_used: u64,
    #[cfg_attr(feature = "serde", serde(with = "crate::serde::as_str"))]
    pub excess_blob_gas: u64,
}

/// Parallel lists of equal length; `proofs` are left-padded to 48 bytes if the engine
/// returned the older 32-byte KZG proof encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlobsBundle {
    pub commitments: Vec<ByteVector<48>>,
    pub proofs: Vec<ByteVector<48>>,
    pub blobs: Vec<ByteVector<131072>>,
}

impl BlobsBundle {
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Left-pads a 32-byte proof (older engine encoding) out to the required 48 bytes.
    pub fn normalize_proof(raw: &[u8]) -> ByteVector<48> {
        let mut padded = [0u8; 48];
        let offset = 48usize.saturating_sub(raw.len());
        padded[offset..].copy_from_slice(&raw[..raw.len().min(48)]);
        ByteVector::try_from(padded.to_vec()).expect("48 bytes fits ByteVector<48>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_proof_left_pads_32_bytes() {
        let raw = [7u8; 32];
        let padded = BlobsBundle::normalize_proof(&raw);
        let bytes: &[u8] = padded.as_ref();
        assert_eq!(bytes.len(), 48);
        assert!(bytes[..16].iter().all(|b| *b == 0));
        assert_eq!(&bytes[16..], &raw[..]);
    }

    #[test]
    fn test_normalize_proof_48_bytes_is_unchanged() {
        let raw = [9u8; 48];
        let padded = BlobsBundle::normalize_proof(&raw);
        let bytes: &[u8] = padded.as_ref();
        assert_eq!(bytes, &raw[..]);
    }
}
