use crate::{
    signing::{compute_builder_signing_root, sign_builder_message, sign_with_application_builder_domain},
    types::ExecutionPayloadHeader,
};
use ethereum_consensus::{
    crypto::SecretKey,
    deneb::{mainnet::MAX_BLOB_COMMITMENTS_PER_BLOCK, polynomial_commitments::KzgCommitment},
    primitives::{BlsPublicKey, BlsSignature, Root, Version},
    signing::verify_signature,
    ssz::prelude::*,
    state_transition::{Context, Error},
};
use std::fmt;

/// `execution_requests` conversion from the engine's encoding into this SSZ-structured form is
/// left unimplemented until the wire format stabilizes; builder bids always carry an empty list
/// here. Still participates in hashing/signing so the bid's root is well defined.
pub type ExecutionRequests = List<u8, 1024>;

#[derive(Debug, Clone, Default, SimpleSerialize, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuilderBid {
    pub header: ExecutionPayloadHeader,
    pub blob_kzg_commitments: List<KzgCommitment, MAX_BLOB_COMMITMENTS_PER_BLOCK>,
    pub execution_requests: ExecutionRequests,
    #[cfg_attr(feature = "serde", serde(with = "crate::serde::as_str"))]
    pub value: U256,
    #[cfg_attr(feature = "serde", serde(rename = "pubkey"))]
    pub public_key: BlsPublicKey,
}

impl BuilderBid {
    pub fn sign(mut self, secret_key: &SecretKey, context: &Context) -> Result<SignedBuilderBid, Error> {
        let signature = sign_builder_message(&mut self, secret_key, context)?;
        Ok(SignedBuilderBid { message: self, signature })
    }
}

#[derive(Debug, Clone, SimpleSerialize, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignedBuilderBid {
    pub message: BuilderBid,
    pub signature: BlsSignature,
}

impl fmt::Display for SignedBuilderBid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "block hash {:?} and value {}",
            self.message.header.block_hash, self.message.value
        )
    }
}

impl SignedBuilderBid {
    pub fn verify_signature(&mut self, context: &Context) -> Result<(), Error> {
        let signing_root = compute_builder_signing_root(&mut self.message, context)?;
        verify_signature(&self.message.public_key, signing_root.as_ref(), &self.signature)
    }
}

/// The ePBS bid a builder submits during the bid loop (§4.3). Unlike `BuilderBid`, this is not
/// addressed to a specific proposer's blinded header request -- it is broadcast to the CL's bid
/// pool and superseded by later, higher-value bids from the same builder for the same slot.
#[derive(Debug, Clone, Default, SimpleSerialize, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExecutionPayloadBid {
    #[cfg_attr(feature = "serde", serde(with = "crate::serde::as_str"))]
    pub slot: u64,
    pub parent_block_hash: ethereum_consensus::primitives::Hash32,
    pub parent_block_root: Node,
    pub block_hash: ethereum_consensus::primitives::Hash32,
    #[cfg_attr(feature = "serde", serde(rename = "builder_pubkey"))]
    pub builder_public_key: BlsPublicKey,
    #[cfg_attr(feature = "serde", serde(with = "crate::serde::as_str"))]
    pub value: U256,
    /// equal to `value` in this release (§4.3: "identity in this release")
    #[cfg_attr(feature = "serde", serde(with = "crate::serde::as_str"))]
    pub execution_payment: U256,
    /// zero when there are no blobs
    pub blob_kzg_commitments_root: Node,
}

impl ExecutionPayloadBid {
    /// Signed with `DomainApplicationBuilder(genesis_fork_version, genesis_validators_root)` per
    /// §4.3 -- the chain's real genesis domain, not the zero/zero domain `BuilderBid::sign` uses.
    pub fn sign(
        mut self,
        secret_key: &SecretKey,
        fork_version: &Version,
        genesis_validators_root: &Root,
    ) -> Result<SignedExecutionPayloadBid, Error> {
        let signature = sign_with_application_builder_domain(
            &mut self,
            secret_key,
            fork_version,
            genesis_validators_root,
        )?;
        Ok(SignedExecutionPayloadBid { message: self, signature })
    }
}

#[derive(Debug, Clone, SimpleSerialize, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignedExecutionPayloadBid {
    pub message: ExecutionPayloadBid,
    pub signature: BlsSignature,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    #[test]
    fn test_builder_bid_signature_roundtrip() {
        let mut rng = thread_rng();
        let key = SecretKey::random(&mut rng).unwrap();
        let public_key = key.public_key();
        let bid = BuilderBid {
            header: ExecutionPayloadHeader::default(),
            blob_kzg_commitments: Default::default(),
            execution_requests: Default::default(),
            value: U256::from(234234),
            public_key,
        };
        let context = Context::for_mainnet();
        let mut signed = bid.sign(&key, &context).unwrap();
        signed.verify_signature(&context).expect("is valid signature");
    }

    #[test]
    fn test_execution_payload_bid_signature_roundtrip() {
        let mut rng = thread_rng();
        let key = SecretKey::random(&mut rng).unwrap();
        let bid = ExecutionPayloadBid {
            slot: 100,
            builder_public_key: key.public_key(),
            value: U256::from(1_000_000u64),
            execution_payment: U256::from(1_000_000u64),
            ..Default::default()
        };
        let fork_version = Version::default();
        let genesis_validators_root = Root::default();
        let signed = bid.sign(&key, &fork_version, &genesis_validators_root).unwrap();
        assert_eq!(signed.message.value, signed.message.execution_payment);
    }
}
