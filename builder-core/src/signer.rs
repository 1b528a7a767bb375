use crate::{
    signing::{compute_deposit_domain, compute_voluntary_exit_domain},
    types::{BuilderBid, ExecutionPayloadBid, SignedBuilderBid, SignedExecutionPayloadBid},
};
use ethereum_consensus::{
    crypto::SecretKey,
    phase0::{DepositMessage, VoluntaryExit},
    primitives::{BlsPublicKey, BlsSignature, Root, Version},
    signing::sign_with_domain,
    state_transition::{Context, Error},
};

/// Bound to one 32-byte BLS secret for the life of the process. Every signing operation the
/// system needs — deposit, voluntary exit, builder bid, execution payload bid — goes through
/// here so the secret key itself never has to be threaded through component constructors.
#[derive(Clone)]
pub struct Signer {
    secret_key: SecretKey,
    public_key: BlsPublicKey,
}

impl Signer {
    pub fn new(secret_key: SecretKey) -> Self {
        let public_key = secret_key.public_key();
        Self { secret_key, public_key }
    }

    pub fn public_key(&self) -> &BlsPublicKey {
        &self.public_key
    }

    pub fn sign_deposit_message(
        &self,
        mut message: DepositMessage,
        fork_version: &ethereum_consensus::primitives::Version,
    ) -> Result<BlsSignature, Error> {
        let domain = compute_deposit_domain(fork_version);
        sign_with_domain(&mut message, &self.secret_key, domain)
    }

    pub fn sign_voluntary_exit(
        &self,
        mut exit: VoluntaryExit,
        fork_version: &ethereum_consensus::primitives::Version,
        genesis_validators_root: &ethereum_consensus::primitives::Root,
    ) -> Result<BlsSignature, Error> {
        let domain = compute_voluntary_exit_domain(fork_version, genesis_validators_root);
        sign_with_domain(&mut exit, &self.secret_key, domain)
    }

    pub fn sign_builder_bid(
        &self,
        bid: BuilderBid,
        context: &Context,
    ) -> Result<SignedBuilderBid, Error> {
        bid.sign(&self.secret_key, context)
    }

    pub fn sign_execution_payload_bid(
        &self,
        bid: ExecutionPayloadBid,
        fork_version: &Version,
        genesis_validators_root: &Root,
    ) -> Result<SignedExecutionPayloadBid, Error> {
        bid.sign(&self.secret_key, fork_version, genesis_validators_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExecutionPayloadHeader;
    use ethereum_consensus::ssz::prelude::U256;
    use rand::prelude::*;

    fn test_signer() -> Signer {
        Signer::new(SecretKey::random(&mut thread_rng()).unwrap())
    }

    #[test]
    fn test_sign_builder_bid_uses_signer_public_key() {
        let signer = test_signer();
        let context = Context::for_mainnet();
        let bid = BuilderBid {
            header: ExecutionPayloadHeader::default(),
            blob_kzg_commitments: Default::default(),
            execution_requests: Default::default(),
            value: U256::from(1u64),
            public_key: signer.public_key().clone(),
        };
        let signed = signer.sign_builder_bid(bid, &context).unwrap();
        assert_eq!(signed.message.public_key, *signer.public_key());
    }

    #[test]
    fn test_sign_execution_payload_bid_preserves_value() {
        let signer = test_signer();
        let fork_version = Version::default();
        let genesis_validators_root = Root::default();
        let bid = ExecutionPayloadBid {
            slot: 10,
            builder_public_key: signer.public_key().clone(),
            value: U256::from(500u64),
            execution_payment: U256::from(500u64),
            ..Default::default()
        };
        let signed = signer
            .sign_execution_payload_bid(bid, &fork_version, &genesis_validators_root)
            .unwrap();
        assert_eq!(signed.message.value, U256::from(500u64));
    }
}
