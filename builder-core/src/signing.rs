pub use ethereum_consensus::signing::{compute_signing_root, verify_signature};
use ethereum_consensus::{
    builder::compute_builder_domain,
    crypto::SecretKey,
    primitives::{BlsPublicKey, BlsSignature, Root, Version},
    signing::{sign_with_domain, verify_signed_data},
    ssz::prelude::SimpleSerialize,
    state_transition::{Context, Error},
};

pub const DOMAIN_DEPOSIT: [u8; 4] = [0x03, 0x00, 0x00, 0x00];
pub const DOMAIN_VOLUNTARY_EXIT: [u8; 4] = [0x04, 0x00, 0x00, 0x00];
pub const DOMAIN_APPLICATION_BUILDER: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

fn fork_data_root(fork_version: &Version, genesis_validators_root: &Root) -> Root {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(fork_version.as_ref());
    hasher.update(genesis_validators_root.as_ref());
    let digest = hasher.finalize();
    let mut root = Root::default();
    root.as_mut().copy_from_slice(&digest);
    root
}

/// `ComputeDomain(domain_type, fork_version, genesis_validators_root)` per §4.6: SHA-256 of
/// `fork_version (4B) || pad(genesis_validators_root, 32B into 64B)`, with the first 4 bytes of
/// the result overwritten by `domain_type`.
pub fn compute_domain(
    domain_type: [u8; 4],
    fork_version: &Version,
    genesis_validators_root: &Root,
) -> Root {
    let root = fork_data_root(fork_version, genesis_validators_root);
    let mut domain = Root::default();
    domain.as_mut()[..4].copy_from_slice(&domain_type);
    domain.as_mut()[4..].copy_from_slice(&root.as_ref()[..28]);
    domain
}

pub fn compute_deposit_domain(fork_version: &Version) -> Root {
    compute_domain(DOMAIN_DEPOSIT, fork_version, &Root::default())
}

pub fn compute_voluntary_exit_domain(
    fork_version: &Version,
    genesis_validators_root: &Root,
) -> Root {
    compute_domain(DOMAIN_VOLUNTARY_EXIT, fork_version, genesis_validators_root)
}

pub fn sign_builder_message<T: SimpleSerialize>(
    message: &mut T,
    signing_key: &SecretKey,
    context: &Context,
) -> Result<BlsSignature, Error> {
    let domain = compute_builder_domain(context)?;
    sign_with_domain(message, signing_key, domain)
}

pub fn compute_builder_signing_root<T: SimpleSerialize>(
    data: &mut T,
    context: &Context,
) -> Result<Root, Error> {
    let domain = compute_builder_domain(context)?;
    compute_signing_root(data, domain)
}

/// Verifies a signature produced by [`sign_builder_message`] -- `compute_builder_domain` derives
/// the conventional zero-fork/zero-root builder domain.
pub fn verify_signed_builder_message<T: SimpleSerialize>(
    message: &mut T,
    signature: &BlsSignature,
    public_key: &BlsPublicKey,
    context: &Context,
) -> Result<(), Error> {
    let domain = compute_builder_domain(context)?;
    verify_signed_data(message, signature, public_key, domain)
}

/// The builder domain computed from the chain's actual genesis fork data rather than the
/// zero/zero convention `compute_builder_domain` uses. Some consensus clients sign validator
/// registrations against this domain instead; §4.4 accepts either.
pub fn compute_application_builder_domain(
    fork_version: &Version,
    genesis_validators_root: &Root,
) -> Root {
    compute_domain(DOMAIN_APPLICATION_BUILDER, fork_version, genesis_validators_root)
}

/// Signs against the chain-genesis builder domain rather than the zero/zero convention; see
/// [`compute_application_builder_domain`]. Used for `ExecutionPayloadBid` per §4.3, which is
/// signed with `DomainApplicationBuilder(genesis_fork_version, genesis_validators_root)` and is
/// therefore distinct from [`sign_builder_message`]'s relay-facing `SignedBuilderBid` domain.
pub fn sign_with_application_builder_domain<T: SimpleSerialize>(
    message: &mut T,
    signing_key: &SecretKey,
    fork_version: &Version,
    genesis_validators_root: &Root,
) -> Result<BlsSignature, Error> {
    let domain = compute_application_builder_domain(fork_version, genesis_validators_root);
    sign_with_domain(message, signing_key, domain)
}

/// Verifies against the chain-genesis builder domain; see [`compute_application_builder_domain`].
pub fn verify_signed_builder_message_with_chain_domain<T: SimpleSerialize>(
    message: &mut T,
    signature: &BlsSignature,
    public_key: &BlsPublicKey,
    fork_version: &Version,
    genesis_validators_root: &Root,
) -> Result<(), Error> {
    let domain = compute_application_builder_domain(fork_version, genesis_validators_root);
    verify_signed_data(message, signature, public_key, domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_domain_has_deposit_type_prefix() {
        let domain = compute_deposit_domain(&Version::default());
        assert_eq!(&domain.as_ref()[..4], &DOMAIN_DEPOSIT);
    }

    #[test]
    fn test_compute_domain_is_deterministic() {
        let fork_version = Version::default();
        let root = Root::default();
        let a = compute_domain(DOMAIN_DEPOSIT, &fork_version, &root);
        let b = compute_domain(DOMAIN_DEPOSIT, &fork_version, &root);
        assert_eq!(a, b);
    }

    #[test]
    fn test_voluntary_exit_domain_has_distinct_prefix() {
        let domain = compute_voluntary_exit_domain(&Version::default(), &Root::default());
        assert_eq!(&domain.as_ref()[..4], &DOMAIN_VOLUNTARY_EXIT);
    }

    #[test]
    fn test_verify_signed_builder_message_roundtrip() {
        use crate::types::ExecutionPayloadBid;
        use ethereum_consensus::{crypto::SecretKey, ssz::prelude::U256};
        use rand::prelude::*;

        let mut rng = thread_rng();
        let key = SecretKey::random(&mut rng).unwrap();
        let public_key = key.public_key();
        let context = Context::for_mainnet();
        let mut message = ExecutionPayloadBid {
            builder_public_key: public_key.clone(),
            value: U256::from(1u64),
            execution_payment: U256::from(1u64),
            ..Default::default()
        };
        let signature = sign_builder_message(&mut message, &key, &context).unwrap();
        verify_signed_builder_message(&mut message, &signature, &public_key, &context)
            .expect("is valid signature");
    }

    #[test]
    fn test_chain_domain_differs_from_zero_domain() {
        let fork_version = Version::try_from(vec![1, 2, 3, 4]).unwrap();
        let root = Root::default();
        let zero_domain = compute_application_builder_domain(&Version::default(), &Root::default());
        let chain_domain = compute_application_builder_domain(&fork_version, &root);
        assert_ne!(zero_domain, chain_domain);
    }
}
