//! Deterministic address derivation.
//!
//! Every persistent record is addressed by a hash of its creation inputs, so
//! any party can recompute an address offline without a directory lookup:
//!
//! - multisig registry: `["multisig", creator]`
//! - signing authority: `["multisig-authority", creator]`
//! - transaction record: `["transaction", registry, sequence (u64 LE)]`
//!
//! A derived address is only accepted when it does NOT decode as an ed25519
//! curve point. No private key can exist for such an address, so the only
//! way to sign for it is to present the derivation inputs (seeds + bump).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pubkey::{Pubkey, PUBKEY_BYTES};

/// Maximum number of seeds, including the bump.
pub const MAX_SEEDS: usize = 16;
/// Maximum length of a single seed in bytes.
pub const MAX_SEED_LEN: usize = 32;

pub const MULTISIG_SEED: &[u8] = b"multisig";
pub const AUTHORITY_SEED: &[u8] = b"multisig-authority";
pub const TRANSACTION_SEED: &[u8] = b"transaction";

const DERIVATION_DOMAIN: &[u8] = b"multisig-derive-v1:";
const PROGRAM_DERIVED_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Errors from address derivation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DerivationError {
    #[error("too many seeds: {0} (maximum {max})", max = MAX_SEEDS - 1)]
    TooManySeeds(usize),

    #[error("seed of {0} bytes exceeds maximum of {max}", max = MAX_SEED_LEN)]
    SeedTooLong(usize),

    #[error("derived address lies on the ed25519 curve")]
    OnCurve,

    #[error("no valid bump found for the given seeds")]
    Exhausted,
}

/// A derived address together with the bump that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramAddress {
    pub address: Pubkey,
    pub bump: u8,
}

/// Hash `seeds` and `bump` under `program_id` into a candidate address.
///
/// Fails with [`DerivationError::OnCurve`] if the candidate is a valid
/// ed25519 public key.
pub fn create_program_address(
    seeds: &[&[u8]],
    bump: u8,
    program_id: &Pubkey,
) -> Result<Pubkey, DerivationError> {
    if seeds.len() >= MAX_SEEDS {
        return Err(DerivationError::TooManySeeds(seeds.len()));
    }
    if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
        return Err(DerivationError::SeedTooLong(seed.len()));
    }

    let mut hasher = blake3::Hasher::new();
    // Domain separation tag
    hasher.update(DERIVATION_DOMAIN);
    for seed in seeds {
        // Length prefix keeps ["ab", "c"] and ["a", "bc"] apart
        hasher.update(&(seed.len() as u32).to_le_bytes());
        hasher.update(seed);
    }
    hasher.update(&[bump]);
    hasher.update(program_id.as_bytes());
    hasher.update(PROGRAM_DERIVED_MARKER);

    let candidate: [u8; PUBKEY_BYTES] = *hasher.finalize().as_bytes();
    if is_on_curve(&candidate) {
        return Err(DerivationError::OnCurve);
    }
    Ok(Pubkey::new(candidate))
}

/// Search bumps from 255 down to 0 and return the first off-curve address.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<ProgramAddress, DerivationError> {
    for bump in (0..=u8::MAX).rev() {
        match create_program_address(seeds, bump, program_id) {
            Ok(address) => return Ok(ProgramAddress { address, bump }),
            Err(DerivationError::OnCurve) => continue,
            Err(other) => return Err(other),
        }
    }
    Err(DerivationError::Exhausted)
}

/// Whether `bytes` decompress to a point on the ed25519 curve.
pub fn is_on_curve(bytes: &[u8; PUBKEY_BYTES]) -> bool {
    ed25519_dalek::VerifyingKey::from_bytes(bytes).is_ok()
}

/// Address of the registry created by `creator`.
pub fn multisig_address(
    creator: &Pubkey,
    program_id: &Pubkey,
) -> Result<ProgramAddress, DerivationError> {
    find_program_address(&[MULTISIG_SEED, creator.as_ref()], program_id)
}

/// Address of the keyless signing authority controlled by `creator`'s registry.
pub fn authority_address(
    creator: &Pubkey,
    program_id: &Pubkey,
) -> Result<ProgramAddress, DerivationError> {
    find_program_address(&[AUTHORITY_SEED, creator.as_ref()], program_id)
}

/// Address of the transaction record proposed at `sequence` on `multisig`.
pub fn transaction_address(
    multisig: &Pubkey,
    sequence: u64,
    program_id: &Pubkey,
) -> Result<ProgramAddress, DerivationError> {
    let sequence_bytes = sequence.to_le_bytes();
    find_program_address(
        &[TRANSACTION_SEED, multisig.as_ref(), &sequence_bytes],
        program_id,
    )
}

/// The bumps that reproduce a registry's own address and its authority
/// address from the registry creator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DerivationProof {
    pub registry_bump: u8,
    pub authority_bump: u8,
}

impl DerivationProof {
    /// Derive both addresses for `creator` and return the registry address
    /// with the proof that reproduces them.
    pub fn derive(creator: &Pubkey, program_id: &Pubkey) -> Result<(Pubkey, Self), DerivationError> {
        let registry = multisig_address(creator, program_id)?;
        let authority = authority_address(creator, program_id)?;
        Ok((
            registry.address,
            Self {
                registry_bump: registry.bump,
                authority_bump: authority.bump,
            },
        ))
    }

    /// Recompute the registry address from `creator` and this proof.
    pub fn registry_address(
        &self,
        creator: &Pubkey,
        program_id: &Pubkey,
    ) -> Result<Pubkey, DerivationError> {
        create_program_address(&[MULTISIG_SEED, creator.as_ref()], self.registry_bump, program_id)
    }
}

/// The keyless signing authority of one multisig.
///
/// A credential, not an identity: it can only be obtained by successfully
/// recomputing the derivation, and it carries everything an execution
/// environment needs to re-verify that derivation in place of a signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivedAuthority {
    address: Pubkey,
    creator: Pubkey,
    bump: u8,
    program_id: Pubkey,
}

impl DerivedAuthority {
    /// Find the canonical authority for `creator`.
    pub fn derive(creator: &Pubkey, program_id: &Pubkey) -> Result<Self, DerivationError> {
        let found = authority_address(creator, program_id)?;
        Ok(Self {
            address: found.address,
            creator: *creator,
            bump: found.bump,
            program_id: *program_id,
        })
    }

    /// Rebuild the authority from a stored bump.
    pub fn from_proof(
        creator: &Pubkey,
        proof: &DerivationProof,
        program_id: &Pubkey,
    ) -> Result<Self, DerivationError> {
        let address = create_program_address(
            &[AUTHORITY_SEED, creator.as_ref()],
            proof.authority_bump,
            program_id,
        )?;
        Ok(Self {
            address,
            creator: *creator,
            bump: proof.authority_bump,
            program_id: *program_id,
        })
    }

    pub fn address(&self) -> Pubkey {
        self.address
    }

    pub fn creator(&self) -> Pubkey {
        self.creator
    }

    pub fn bump(&self) -> u8 {
        self.bump
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// The signer seeds, bump included, as presented to the execution
    /// environment.
    pub fn signer_seeds(&self) -> Vec<Vec<u8>> {
        vec![
            AUTHORITY_SEED.to_vec(),
            self.creator.as_ref().to_vec(),
            vec![self.bump],
        ]
    }

    /// Re-run the derivation and check it still lands on `address`.
    pub fn verify(&self) -> bool {
        create_program_address(
            &[AUTHORITY_SEED, self.creator.as_ref()],
            self.bump,
            &self.program_id,
        )
        .map(|derived| derived == self.address)
        .unwrap_or(false)
    }
}
