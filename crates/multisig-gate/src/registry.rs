use std::collections::HashSet;

use multisig_types::{DerivationProof, Pubkey};
use serde::{Deserialize, Serialize};

use crate::error::MultisigError;

/// The persistent record of one multisig: who owns it, how many of them
/// must approve, and how many proposals it has issued.
///
/// `owners`, `threshold` and `creator` are fixed at creation. `sequence`
/// only moves forward, by one, through [`MultisigRegistry::advance_sequence`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigRegistry {
    creator: Pubkey,
    owners: Vec<Pubkey>,
    threshold: u64,
    sequence: u64,
    proof: DerivationProof,
}

impl MultisigRegistry {
    /// Check an owner set and threshold before anything is allocated.
    pub fn validate(owners: &[Pubkey], threshold: u64, max_owners: usize) -> Result<(), MultisigError> {
        if owners.is_empty() {
            return Err(MultisigError::InvalidOwnerSet("no owners given".into()));
        }
        if owners.len() > max_owners {
            return Err(MultisigError::InvalidOwnerSet(format!(
                "{} owners exceeds maximum of {}",
                owners.len(),
                max_owners
            )));
        }

        let mut seen = HashSet::with_capacity(owners.len());
        if let Some(dup) = owners.iter().find(|o| !seen.insert(**o)) {
            return Err(MultisigError::InvalidOwnerSet(format!("duplicate owner {dup}")));
        }

        if threshold == 0 || threshold > owners.len() as u64 {
            return Err(MultisigError::InvalidThreshold {
                threshold,
                owners: owners.len(),
            });
        }
        Ok(())
    }

    /// Build a registry from an already validated owner set.
    pub(crate) fn new(
        creator: Pubkey,
        owners: Vec<Pubkey>,
        threshold: u64,
        proof: DerivationProof,
    ) -> Self {
        Self {
            creator,
            owners,
            threshold,
            sequence: 0,
            proof,
        }
    }

    pub fn creator(&self) -> &Pubkey {
        &self.creator
    }

    pub fn owners(&self) -> &[Pubkey] {
        &self.owners
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Sequence number the next proposal will receive.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn proof(&self) -> &DerivationProof {
        &self.proof
    }

    pub fn is_owner(&self, key: &Pubkey) -> bool {
        self.owners.contains(key)
    }

    pub fn quorum_reached(&self, approvals: usize) -> bool {
        approvals as u64 >= self.threshold
    }

    /// The sequence after the current one, if the counter has room.
    pub(crate) fn next_sequence(&self) -> Option<u64> {
        self.sequence.checked_add(1)
    }

    /// Consume the current sequence number and return it.
    ///
    /// Callers check [`next_sequence`](Self::next_sequence) first; the counter
    /// saturates rather than wrapping so a number is never reused.
    pub(crate) fn advance_sequence(&mut self) -> u64 {
        let current = self.sequence;
        self.sequence = self.sequence.saturating_add(1);
        current
    }

    #[cfg(test)]
    pub(crate) fn set_sequence(&mut self, sequence: u64) {
        self.sequence = sequence;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owners(n: usize) -> Vec<Pubkey> {
        (0..n).map(|_| Pubkey::new_unique()).collect()
    }

    fn proof() -> DerivationProof {
        DerivationProof {
            registry_bump: 255,
            authority_bump: 254,
        }
    }

    #[test]
    fn valid_owner_sets_accepted() {
        for n in 1..=5 {
            for threshold in 1..=n as u64 {
                assert!(MultisigRegistry::validate(&owners(n), threshold, 5).is_ok());
            }
        }
    }

    #[test]
    fn empty_owner_set_rejected() {
        let err = MultisigRegistry::validate(&[], 1, 5).unwrap_err();
        assert!(matches!(err, MultisigError::InvalidOwnerSet(_)));
    }

    #[test]
    fn oversized_owner_set_rejected() {
        let err = MultisigRegistry::validate(&owners(6), 2, 5).unwrap_err();
        assert!(matches!(err, MultisigError::InvalidOwnerSet(msg) if msg.contains("maximum of 5")));
    }

    #[test]
    fn duplicate_owners_rejected() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        let err = MultisigRegistry::validate(&[a, b, a], 1, 5).unwrap_err();
        assert!(matches!(err, MultisigError::InvalidOwnerSet(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn zero_threshold_rejected() {
        let err = MultisigRegistry::validate(&owners(3), 0, 5).unwrap_err();
        assert!(matches!(err, MultisigError::InvalidThreshold { threshold: 0, owners: 3 }));
    }

    #[test]
    fn threshold_above_owner_count_rejected() {
        let err = MultisigRegistry::validate(&owners(3), 4, 5).unwrap_err();
        assert!(matches!(err, MultisigError::InvalidThreshold { threshold: 4, .. }));
    }

    #[test]
    fn owner_set_checked_before_threshold() {
        let err = MultisigRegistry::validate(&[], 0, 5).unwrap_err();
        assert!(matches!(err, MultisigError::InvalidOwnerSet(_)));
    }

    #[test]
    fn new_registry_starts_at_sequence_zero() {
        let set = owners(3);
        let registry = MultisigRegistry::new(set[0], set.clone(), 2, proof());
        assert_eq!(registry.sequence(), 0);
        assert_eq!(registry.owners(), set.as_slice());
        assert!(registry.is_owner(&set[2]));
        assert!(!registry.is_owner(&Pubkey::new_unique()));
    }

    #[test]
    fn advance_sequence_returns_consumed_value() {
        let set = owners(2);
        let mut registry = MultisigRegistry::new(set[0], set, 1, proof());
        assert_eq!(registry.advance_sequence(), 0);
        assert_eq!(registry.advance_sequence(), 1);
        assert_eq!(registry.sequence(), 2);
    }

    #[test]
    fn quorum_compares_against_threshold() {
        let set = owners(5);
        let registry = MultisigRegistry::new(set[0], set, 2, proof());
        assert!(!registry.quorum_reached(1));
        assert!(registry.quorum_reached(2));
        assert!(registry.quorum_reached(3));
    }
}
