use multisig_types::{Pubkey, TransactionPayload};
use serde::{Deserialize, Serialize};

use crate::approvals::ApprovalSet;
use crate::error::MultisigError;

/// The persistent record of one proposed transaction.
///
/// Bound to exactly one multisig by address. Approvals change only while
/// `executed` is false; `executed` flips once and is never reset, after
/// which the record is kept as an immutable audit entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    multisig: Pubkey,
    sequence: u64,
    bump: u8,
    proposer: Pubkey,
    payload: TransactionPayload,
    approvals: ApprovalSet,
    executed: bool,
}

impl TransactionRecord {
    /// A fresh record carrying the proposer's implicit approval.
    pub(crate) fn new(
        multisig: Pubkey,
        sequence: u64,
        bump: u8,
        proposer: Pubkey,
        payload: TransactionPayload,
    ) -> Self {
        Self {
            multisig,
            sequence,
            bump,
            proposer,
            payload,
            approvals: ApprovalSet::with_first(proposer),
            executed: false,
        }
    }

    pub fn multisig(&self) -> &Pubkey {
        &self.multisig
    }

    /// The multisig's sequence number when this record was proposed.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn bump(&self) -> u8 {
        self.bump
    }

    pub fn proposer(&self) -> &Pubkey {
        &self.proposer
    }

    pub fn payload(&self) -> &TransactionPayload {
        &self.payload
    }

    pub fn approvals(&self) -> &ApprovalSet {
        &self.approvals
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Fail unless this record was proposed on `multisig`.
    pub fn ensure_belongs_to(&self, address: &Pubkey, multisig: &Pubkey) -> Result<(), MultisigError> {
        if self.multisig != *multisig {
            return Err(MultisigError::RegistryMismatch {
                transaction: *address,
                multisig: *multisig,
            });
        }
        Ok(())
    }

    /// Fail if the record has already been executed.
    pub fn ensure_pending(&self, address: &Pubkey) -> Result<(), MultisigError> {
        if self.executed {
            return Err(MultisigError::AlreadyExecuted(*address));
        }
        Ok(())
    }

    pub(crate) fn add_approval(&mut self, approver: Pubkey) -> bool {
        self.approvals.insert(approver)
    }

    pub(crate) fn remove_approval(&mut self, remover: &Pubkey) -> bool {
        self.approvals.remove(remover)
    }

    pub(crate) fn mark_executed(&mut self) {
        self.executed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multisig_types::{AccountRef, Action};

    fn payload() -> TransactionPayload {
        TransactionPayload::single(Action::new(
            Pubkey::default(),
            vec![AccountRef::authority()],
            b"test".to_vec(),
        ))
    }

    #[test]
    fn new_record_is_seeded_with_proposer() {
        let proposer = Pubkey::new_unique();
        let record = TransactionRecord::new(Pubkey::new_unique(), 0, 255, proposer, payload());
        assert_eq!(record.approvals().as_slice(), &[proposer]);
        assert!(!record.is_executed());
        assert_eq!(record.proposer(), &proposer);
    }

    #[test]
    fn ensure_belongs_to_detects_foreign_multisig() {
        let address = Pubkey::new_unique();
        let record = TransactionRecord::new(Pubkey::new_unique(), 0, 255, Pubkey::new_unique(), payload());
        let other = Pubkey::new_unique();
        let err = record.ensure_belongs_to(&address, &other).unwrap_err();
        assert!(matches!(err, MultisigError::RegistryMismatch { multisig, .. } if multisig == other));
        assert!(record.ensure_belongs_to(&address, record.multisig()).is_ok());
    }

    #[test]
    fn executed_record_is_not_pending() {
        let address = Pubkey::new_unique();
        let mut record = TransactionRecord::new(Pubkey::new_unique(), 3, 250, Pubkey::new_unique(), payload());
        assert!(record.ensure_pending(&address).is_ok());
        record.mark_executed();
        assert!(matches!(
            record.ensure_pending(&address),
            Err(MultisigError::AlreadyExecuted(a)) if a == address
        ));
    }

    #[test]
    fn proposer_approval_can_be_removed() {
        let proposer = Pubkey::new_unique();
        let mut record = TransactionRecord::new(Pubkey::new_unique(), 0, 255, proposer, payload());
        assert!(record.remove_approval(&proposer));
        assert!(record.approvals().is_empty());
    }
}
