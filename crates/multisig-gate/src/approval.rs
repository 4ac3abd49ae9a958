use multisig_types::Pubkey;
use tracing::{info, warn};

use crate::caller::Caller;
use crate::engine::MultisigEngine;
use crate::error::MultisigError;
use crate::events::MultisigEvent;

impl MultisigEngine {
    /// Record `caller`'s approval of a pending transaction.
    pub fn approve_transaction(
        &mut self,
        caller: &Caller,
        multisig: &Pubkey,
        transaction: &Pubkey,
    ) -> Result<(), MultisigError> {
        self.try_approve_transaction(caller, multisig, transaction)
            .inspect_err(|err| {
                warn!(
                    operation = "approve_transaction",
                    caller = %caller,
                    transaction = %transaction,
                    error = %err,
                    "Operation rejected"
                )
            })
    }

    fn try_approve_transaction(
        &mut self,
        caller: &Caller,
        multisig: &Pubkey,
        transaction: &Pubkey,
    ) -> Result<(), MultisigError> {
        let approver = *caller.key();
        let registry = self.lookup_registry(multisig)?;
        let record = self.lookup_transaction(transaction)?;
        record.ensure_belongs_to(transaction, multisig)?;
        record.ensure_pending(transaction)?;

        if !registry.is_owner(&approver) {
            return Err(MultisigError::NotAnOwner(approver));
        }
        if record.approvals().contains(&approver) {
            return Err(MultisigError::AlreadyApproved(approver));
        }
        let threshold = registry.threshold();

        let record = self
            .store
            .transaction_mut(transaction)
            .ok_or(MultisigError::TransactionNotFound(*transaction))?;
        record.add_approval(approver);
        let approvals = record.approvals().len();

        self.events.append(MultisigEvent::TransactionApproved {
            multisig: *multisig,
            transaction: *transaction,
            approver,
            approvals,
            threshold,
        });

        info!(
            transaction = %transaction,
            approver = %approver,
            approvals,
            threshold,
            quorum = approvals as u64 >= threshold,
            "Transaction approved"
        );

        Ok(())
    }

    /// Withdraw `caller`'s approval of a pending transaction.
    ///
    /// Any approval can be withdrawn before execution, including the one
    /// the proposer was given implicitly.
    pub fn remove_approval(
        &mut self,
        caller: &Caller,
        multisig: &Pubkey,
        transaction: &Pubkey,
    ) -> Result<(), MultisigError> {
        self.try_remove_approval(caller, multisig, transaction)
            .inspect_err(|err| {
                warn!(
                    operation = "remove_approval",
                    caller = %caller,
                    transaction = %transaction,
                    error = %err,
                    "Operation rejected"
                )
            })
    }

    fn try_remove_approval(
        &mut self,
        caller: &Caller,
        multisig: &Pubkey,
        transaction: &Pubkey,
    ) -> Result<(), MultisigError> {
        let remover = *caller.key();
        self.lookup_registry(multisig)?;
        let record = self.lookup_transaction(transaction)?;
        record.ensure_belongs_to(transaction, multisig)?;
        record.ensure_pending(transaction)?;

        if !record.approvals().contains(&remover) {
            return Err(MultisigError::NotApproved(remover));
        }

        let record = self
            .store
            .transaction_mut(transaction)
            .ok_or(MultisigError::TransactionNotFound(*transaction))?;
        record.remove_approval(&remover);
        let approvals = record.approvals().len();

        self.events.append(MultisigEvent::ApprovalRemoved {
            multisig: *multisig,
            transaction: *transaction,
            remover,
            approvals,
        });

        info!(
            transaction = %transaction,
            remover = %remover,
            approvals,
            "Approval removed"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use multisig_types::{AccountRef, Action, TransactionPayload};

    use super::*;
    use crate::config::EngineConfig;
    use crate::events::{EventFilter, EventKind};
    use crate::mocks::RecordingExecutor;

    struct Fixture {
        engine: MultisigEngine,
        owners: Vec<Caller>,
        multisig: Pubkey,
        transaction: Pubkey,
    }

    /// A multisig with `owner_count` owners and one proposal by owner 0.
    fn fixture(owner_count: usize, threshold: u64) -> Fixture {
        let mut engine = MultisigEngine::new(
            EngineConfig::default(),
            Arc::new(RecordingExecutor::succeeding()),
        );
        let owners: Vec<Caller> = (0..owner_count)
            .map(|_| Caller::authenticated(Pubkey::new_unique()))
            .collect();
        let keys = owners.iter().map(|c| *c.key()).collect();
        let multisig = engine.create_multisig(&owners[0], keys, threshold).unwrap();
        let payload = TransactionPayload::single(Action::new(
            Pubkey::new_unique(),
            vec![AccountRef::authority()],
            vec![0u8; 8],
        ));
        let transaction = engine
            .propose_transaction(&owners[0], &multisig, payload)
            .unwrap();
        Fixture {
            engine,
            owners,
            multisig,
            transaction,
        }
    }

    #[test]
    fn approve_adds_owner_in_order() {
        let mut f = fixture(3, 2);
        f.engine
            .approve_transaction(&f.owners[2], &f.multisig, &f.transaction)
            .unwrap();
        f.engine
            .approve_transaction(&f.owners[1], &f.multisig, &f.transaction)
            .unwrap();

        let approvals = f.engine.transaction(&f.transaction).unwrap().approvals();
        assert_eq!(
            approvals.as_slice(),
            &[*f.owners[0].key(), *f.owners[2].key(), *f.owners[1].key()]
        );
    }

    #[test]
    fn double_approval_rejected() {
        let mut f = fixture(3, 2);
        let err = f
            .engine
            .approve_transaction(&f.owners[0], &f.multisig, &f.transaction)
            .unwrap_err();
        assert!(matches!(err, MultisigError::AlreadyApproved(k) if k == *f.owners[0].key()));
        assert_eq!(f.engine.transaction(&f.transaction).unwrap().approvals().len(), 1);
    }

    #[test]
    fn non_owner_approval_rejected_without_change() {
        let mut f = fixture(3, 2);
        let outsider = Caller::authenticated(Pubkey::new_unique());
        let before = f.engine.store().clone();
        let events_before = f.engine.events().len();

        let err = f
            .engine
            .approve_transaction(&outsider, &f.multisig, &f.transaction)
            .unwrap_err();
        assert!(matches!(err, MultisigError::NotAnOwner(_)));
        assert_eq!(f.engine.store(), &before);
        assert_eq!(f.engine.events().len(), events_before);
    }

    #[test]
    fn approval_against_wrong_multisig_rejected() {
        let mut f = fixture(3, 2);
        // Second multisig created by owner 1, sharing owner 1
        let other = f
            .engine
            .create_multisig(&f.owners[1], vec![*f.owners[1].key()], 1)
            .unwrap();

        let err = f
            .engine
            .approve_transaction(&f.owners[1], &other, &f.transaction)
            .unwrap_err();
        assert!(matches!(err, MultisigError::RegistryMismatch { multisig, .. } if multisig == other));
    }

    #[test]
    fn missing_transaction_rejected() {
        let mut f = fixture(2, 1);
        let unknown = Pubkey::new_unique();
        assert!(matches!(
            f.engine.approve_transaction(&f.owners[1], &f.multisig, &unknown),
            Err(MultisigError::TransactionNotFound(k)) if k == unknown
        ));
    }

    #[test]
    fn remove_then_reapprove() {
        let mut f = fixture(3, 2);
        f.engine
            .approve_transaction(&f.owners[1], &f.multisig, &f.transaction)
            .unwrap();
        f.engine
            .remove_approval(&f.owners[1], &f.multisig, &f.transaction)
            .unwrap();
        assert!(!f
            .engine
            .transaction(&f.transaction)
            .unwrap()
            .approvals()
            .contains(f.owners[1].key()));

        f.engine
            .approve_transaction(&f.owners[1], &f.multisig, &f.transaction)
            .unwrap();
        assert_eq!(f.engine.transaction(&f.transaction).unwrap().approvals().len(), 2);
    }

    #[test]
    fn remove_without_approval_rejected() {
        let mut f = fixture(3, 2);
        let err = f
            .engine
            .remove_approval(&f.owners[2], &f.multisig, &f.transaction)
            .unwrap_err();
        assert!(matches!(err, MultisigError::NotApproved(k) if k == *f.owners[2].key()));
    }

    #[test]
    fn proposer_can_withdraw_own_approval() {
        let mut f = fixture(2, 1);
        f.engine
            .remove_approval(&f.owners[0], &f.multisig, &f.transaction)
            .unwrap();
        assert!(f.engine.transaction(&f.transaction).unwrap().approvals().is_empty());
    }

    #[test]
    fn approve_and_remove_emit_events() {
        let mut f = fixture(3, 2);
        f.engine
            .approve_transaction(&f.owners[1], &f.multisig, &f.transaction)
            .unwrap();
        f.engine
            .remove_approval(&f.owners[1], &f.multisig, &f.transaction)
            .unwrap();

        let by_tx = EventFilter::new().with_transaction(f.transaction);
        let kinds: Vec<EventKind> = f
            .engine
            .query_events(&by_tx)
            .iter()
            .map(|e| e.event.kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::TransactionProposed,
                EventKind::TransactionApproved,
                EventKind::ApprovalRemoved
            ]
        );
    }

    #[tokio::test]
    async fn executed_record_reported_before_ownership() {
        let mut f = fixture(3, 1);
        f.engine
            .execute_transaction(&f.owners[1], &f.multisig, &f.transaction, &[])
            .await
            .unwrap();
        let before = f.engine.store().snapshot().unwrap();

        let outsider = Caller::authenticated(Pubkey::new_unique());
        assert!(matches!(
            f.engine.approve_transaction(&outsider, &f.multisig, &f.transaction),
            Err(MultisigError::AlreadyExecuted(k)) if k == f.transaction
        ));
        // Owner 2 never approved, yet the executed state wins
        assert!(matches!(
            f.engine.remove_approval(&f.owners[2], &f.multisig, &f.transaction),
            Err(MultisigError::AlreadyExecuted(k)) if k == f.transaction
        ));
        assert_eq!(f.engine.store().snapshot().unwrap(), before);
    }

    #[test]
    fn removal_against_wrong_multisig_rejected() {
        let mut f = fixture(3, 2);
        let other = f
            .engine
            .create_multisig(&f.owners[1], vec![*f.owners[0].key()], 1)
            .unwrap();
        let before = f.engine.store().snapshot().unwrap();

        let err = f
            .engine
            .remove_approval(&f.owners[0], &other, &f.transaction)
            .unwrap_err();
        assert!(matches!(
            err,
            MultisigError::RegistryMismatch { transaction, multisig }
                if transaction == f.transaction && multisig == other
        ));
        assert_eq!(f.engine.store().snapshot().unwrap(), before);
        assert!(f
            .engine
            .transaction(&f.transaction)
            .unwrap()
            .approvals()
            .contains(f.owners[0].key()));
    }
}
