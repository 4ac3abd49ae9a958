use multisig_types::{transaction_address, Pubkey, TransactionPayload};
use tracing::{info, warn};

use crate::caller::Caller;
use crate::engine::MultisigEngine;
use crate::error::MultisigError;
use crate::events::MultisigEvent;
use crate::store::StoredAccount;
use crate::transaction::TransactionRecord;

impl MultisigEngine {
    /// Propose `payload` on `multisig`, returning the new record's address.
    ///
    /// The record lives at the address derived from the multisig and its
    /// current sequence, and starts out approved by the proposer. The
    /// sequence advances only when the record is stored.
    pub fn propose_transaction(
        &mut self,
        caller: &Caller,
        multisig: &Pubkey,
        payload: TransactionPayload,
    ) -> Result<Pubkey, MultisigError> {
        self.try_propose_transaction(caller, multisig, payload)
            .inspect_err(|err| {
                warn!(
                    operation = "propose_transaction",
                    caller = %caller,
                    multisig = %multisig,
                    error = %err,
                    "Operation rejected"
                )
            })
    }

    fn try_propose_transaction(
        &mut self,
        caller: &Caller,
        multisig: &Pubkey,
        payload: TransactionPayload,
    ) -> Result<Pubkey, MultisigError> {
        let proposer = *caller.key();
        let registry = self.lookup_registry(multisig)?;
        if !registry.is_owner(&proposer) {
            return Err(MultisigError::NotAnOwner(proposer));
        }

        payload.validate(&self.config.payload_limits())?;

        let sequence = registry.sequence();
        if registry.next_sequence().is_none() {
            return Err(MultisigError::SequenceOverflow(*multisig));
        }

        let derived = transaction_address(multisig, sequence, &self.config.program_id)?;
        if self.store.contains(&derived.address) {
            return Err(MultisigError::AlreadyExists(derived.address));
        }

        let registry = self
            .store
            .registry_mut(multisig)
            .ok_or(MultisigError::RegistryNotFound(*multisig))?;
        registry.advance_sequence();

        // Address checked free above
        let record = TransactionRecord::new(*multisig, sequence, derived.bump, proposer, payload);
        self.store
            .insert(derived.address, StoredAccount::Transaction(record))?;

        self.events.append(MultisigEvent::TransactionProposed {
            multisig: *multisig,
            transaction: derived.address,
            proposer,
            sequence,
        });

        info!(
            multisig = %multisig,
            transaction = %derived.address,
            proposer = %proposer,
            sequence,
            "Transaction proposed"
        );

        Ok(derived.address)
    }
}
