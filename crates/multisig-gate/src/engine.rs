use std::sync::Arc;

use multisig_types::{
    multisig_address, transaction_address, DerivationProof, DerivedAuthority, Pubkey,
};
use tracing::{info, warn};

use crate::caller::Caller;
use crate::config::EngineConfig;
use crate::error::MultisigError;
use crate::events::{EventFilter, EventLog, MultisigEvent, RecordedEvent};
use crate::registry::MultisigRegistry;
use crate::store::{AccountStore, StoredAccount};
use crate::traits::ActionExecutor;
use crate::transaction::TransactionRecord;

/// The multisig quorum gate.
///
/// Owns the account store and the event log. Every operation takes
/// `&mut self` and is a single check-then-mutate unit: all preconditions are
/// evaluated against the current state before anything is written, so a
/// rejected call leaves the store untouched. Callers that share an engine
/// across tasks go through [`MultisigService`](crate::MultisigService),
/// which serializes access.
///
/// Operations are split by concern:
/// - creation and lookups (this module)
/// - [`propose_transaction`](Self::propose_transaction) in `proposal`
/// - [`approve_transaction`](Self::approve_transaction) and
///   [`remove_approval`](Self::remove_approval) in `approval`
/// - [`execute_transaction`](Self::execute_transaction) in `execution`
pub struct MultisigEngine {
    pub(crate) config: EngineConfig,
    pub(crate) store: AccountStore,
    pub(crate) events: EventLog,
    pub(crate) executor: Arc<dyn ActionExecutor>,
}

impl MultisigEngine {
    /// Create an engine with an empty store.
    pub fn new(config: EngineConfig, executor: Arc<dyn ActionExecutor>) -> Self {
        Self {
            config,
            store: AccountStore::new(),
            events: EventLog::new(),
            executor,
        }
    }

    /// Configuration accessor.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The account store, for direct reads and snapshots.
    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn query_events(&self, filter: &EventFilter) -> Vec<&RecordedEvent> {
        self.events.query(filter)
    }

    pub fn registry(&self, multisig: &Pubkey) -> Option<&MultisigRegistry> {
        self.store.registry(multisig)
    }

    pub fn transaction(&self, transaction: &Pubkey) -> Option<&TransactionRecord> {
        self.store.transaction(transaction)
    }

    /// Address the registry created by `creator` lives at.
    pub fn multisig_address_for(&self, creator: &Pubkey) -> Result<Pubkey, MultisigError> {
        Ok(multisig_address(creator, &self.config.program_id)?.address)
    }

    /// Address of the record proposed at `sequence` on `multisig`.
    pub fn transaction_address_for(
        &self,
        multisig: &Pubkey,
        sequence: u64,
    ) -> Result<Pubkey, MultisigError> {
        Ok(transaction_address(multisig, sequence, &self.config.program_id)?.address)
    }

    /// The derived signing authority of a stored multisig.
    pub fn authority_for(&self, multisig: &Pubkey) -> Result<DerivedAuthority, MultisigError> {
        let registry = self.lookup_registry(multisig)?;
        self.authority_of(multisig, registry)
    }

    /// Create a multisig owned by `owners`, with `caller` as creator.
    ///
    /// The registry address is derived from the creator alone, so each
    /// identity can create at most one multisig.
    pub fn create_multisig(
        &mut self,
        caller: &Caller,
        owners: Vec<Pubkey>,
        threshold: u64,
    ) -> Result<Pubkey, MultisigError> {
        self.try_create_multisig(caller, owners, threshold)
            .inspect_err(|err| {
                warn!(
                    operation = "create_multisig",
                    caller = %caller,
                    error = %err,
                    "Operation rejected"
                )
            })
    }

    fn try_create_multisig(
        &mut self,
        caller: &Caller,
        owners: Vec<Pubkey>,
        threshold: u64,
    ) -> Result<Pubkey, MultisigError> {
        let creator = *caller.key();
        MultisigRegistry::validate(&owners, threshold, self.config.max_owners)?;

        let (address, proof) = DerivationProof::derive(&creator, &self.config.program_id)?;
        let owner_count = owners.len();
        let registry = MultisigRegistry::new(creator, owners, threshold, proof);
        self.store.insert(address, StoredAccount::Multisig(registry))?;

        self.events.append(MultisigEvent::MultisigCreated {
            multisig: address,
            creator,
            owners: owner_count,
            threshold,
        });

        info!(
            multisig = %address,
            creator = %creator,
            owners = owner_count,
            threshold,
            "Multisig created"
        );

        Ok(address)
    }

    pub(crate) fn lookup_registry(&self, multisig: &Pubkey) -> Result<&MultisigRegistry, MultisigError> {
        self.store
            .registry(multisig)
            .ok_or(MultisigError::RegistryNotFound(*multisig))
    }

    pub(crate) fn lookup_transaction(
        &self,
        transaction: &Pubkey,
    ) -> Result<&TransactionRecord, MultisigError> {
        self.store
            .transaction(transaction)
            .ok_or(MultisigError::TransactionNotFound(*transaction))
    }

    /// Recompute the authority from the registry's creator and stored proof,
    /// checking on the way that the proof still reproduces `multisig`.
    pub(crate) fn authority_of(
        &self,
        multisig: &Pubkey,
        registry: &MultisigRegistry,
    ) -> Result<DerivedAuthority, MultisigError> {
        let program_id = &self.config.program_id;
        let reproduced = registry
            .proof()
            .registry_address(registry.creator(), program_id)
            .map_err(|_| MultisigError::DerivationMismatch(*multisig))?;
        if reproduced != *multisig {
            return Err(MultisigError::DerivationMismatch(*multisig));
        }

        DerivedAuthority::from_proof(registry.creator(), registry.proof(), program_id)
            .map_err(|_| MultisigError::DerivationMismatch(*multisig))
    }
}
