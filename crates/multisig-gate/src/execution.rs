use chrono::{DateTime, Utc};
use multisig_types::{AccountRef, AccountReference, Action, DerivedAuthority, Pubkey, TransactionPayload};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::caller::Caller;
use crate::engine::MultisigEngine;
use crate::error::MultisigError;
use crate::events::MultisigEvent;

/// A resource handle supplied by the executor alongside an execute request.
///
/// The gate only checks presence; what "writable" means is up to the
/// [`ActionExecutor`](crate::ActionExecutor).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub key: Pubkey,
    pub is_writable: bool,
}

impl ResourceRef {
    pub fn readonly(key: Pubkey) -> Self {
        Self {
            key,
            is_writable: false,
        }
    }

    pub fn writable(key: Pubkey) -> Self {
        Self {
            key,
            is_writable: true,
        }
    }
}

/// An account slot after authority substitution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedAccount {
    pub key: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
    /// The slot is the multisig authority; its signature is the derivation.
    pub is_authority: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizedAction {
    pub target: Pubkey,
    pub accounts: Vec<ResolvedAccount>,
    pub data: Vec<u8>,
}

/// Everything handed to the executor for one approved transaction.
///
/// Every slot naming the authority, symbolically or by its concrete address,
/// is marked as a signer: the authority's signature is the derivation itself.
/// No other account has its signer flag changed.
#[derive(Clone, Debug)]
pub struct AuthorizedBatch {
    pub multisig: Pubkey,
    pub transaction: Pubkey,
    /// Identity that requested execution.
    pub executor: Pubkey,
    pub authority: DerivedAuthority,
    pub actions: Vec<AuthorizedAction>,
}

impl AuthorizedBatch {
    pub fn build(
        multisig: Pubkey,
        transaction: Pubkey,
        executor: Pubkey,
        authority: DerivedAuthority,
        payload: &TransactionPayload,
    ) -> Self {
        let authority_key = authority.address();
        let actions = payload
            .actions
            .iter()
            .map(|action| authorize_action(action, &authority_key))
            .collect();

        Self {
            multisig,
            transaction,
            executor,
            authority,
            actions,
        }
    }

    /// Every account slot across all actions, in order.
    pub fn accounts(&self) -> impl Iterator<Item = &ResolvedAccount> {
        self.actions.iter().flat_map(|action| action.accounts.iter())
    }
}

fn authorize_action(action: &Action, authority: &Pubkey) -> AuthorizedAction {
    AuthorizedAction {
        target: action.target,
        accounts: action
            .accounts
            .iter()
            .map(|account| resolve_account(account, authority))
            .collect(),
        data: action.data.clone(),
    }
}

fn resolve_account(account: &AccountRef, authority: &Pubkey) -> ResolvedAccount {
    let key = match account.reference {
        AccountReference::Authority => *authority,
        AccountReference::Key(key) => key,
    };
    let is_authority = key == *authority;
    ResolvedAccount {
        key,
        is_signer: account.is_signer || is_authority,
        is_writable: account.is_writable,
        is_authority,
    }
}

/// Match every non-authority account in `batch` against the supplied
/// resources, in action order.
///
/// The authority needs no handle: it has no key material to supply.
pub fn resolve_resources(
    batch: &AuthorizedBatch,
    supplied: &[ResourceRef],
) -> Result<Vec<ResourceRef>, MultisigError> {
    batch
        .accounts()
        .filter(|account| !account.is_authority)
        .map(|account| {
            supplied
                .iter()
                .find(|resource| resource.key == account.key)
                .copied()
                .ok_or(MultisigError::MissingAccount(account.key))
        })
        .collect()
}

/// Returned by the executor after every action took effect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReceipt {
    pub receipt_id: Uuid,
    pub actions_executed: usize,
    pub executed_at: DateTime<Utc>,
}

impl ExecutionReceipt {
    pub fn new(actions_executed: usize) -> Self {
        Self {
            receipt_id: Uuid::new_v4(),
            actions_executed,
            executed_at: Utc::now(),
        }
    }
}

impl MultisigEngine {
    /// Execute an approved transaction through the configured executor.
    ///
    /// Anyone may call this once quorum is reached. Every check runs before
    /// the executor is invoked, and the record is marked executed only after
    /// the executor returns `Ok`. An executor failure leaves the record
    /// pending and can be retried.
    ///
    /// Not cancel-safe: dropping the future after the executor has applied
    /// the batch but before it returns leaves the record pending. Drive it to
    /// completion, as [`MultisigService`](crate::MultisigService) does.
    pub async fn execute_transaction(
        &mut self,
        caller: &Caller,
        multisig: &Pubkey,
        transaction: &Pubkey,
        resources: &[ResourceRef],
    ) -> Result<ExecutionReceipt, MultisigError> {
        let executor = *caller.key();
        let (batch, resolved) = self
            .prepare_execution(&executor, multisig, transaction, resources)
            .inspect_err(|err| {
                warn!(
                    operation = "execute_transaction",
                    caller = %caller,
                    transaction = %transaction,
                    error = %err,
                    "Operation rejected"
                )
            })?;

        debug!(
            transaction = %transaction,
            authority = %batch.authority.address(),
            actions = batch.actions.len(),
            resources = resolved.len(),
            "Dispatching approved batch"
        );

        let receipt = match self.executor.execute(&batch, &resolved).await {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(
                    transaction = %transaction,
                    error = %err,
                    "Executor failed, transaction left pending"
                );
                return Err(err.into());
            }
        };

        let record = self
            .store
            .transaction_mut(transaction)
            .ok_or(MultisigError::TransactionNotFound(*transaction))?;
        record.mark_executed();
        let sequence = record.sequence();

        self.events.append(MultisigEvent::TransactionExecuted {
            multisig: *multisig,
            transaction: *transaction,
            executor,
            sequence,
            receipt_id: receipt.receipt_id,
        });

        info!(
            multisig = %multisig,
            transaction = %transaction,
            executor = %executor,
            receipt = %receipt.receipt_id,
            "Transaction executed"
        );

        Ok(receipt)
    }

    fn prepare_execution(
        &self,
        executor: &Pubkey,
        multisig: &Pubkey,
        transaction: &Pubkey,
        resources: &[ResourceRef],
    ) -> Result<(AuthorizedBatch, Vec<ResourceRef>), MultisigError> {
        let registry = self.lookup_registry(multisig)?;
        let record = self.lookup_transaction(transaction)?;
        record.ensure_belongs_to(transaction, multisig)?;
        record.ensure_pending(transaction)?;

        let approvals = record.approvals().len();
        if !registry.quorum_reached(approvals) {
            return Err(MultisigError::QuorumNotMet {
                approvals,
                threshold: registry.threshold(),
            });
        }

        let authority = self.authority_of(multisig, registry)?;
        let batch = AuthorizedBatch::build(
            *multisig,
            *transaction,
            *executor,
            authority,
            record.payload(),
        );
        let resolved = resolve_resources(&batch, resources)?;
        Ok((batch, resolved))
    }
}
