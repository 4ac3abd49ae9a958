use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use multisig_types::Pubkey;

use crate::error::ExecutionError;
use crate::execution::{AuthorizedBatch, ExecutionReceipt, ResourceRef};
use crate::traits::ActionExecutor;

/// Mock executor that records every batch it is handed.
///
/// Can be configured to succeed or to fail every call with a fixed error.
pub struct RecordingExecutor {
    failure: Option<ExecutionError>,
    batches: Mutex<Vec<AuthorizedBatch>>,
}

impl RecordingExecutor {
    pub fn succeeding() -> Self {
        Self {
            failure: None,
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ExecutionError) -> Self {
        Self {
            failure: Some(error),
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Batches seen so far, failed ones included.
    pub fn batches(&self) -> Vec<AuthorizedBatch> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn calls(&self) -> usize {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl ActionExecutor for RecordingExecutor {
    async fn execute(
        &self,
        batch: &AuthorizedBatch,
        _resources: &[ResourceRef],
    ) -> Result<ExecutionReceipt, ExecutionError> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(batch.clone());

        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(ExecutionReceipt::new(batch.actions.len())),
        }
    }
}

/// Mock executor that moves balances between accounts.
///
/// Each action is a transfer: `data` is a little-endian `u64` amount,
/// `accounts[0]` is the source and `accounts[1]` the destination. The source
/// must sign. The only signatures available are the requesting executor's
/// own and the batch authority's, and the latter only if it verifies.
///
/// Transfers apply to a working copy that replaces the ledger only when
/// every action succeeded.
#[derive(Default)]
pub struct MockTransferExecutor {
    balances: Mutex<HashMap<Pubkey, u64>>,
    executions: Mutex<usize>,
}

impl MockTransferExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fund(&self, account: Pubkey, amount: u64) {
        let mut balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        let balance = balances.entry(account).or_default();
        *balance = balance.saturating_add(amount);
    }

    pub fn balance(&self, account: &Pubkey) -> u64 {
        self.balances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(account)
            .copied()
            .unwrap_or(0)
    }

    /// Number of batches that were applied.
    pub fn executions(&self) -> usize {
        *self.executions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_signers(batch: &AuthorizedBatch) -> Result<(), ExecutionError> {
        for account in batch.accounts().filter(|a| a.is_signer) {
            if account.is_authority {
                if account.key != batch.authority.address() || !batch.authority.verify() {
                    return Err(ExecutionError::InvalidAuthority(account.key));
                }
            } else if account.key != batch.executor {
                return Err(ExecutionError::MissingSignature(account.key));
            }
        }
        Ok(())
    }

    fn check_writable(
        batch: &AuthorizedBatch,
        resources: &[ResourceRef],
    ) -> Result<(), ExecutionError> {
        for (index, action) in batch.actions.iter().enumerate() {
            for account in action.accounts.iter().filter(|a| a.is_writable && !a.is_authority) {
                let writable = resources
                    .iter()
                    .any(|r| r.key == account.key && r.is_writable);
                if !writable {
                    return Err(ExecutionError::ActionRejected {
                        index,
                        reason: format!("account {} not supplied as writable", account.key.short_id()),
                    });
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ActionExecutor for MockTransferExecutor {
    async fn execute(
        &self,
        batch: &AuthorizedBatch,
        resources: &[ResourceRef],
    ) -> Result<ExecutionReceipt, ExecutionError> {
        Self::check_signers(batch)?;
        Self::check_writable(batch, resources)?;

        let mut balances = self
            .balances
            .lock()
            .map_err(|_| ExecutionError::Unavailable("balance ledger poisoned".into()))?;
        let mut working = balances.clone();

        for (index, action) in batch.actions.iter().enumerate() {
            let (source, destination) = match action.accounts.as_slice() {
                [source, destination, ..] => (source, destination),
                _ => {
                    return Err(ExecutionError::ActionRejected {
                        index,
                        reason: "transfer needs a source and a destination".into(),
                    })
                }
            };
            if !source.is_signer {
                return Err(ExecutionError::MissingSignature(source.key));
            }
            let amount = <[u8; 8]>::try_from(action.data.as_slice())
                .map(u64::from_le_bytes)
                .map_err(|_| ExecutionError::ActionRejected {
                    index,
                    reason: format!("expected 8 data bytes, got {}", action.data.len()),
                })?;

            let available = working.get(&source.key).copied().unwrap_or(0);
            if available < amount {
                return Err(ExecutionError::InsufficientFunds {
                    account: source.key,
                    required: amount,
                    available,
                });
            }
            working.insert(source.key, available - amount);
            let credited = working.entry(destination.key).or_default();
            *credited = credited.saturating_add(amount);
        }

        *balances = working;
        drop(balances);
        *self.executions.lock().unwrap_or_else(PoisonError::into_inner) += 1;

        Ok(ExecutionReceipt::new(batch.actions.len()))
    }
}
