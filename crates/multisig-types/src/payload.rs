use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pubkey::Pubkey;

/// What an account slot in an action points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountReference {
    /// The multisig's derived signing authority, filled in at execution.
    Authority,
    /// A concrete account.
    Key(Pubkey),
}

/// One `(reference, is_signer, is_writable)` triple of an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountRef {
    pub reference: AccountReference,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountRef {
    pub fn new(key: Pubkey, is_signer: bool, is_writable: bool) -> Self {
        Self {
            reference: AccountReference::Key(key),
            is_signer,
            is_writable,
        }
    }

    pub fn readonly(key: Pubkey) -> Self {
        Self::new(key, false, false)
    }

    pub fn writable(key: Pubkey) -> Self {
        Self::new(key, false, true)
    }

    /// The multisig authority as a writable signer.
    pub fn authority() -> Self {
        Self {
            reference: AccountReference::Authority,
            is_signer: true,
            is_writable: true,
        }
    }

    /// The concrete key, if this slot does not name the authority symbolically.
    pub fn key(&self) -> Option<Pubkey> {
        match self.reference {
            AccountReference::Authority => None,
            AccountReference::Key(key) => Some(key),
        }
    }
}

/// One opaque action: a target, its ordered accounts, and a data blob.
///
/// The gate never interprets `target` or `data`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub target: Pubkey,
    pub accounts: Vec<AccountRef>,
    pub data: Vec<u8>,
}

impl Action {
    pub fn new(target: Pubkey, accounts: Vec<AccountRef>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            target,
            accounts,
            data: data.into(),
        }
    }
}

/// Size limits a payload must respect before it can be proposed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadLimits {
    pub max_actions: usize,
    pub max_accounts_per_action: usize,
    pub max_data_len: usize,
}

impl Default for PayloadLimits {
    fn default() -> Self {
        Self {
            max_actions: 5,
            max_accounts_per_action: 15,
            max_data_len: 1232,
        }
    }
}

/// Reasons a payload is rejected at proposal time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload contains no actions")]
    Empty,

    #[error("payload has {count} actions (maximum {max})")]
    TooManyActions { count: usize, max: usize },

    #[error("action {index} references {count} accounts (maximum {max})")]
    TooManyAccounts {
        index: usize,
        count: usize,
        max: usize,
    },

    #[error("action {index} carries {len} data bytes (maximum {max})")]
    DataTooLong { index: usize, len: usize, max: usize },
}

/// The ordered batch of actions a transaction executes atomically.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPayload {
    pub actions: Vec<Action>,
}

impl TransactionPayload {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    pub fn single(action: Action) -> Self {
        Self {
            actions: vec![action],
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Check the payload against `limits`.
    pub fn validate(&self, limits: &PayloadLimits) -> Result<(), PayloadError> {
        if self.actions.is_empty() {
            return Err(PayloadError::Empty);
        }
        if self.actions.len() > limits.max_actions {
            return Err(PayloadError::TooManyActions {
                count: self.actions.len(),
                max: limits.max_actions,
            });
        }

        for (index, action) in self.actions.iter().enumerate() {
            if action.accounts.len() > limits.max_accounts_per_action {
                return Err(PayloadError::TooManyAccounts {
                    index,
                    count: action.accounts.len(),
                    max: limits.max_accounts_per_action,
                });
            }
            if action.data.len() > limits.max_data_len {
                return Err(PayloadError::DataTooLong {
                    index,
                    len: action.data.len(),
                    max: limits.max_data_len,
                });
            }
        }
        Ok(())
    }
}

impl From<Action> for TransactionPayload {
    fn from(action: Action) -> Self {
        Self::single(action)
    }
}
