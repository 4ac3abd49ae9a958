use std::collections::BTreeMap;

use multisig_types::Pubkey;
use serde::{Deserialize, Serialize};

use crate::error::MultisigError;
use crate::registry::MultisigRegistry;
use crate::transaction::TransactionRecord;

/// The two record kinds the gate persists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoredAccount {
    Multisig(MultisigRegistry),
    Transaction(TransactionRecord),
}

/// In-memory account store keyed by derived address.
///
/// Stands in for the ledger's account space: records are only ever inserted
/// at a fresh address or mutated in place, never deleted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStore {
    accounts: BTreeMap<Pubkey, StoredAccount>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, address: &Pubkey) -> bool {
        self.accounts.contains_key(address)
    }

    pub fn get(&self, address: &Pubkey) -> Option<&StoredAccount> {
        self.accounts.get(address)
    }

    pub fn registry(&self, address: &Pubkey) -> Option<&MultisigRegistry> {
        match self.accounts.get(address) {
            Some(StoredAccount::Multisig(registry)) => Some(registry),
            _ => None,
        }
    }

    pub fn transaction(&self, address: &Pubkey) -> Option<&TransactionRecord> {
        match self.accounts.get(address) {
            Some(StoredAccount::Transaction(record)) => Some(record),
            _ => None,
        }
    }

    pub(crate) fn registry_mut(&mut self, address: &Pubkey) -> Option<&mut MultisigRegistry> {
        match self.accounts.get_mut(address) {
            Some(StoredAccount::Multisig(registry)) => Some(registry),
            _ => None,
        }
    }

    pub(crate) fn transaction_mut(&mut self, address: &Pubkey) -> Option<&mut TransactionRecord> {
        match self.accounts.get_mut(address) {
            Some(StoredAccount::Transaction(record)) => Some(record),
            _ => None,
        }
    }

    /// Allocate `address`. Fails if anything already lives there.
    pub(crate) fn insert(&mut self, address: Pubkey, account: StoredAccount) -> Result<(), MultisigError> {
        if self.accounts.contains_key(&address) {
            return Err(MultisigError::AlreadyExists(address));
        }
        self.accounts.insert(address, account);
        Ok(())
    }

    /// Iterate over every stored multisig.
    pub fn registries(&self) -> impl Iterator<Item = (&Pubkey, &MultisigRegistry)> {
        self.accounts.iter().filter_map(|(address, account)| match account {
            StoredAccount::Multisig(registry) => Some((address, registry)),
            StoredAccount::Transaction(_) => None,
        })
    }

    /// Iterate over the transactions proposed on `multisig`, in address order.
    pub fn transactions_for<'a>(
        &'a self,
        multisig: &'a Pubkey,
    ) -> impl Iterator<Item = (&'a Pubkey, &'a TransactionRecord)> + 'a {
        self.accounts.iter().filter_map(move |(address, account)| match account {
            StoredAccount::Transaction(record) if record.multisig() == multisig => {
                Some((address, record))
            }
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Canonical serialized form of the whole store.
    ///
    /// Two stores with equal contents always produce identical bytes.
    pub fn snapshot(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
