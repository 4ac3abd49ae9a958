use std::collections::HashSet;

use multisig_types::Pubkey;
use serde::{Deserialize, Serialize};

/// Insertion-ordered, duplicate-free set of approving owners.
///
/// Entries are only ever appended or removed by value; removal keeps the
/// relative order of the rest. Serialized as the plain ordered list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Pubkey>", into = "Vec<Pubkey>")]
pub struct ApprovalSet {
    order: Vec<Pubkey>,
    members: HashSet<Pubkey>,
}

impl ApprovalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding exactly `first`.
    pub fn with_first(first: Pubkey) -> Self {
        let mut set = Self::new();
        set.insert(first);
        set
    }

    pub fn contains(&self, key: &Pubkey) -> bool {
        self.members.contains(key)
    }

    /// Append `key`. Returns false if it was already present.
    pub fn insert(&mut self, key: Pubkey) -> bool {
        if !self.members.insert(key) {
            return false;
        }
        self.order.push(key);
        true
    }

    /// Remove `key`, keeping the order of the remaining entries.
    /// Returns false if it was not present.
    pub fn remove(&mut self, key: &Pubkey) -> bool {
        if !self.members.remove(key) {
            return false;
        }
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn as_slice(&self) -> &[Pubkey] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pubkey> {
        self.order.iter()
    }
}

impl From<Vec<Pubkey>> for ApprovalSet {
    /// Later duplicates are dropped; the first occurrence keeps its place.
    fn from(keys: Vec<Pubkey>) -> Self {
        let mut set = Self::new();
        for key in keys {
            set.insert(key);
        }
        set
    }
}

impl From<ApprovalSet> for Vec<Pubkey> {
    fn from(set: ApprovalSet) -> Self {
        set.order
    }
}
