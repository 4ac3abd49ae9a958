use multisig_types::Pubkey;
use serde::{Deserialize, Serialize};

/// An identity the platform has already authenticated.
///
/// The gate performs no signature verification of its own. Whatever sits
/// in front of it (transaction runtime, RPC layer) checks the request
/// signature and hands the verified key over as a `Caller`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Caller(Pubkey);

impl Caller {
    pub fn authenticated(key: Pubkey) -> Self {
        Self(key)
    }

    pub fn key(&self) -> &Pubkey {
        &self.0
    }
}

impl std::fmt::Display for Caller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "caller:{}", self.0.short_id())
    }
}
