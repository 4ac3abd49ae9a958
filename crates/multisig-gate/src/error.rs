use multisig_types::{DerivationError, PayloadError, Pubkey};
use thiserror::Error;

/// Errors from the multisig gate.
///
/// Every variant is reported with no state change: a rejected operation
/// leaves the account store exactly as it was before the call.
#[derive(Error, Debug)]
pub enum MultisigError {
    // --- Validation ---
    #[error("invalid owner set: {0}")]
    InvalidOwnerSet(String),

    #[error("invalid threshold {threshold} for {owners} owners")]
    InvalidThreshold { threshold: u64, owners: usize },

    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] PayloadError),

    // --- Authorization ---
    #[error("{0} is not an owner of this multisig")]
    NotAnOwner(Pubkey),

    #[error("{0} has not approved this transaction")]
    NotApproved(Pubkey),

    // --- State conflicts ---
    #[error("account already exists: {0}")]
    AlreadyExists(Pubkey),

    #[error("{0} has already approved this transaction")]
    AlreadyApproved(Pubkey),

    #[error("transaction already executed: {0}")]
    AlreadyExecuted(Pubkey),

    #[error("quorum not met: {approvals} of {threshold} required approvals")]
    QuorumNotMet { approvals: usize, threshold: u64 },

    #[error("proposal sequence exhausted for multisig {0}")]
    SequenceOverflow(Pubkey),

    // --- Lookup ---
    #[error("multisig not found: {0}")]
    RegistryNotFound(Pubkey),

    #[error("transaction not found: {0}")]
    TransactionNotFound(Pubkey),

    #[error("transaction {transaction} does not belong to multisig {multisig}")]
    RegistryMismatch { transaction: Pubkey, multisig: Pubkey },

    #[error("account {0} referenced by the payload was not supplied")]
    MissingAccount(Pubkey),

    // --- Derivation ---
    #[error("stored derivation proof does not reproduce multisig {0}")]
    DerivationMismatch(Pubkey),

    #[error("derivation error: {0}")]
    Derivation(#[from] DerivationError),

    // --- Collaborator ---
    #[error("execution failed: {0}")]
    Execution(#[from] ExecutionError),
}

/// Failures reported by an [`crate::ActionExecutor`].
///
/// Propagated unchanged as [`MultisigError::Execution`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("insufficient funds in {account}: required {required}, available {available}")]
    InsufficientFunds {
        account: Pubkey,
        required: u64,
        available: u64,
    },

    #[error("account {0} must sign but no valid signature was presented")]
    MissingSignature(Pubkey),

    #[error("derived authority {0} failed verification")]
    InvalidAuthority(Pubkey),

    #[error("action {index} rejected: {reason}")]
    ActionRejected { index: usize, reason: String },

    #[error("executor unavailable: {0}")]
    Unavailable(String),
}

/// Errors from loading engine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
