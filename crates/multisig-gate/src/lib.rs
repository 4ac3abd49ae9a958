//! Multisig Quorum Gate: M-of-N authorization for opaque action batches.
//!
//! A set of owners jointly controls a keyless signing authority. Any owner
//! may propose a batch of actions; each proposal carries an ordered, unique
//! approval set; once approvals reach the threshold anyone may execute the
//! batch, exactly once, with the derived authority acting as signer.
//!
//! ## Invariants
//!
//! - **Owner set**: non-empty, duplicate-free, immutable after creation.
//! - **Threshold**: `1 <= threshold <= owners`, immutable after creation.
//! - **Approvals**: always a subset of the owners, never duplicated.
//! - **Single execution**: `executed` flips once and is never reset.
//! - **Quorum before effect**: the executor is only called with
//!   `approvals >= threshold`, and a record is marked executed only after
//!   the executor succeeded.
//! - **Fail without effect**: every rejected operation leaves the store and
//!   the event log unchanged.
//!
//! ## Lifecycle
//!
//! 1. **Create**: registry stored at the creator's derived address, sequence 0
//! 2. **Propose**: record stored at `(multisig, sequence)`, proposer approves
//! 3. **Approve / Remove**: owners add or withdraw their approval
//! 4. **Execute**: authority substituted, batch handed to the
//!    [`ActionExecutor`], record marked executed

#![deny(unsafe_code)]

mod approval;
pub mod approvals;
pub mod caller;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod execution;
pub mod mocks;
mod proposal;
pub mod registry;
pub mod service;
pub mod store;
pub mod traits;
pub mod transaction;

pub use approvals::ApprovalSet;
pub use caller::Caller;
pub use config::EngineConfig;
pub use engine::MultisigEngine;
pub use error::{ConfigError, ExecutionError, MultisigError};
pub use events::{EventFilter, EventKind, EventLog, MultisigEvent, RecordedEvent};
pub use execution::{
    resolve_resources, AuthorizedAction, AuthorizedBatch, ExecutionReceipt, ResolvedAccount,
    ResourceRef,
};
pub use mocks::{MockTransferExecutor, RecordingExecutor};
pub use registry::MultisigRegistry;
pub use service::MultisigService;
pub use store::{AccountStore, StoredAccount};
pub use traits::ActionExecutor;
pub use transaction::TransactionRecord;
