//! Core type definitions for the multisig gate.
//!
//! This crate holds the value types shared by the gate and its clients, and
//! the pure address derivation both sides must agree on. No state, no I/O:
//! a client can compute every registry, transaction and authority address
//! offline before submitting a request.

#![deny(unsafe_code)]

pub mod derivation;
pub mod payload;
pub mod pubkey;

// Re-export primary types at crate root for ergonomic use.
pub use derivation::{
    authority_address, create_program_address, find_program_address, multisig_address,
    transaction_address, DerivationError, DerivationProof, DerivedAuthority, ProgramAddress,
};
pub use payload::{
    AccountRef, AccountReference, Action, PayloadError, PayloadLimits, TransactionPayload,
};
pub use pubkey::{ParsePubkeyError, Pubkey, PUBKEY_BYTES};
