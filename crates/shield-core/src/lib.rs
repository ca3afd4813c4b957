//! Core building blocks for the shield coverage system.
//!
//! This crate holds everything the engine crate and its callers share:
//! - primitive aliases and the ambient [`BlockCtx`] every operation receives
//! - the persisted entities (pools, providers, purchases, withdrawals)
//! - module parameters with validation
//! - the error taxonomy
//! - collaborator contracts for the bank and staking modules, with
//!   in-memory reference implementations for tests

pub mod collaborators;
pub mod entities;
pub mod errors;
pub mod params;
pub mod types;

// Re-export key types for easy access
pub use collaborators::{
    BankCollaborator, CollaboratorError, InMemoryBank, StakingCollaborator, StaticStaking,
    UnbondingReport,
};
pub use entities::{
    Pool, PoolPurchaser, Provider, Purchase, PurchaseList, UnbondingInfo, Withdraw,
};
pub use errors::ShieldError;
pub use params::ShieldParams;
pub use types::{fingerprint, mul_div_ceil, mul_div_floor, Address, Amount, BlockCtx, DecAmount, Timestamp};
