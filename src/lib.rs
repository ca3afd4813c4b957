//! Shield: collateral-backed coverage pools with vote-gated claim resolution.
//!
//! This façade crate re-exports the workspace members. Most users want
//! [`shield_engine::ShieldEngine`] together with the entity and parameter
//! types from [`shield_core`].

pub use shield_core;
pub use shield_engine;

pub use shield_core::{Address, Amount, BlockCtx, DecAmount, ShieldError, ShieldParams, Timestamp};
pub use shield_engine::{ProposalRouter, ShieldEngine, ShieldState};
