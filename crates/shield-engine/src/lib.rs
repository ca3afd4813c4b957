//! Deterministic state machine for collateral-backed coverage.
//!
//! Providers pledge collateral backed by their bonded delegation,
//! purchasers buy time-boxed shield against a pool, and loss claims lock
//! collateral proportionally across all providers until governance votes.
//! Every operation is a synchronous function of `(state, input, BlockCtx)`
//! and replicas applying the same operations reach byte-identical state.
//!
//! The engine is split by concern the way the periodic hook drives it:
//! - `pool`: coverage pool registry and lifecycle
//! - `provider`: collateral deposits and withdrawal requests
//! - `purchase`: shield purchases and the expiry sweep
//! - `withdraw`: the time-indexed withdrawal scheduler
//! - `claim`: securing, paying out, and restoring around claim proposals
//! - `rewards`: service-fee distribution and payout
//! - `proposal`: the claim proposal payload and its dispatch table

pub mod claim;
pub mod engine;
pub mod pool;
pub mod proposal;
pub mod provider;
pub mod purchase;
pub mod rewards;
pub mod state;
pub mod withdraw;

// Re-export key types for easy access
pub use engine::ShieldEngine;
pub use proposal::{
    ClaimProposal, ProposalKind, ProposalOutcome, ProposalPayload, ProposalRouter,
};
pub use state::ShieldState;
