//! Error taxonomy of the shield module.
//!
//! Validation and business-rule errors are rejected before any state
//! mutation. Collaborator failures are wrapped unchanged. Invariant
//! violations are not represented here: they are programming errors and
//! the engine panics on them instead of returning a value.

use thiserror::Error;

use crate::collaborators::CollaboratorError;
use crate::types::Address;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShieldError {
    #[error("not the shield admin account")]
    NotAuthorized,

    #[error("a pool already exists under sponsor {0}")]
    DuplicateSponsor(String),

    #[error("no pool found with id {0}")]
    NoSuchPool(u64),

    #[error("no pool found for sponsor {0}")]
    NoPoolForSponsor(String),

    #[error("pool {0} is already paused")]
    PoolAlreadyPaused(u64),

    #[error("pool {0} is already active")]
    PoolAlreadyActive(u64),

    #[error("pool {0} is inactive")]
    PoolInactive(u64),

    #[error("pool {0} shield exceeds its limit")]
    PoolShieldLimitExceeded(u64),

    #[error("pool {0} still has outstanding purchases")]
    PoolNotClosable(u64),

    #[error("not enough unused collateral backing the pool set")]
    NotEnoughCollateral,

    #[error("insufficient bonded delegation to back the collateral")]
    InsufficientStake,

    #[error("insufficient unlocked collateral")]
    InsufficientUnlockedCollateral,

    #[error("withdrawal would leave issued shield unbacked")]
    OverWithdraw,

    #[error("provider {0} is not found")]
    NoSuchProvider(Address),

    #[error("purchase {0} is not found")]
    NoSuchPurchase(u64),

    #[error("no collateral is locked under proposal {0}")]
    NoSuchProposal(u64),

    #[error("not enough shield remaining on the purchase")]
    InsufficientShield,

    #[error("missing description for the purchase")]
    PurchaseMissingDescription,

    #[error("purchased shield amount is too small")]
    PurchaseTooSmall,

    #[error("linked unbonding is not confirmed by the staking module")]
    UnbondingNotConfirmed,

    #[error("amount must be non-zero")]
    InvalidAmount,

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("no handler registered for the proposal kind")]
    UnknownProposalKind,

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

impl ShieldError {
    /// Stable machine-readable kind, independent of the detail text.
    pub fn kind(&self) -> &'static str {
        match self {
            ShieldError::NotAuthorized => "not_authorized",
            ShieldError::DuplicateSponsor(_) => "duplicate_sponsor",
            ShieldError::NoSuchPool(_) => "no_such_pool",
            ShieldError::NoPoolForSponsor(_) => "no_pool_for_sponsor",
            ShieldError::PoolAlreadyPaused(_) => "pool_already_paused",
            ShieldError::PoolAlreadyActive(_) => "pool_already_active",
            ShieldError::PoolInactive(_) => "pool_inactive",
            ShieldError::PoolShieldLimitExceeded(_) => "pool_shield_limit_exceeded",
            ShieldError::PoolNotClosable(_) => "pool_not_closable",
            ShieldError::NotEnoughCollateral => "not_enough_collateral",
            ShieldError::InsufficientStake => "insufficient_stake",
            ShieldError::InsufficientUnlockedCollateral => "insufficient_unlocked_collateral",
            ShieldError::OverWithdraw => "over_withdraw",
            ShieldError::NoSuchProvider(_) => "no_such_provider",
            ShieldError::NoSuchPurchase(_) => "no_such_purchase",
            ShieldError::NoSuchProposal(_) => "no_such_proposal",
            ShieldError::InsufficientShield => "insufficient_shield",
            ShieldError::PurchaseMissingDescription => "purchase_missing_description",
            ShieldError::PurchaseTooSmall => "purchase_too_small",
            ShieldError::UnbondingNotConfirmed => "unbonding_not_confirmed",
            ShieldError::InvalidAmount => "invalid_amount",
            ShieldError::InvalidParams(_) => "invalid_params",
            ShieldError::UnknownProposalKind => "unknown_proposal_kind",
            ShieldError::Collaborator(_) => "collaborator",
        }
    }
}
