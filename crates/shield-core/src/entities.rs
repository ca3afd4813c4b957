//! Persisted entities of the shield system.
//!
//! Invariants maintained by the engine, never by these types themselves:
//! - pool: `total_shield_issued <= shield_limit`
//! - provider: `collateral <= delegation_bonded`,
//!   `locked == sum(locked_by_proposal)`, `withdrawing <= collateral - locked`
//! - purchase: `deletion_time >= protection_end_time`

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, DecAmount, Timestamp};

/// A sponsor's coverage offering with a shield issuance limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Pool id, immutable once assigned.
    pub id: u64,
    /// Project name of the sponsor.
    pub sponsor: String,
    /// Chain address of the sponsor.
    pub sponsor_address: Address,
    /// Terms of the pool.
    pub description: String,
    /// Inactive pools block new purchases only; existing coverage and
    /// withdrawals are unaffected.
    pub active: bool,
    /// Maximum shield that may be outstanding against this pool.
    pub shield_limit: Amount,
    /// Shield currently outstanding across all active purchases.
    pub total_shield_issued: Amount,
}

impl Pool {
    pub fn new(
        id: u64,
        sponsor: String,
        sponsor_address: Address,
        description: String,
        shield_limit: Amount,
    ) -> Self {
        Pool {
            id,
            sponsor,
            sponsor_address,
            description,
            active: true,
            shield_limit,
            total_shield_issued: 0,
        }
    }
}

/// A collateral provider backed by bonded delegation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Chain address of the provider.
    pub address: Address,
    /// Bonded delegation reported by the staking module.
    pub delegation_bonded: Amount,
    /// All deposited collateral, including amounts in the withdraw queue,
    /// excluding nothing; locked and withdrawing are carved out of this.
    pub collateral: Amount,
    /// Collateral reserved for pending claim proposals.
    pub locked: Amount,
    /// Locked amounts broken down by claim proposal id.
    pub locked_by_proposal: BTreeMap<u64, Amount>,
    /// Collateral sitting in the withdraw queue.
    pub withdrawing: Amount,
    /// Accumulated service-fee rewards, fractional parts included.
    pub rewards: DecAmount,
}

impl Provider {
    pub fn new(address: Address, delegation_bonded: Amount) -> Self {
        Provider {
            address,
            delegation_bonded,
            collateral: 0,
            locked: 0,
            locked_by_proposal: BTreeMap::new(),
            withdrawing: 0,
            rewards: DecAmount::zero(),
        }
    }

    /// Collateral not reserved for claims and not queued for withdrawal.
    pub fn unlocked_collateral(&self) -> Amount {
        self.collateral
            .saturating_sub(self.locked)
            .saturating_sub(self.withdrawing)
    }
}

/// An individual purchase of shield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    /// Purchase id, globally unique across pools.
    pub purchase_id: u64,
    /// Unused shield remaining on this purchase.
    pub shield: Amount,
    /// When protection ends.
    pub protection_end_time: Timestamp,
    /// When the entry leaves the expiry queue. Deferred past the
    /// protection end so a claim can still be filed and voted.
    pub deletion_time: Timestamp,
    /// Information about the protected asset.
    pub description: String,
    /// Premium paid for this purchase.
    pub service_fees: DecAmount,
}

/// All purchases by one purchaser in one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseList {
    pub pool_id: u64,
    pub purchaser: Address,
    pub entries: Vec<Purchase>,
}

impl PurchaseList {
    pub fn new(pool_id: u64, purchaser: Address) -> Self {
        PurchaseList {
            pool_id,
            purchaser,
            entries: Vec::new(),
        }
    }
}

/// Key of a purchase list, used by the time-indexed expiry queue.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolPurchaser {
    pub pool_id: u64,
    pub purchaser: Address,
}

/// An ongoing withdrawal of collateral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdraw {
    /// Provider withdrawing.
    pub address: Address,
    /// Amount being withdrawn.
    pub amount: Amount,
    /// Scheduled completion time; claims may push this out.
    pub completion_time: Timestamp,
    /// Present when the withdrawal was triggered by an unbonding in the
    /// staking module; the two schedules must never diverge.
    pub linked_unbonding: Option<UnbondingInfo>,
}

/// The staking-side unbonding a withdrawal is linked to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingInfo {
    pub validator_address: Address,
    pub completion_time: Timestamp,
    pub confirmed: bool,
}
