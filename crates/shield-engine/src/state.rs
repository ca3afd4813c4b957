//! The persisted state of the shield module.
//!
//! Every collection is a `BTreeMap` so iteration order, serialization, and
//! therefore the state fingerprint are identical across replicas. The two
//! queues are time-indexed: scheduled effects are drained by the per-block
//! sweep, never by timers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use shield_core::{
    fingerprint, Address, Amount, DecAmount, Pool, PoolPurchaser, Provider, PurchaseList,
    Timestamp, Withdraw,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShieldState {
    /// Admin account gating pool lifecycle operations.
    pub admin: Address,
    /// Next pool id to assign; ids start at 1 and are never reused.
    pub next_pool_id: u64,
    /// Next purchase id to assign, global across pools.
    pub next_purchase_id: u64,

    /// Pools by id.
    pub pools: BTreeMap<u64, Pool>,
    /// Providers by address; ascending-address iteration is the
    /// deterministic order every proportional pass uses.
    pub providers: BTreeMap<Address, Provider>,
    /// Purchase lists keyed by (pool id, purchaser).
    pub purchase_lists: BTreeMap<(u64, Address), PurchaseList>,
    /// Expiry queue: deletion time -> purchase lists holding an entry due
    /// at that time.
    pub purchase_queue: BTreeMap<Timestamp, Vec<PoolPurchaser>>,
    /// Withdrawal queue: completion time -> withdrawals due at that time.
    pub withdraw_queue: BTreeMap<Timestamp, Vec<Withdraw>>,

    /// Sum of all provider collateral.
    pub total_collateral: Amount,
    /// Shield outstanding across all active purchases.
    pub total_shield: Amount,
    /// Collateral currently locked for pending claims.
    pub total_claimed: Amount,
    /// Collateral sitting in the withdrawal queue.
    pub total_withdrawing: Amount,
    /// Service fees accumulated and not yet distributed.
    pub pending_service_fees: DecAmount,
}

impl ShieldState {
    pub fn new(admin: Address) -> Self {
        ShieldState {
            admin,
            next_pool_id: 1,
            next_purchase_id: 1,
            pools: BTreeMap::new(),
            providers: BTreeMap::new(),
            purchase_lists: BTreeMap::new(),
            purchase_queue: BTreeMap::new(),
            withdraw_queue: BTreeMap::new(),
            total_collateral: 0,
            total_shield: 0,
            total_claimed: 0,
            total_withdrawing: 0,
            pending_service_fees: DecAmount::zero(),
        }
    }

    /// Deterministic fingerprint of the full module state.
    pub fn fingerprint(&self) -> String {
        fingerprint(self)
    }

    /// Queue a purchase-list reference at a deletion time. One reference
    /// is held per purchase entry.
    pub fn enqueue_purchase(&mut self, time: Timestamp, key: PoolPurchaser) {
        self.purchase_queue.entry(time).or_default().push(key);
    }

    /// Remove one queued reference for the purchase list at the given
    /// time, dropping the slot when it empties.
    pub fn dequeue_purchase(&mut self, time: Timestamp, key: &PoolPurchaser) {
        if let Some(slot) = self.purchase_queue.get_mut(&time) {
            if let Some(pos) = slot.iter().position(|k| k == key) {
                slot.remove(pos);
            }
            if slot.is_empty() {
                self.purchase_queue.remove(&time);
            }
        }
    }

    /// Queue a withdrawal at its completion time.
    pub fn enqueue_withdraw(&mut self, withdraw: Withdraw) {
        self.withdraw_queue
            .entry(withdraw.completion_time)
            .or_default()
            .push(withdraw);
    }

    /// All queued withdrawals for a provider in completion order.
    pub fn withdraws_of(&self, addr: &Address) -> Vec<Withdraw> {
        self.withdraw_queue
            .values()
            .flatten()
            .filter(|w| w.address == *addr)
            .cloned()
            .collect()
    }

    /// Hard global invariants. A violation is a bookkeeping bug that would
    /// corrupt consensus state, so this panics instead of returning.
    pub fn assert_invariants(&self) {
        let locked_sum: Amount = self.providers.values().map(|p| p.locked).sum();
        assert!(
            self.total_claimed <= self.total_collateral,
            "total claimed {} surpassed total collateral {}",
            self.total_claimed,
            self.total_collateral
        );
        assert_eq!(
            self.total_claimed, locked_sum,
            "total claimed diverged from the sum of provider locks"
        );

        let withdrawing_sum: Amount = self.providers.values().map(|p| p.withdrawing).sum();
        debug_assert_eq!(
            self.total_withdrawing, withdrawing_sum,
            "total withdrawing diverged from the sum of provider queues"
        );
        debug_assert!(
            self.total_shield.saturating_add(self.total_claimed) <= self.total_collateral,
            "issued shield is no longer fully backed by collateral"
        );
        for provider in self.providers.values() {
            let by_proposal: Amount = provider.locked_by_proposal.values().sum();
            debug_assert_eq!(
                provider.locked, by_proposal,
                "provider lock diverged from its per-proposal breakdown"
            );
        }
    }
}
