//! Purchase ledger: buying shield and the per-block expiry sweep.

use log::info;
use shield_core::{
    mul_div_floor, Address, Amount, BankCollaborator, BlockCtx, DecAmount, PoolPurchaser,
    Purchase, PurchaseList, ShieldError, StakingCollaborator,
};

use crate::engine::ShieldEngine;

impl<B: BankCollaborator, S: StakingCollaborator> ShieldEngine<B, S> {
    /// Purchase shield against an active pool. Charges the premium
    /// through the bank and credits it to the pending service fees.
    pub fn purchase_shield(
        &mut self,
        ctx: &BlockCtx,
        purchaser: &Address,
        pool_id: u64,
        amount: Amount,
        description: String,
    ) -> Result<Purchase, ShieldError> {
        if amount == 0 {
            return Err(ShieldError::InvalidAmount);
        }
        if description.is_empty() {
            return Err(ShieldError::PurchaseMissingDescription);
        }
        if amount < self.params.min_purchase_amount {
            return Err(ShieldError::PurchaseTooSmall);
        }
        let pool = self
            .state
            .pools
            .get(&pool_id)
            .ok_or(ShieldError::NoSuchPool(pool_id))?;
        if !pool.active {
            return Err(ShieldError::PoolInactive(pool_id));
        }
        if pool.total_shield_issued.saturating_add(amount) > pool.shield_limit {
            return Err(ShieldError::PoolShieldLimitExceeded(pool_id));
        }
        // New shield must be backed by collateral that is neither already
        // promised to shield and claims nor on its way out the door.
        let headroom = self
            .state
            .total_collateral
            .saturating_sub(self.state.total_withdrawing);
        if self
            .state
            .total_shield
            .saturating_add(self.state.total_claimed)
            .saturating_add(amount)
            > headroom
        {
            return Err(ShieldError::NotEnoughCollateral);
        }

        let premium = mul_div_floor(amount, self.params.shield_fee_rate.raw(), DecAmount::SCALE);
        if premium == 0 {
            return Err(ShieldError::PurchaseTooSmall);
        }
        self.bank.transfer_to_module(purchaser, premium)?;

        let purchase_id = self.state.next_purchase_id;
        self.state.next_purchase_id += 1;
        let protection_end_time = ctx.time + self.params.protection_period_secs;
        let deletion_time = protection_end_time + self.params.claim_window_secs;
        let purchase = Purchase {
            purchase_id,
            shield: amount,
            protection_end_time,
            deletion_time,
            description,
            service_fees: DecAmount::from_int(premium),
        };

        let key = (pool_id, purchaser.clone());
        self.state
            .purchase_lists
            .entry(key)
            .or_insert_with(|| PurchaseList::new(pool_id, purchaser.clone()))
            .entries
            .push(purchase.clone());
        self.state.enqueue_purchase(
            deletion_time,
            PoolPurchaser {
                pool_id,
                purchaser: purchaser.clone(),
            },
        );

        let pool = self
            .state
            .pools
            .get_mut(&pool_id)
            .expect("pool checked above");
        pool.total_shield_issued += amount;
        self.state.total_shield += amount;
        self.state.pending_service_fees = self
            .state
            .pending_service_fees
            .add(DecAmount::from_int(premium));

        info!(
            "purchase {purchase_id}: {purchaser} bought {amount} shield in pool {pool_id}, \
             premium {premium}, protected until {protection_end_time}"
        );
        Ok(purchase)
    }

    pub fn get_purchase_list(&self, pool_id: u64, purchaser: &Address) -> Option<&PurchaseList> {
        self.state.purchase_lists.get(&(pool_id, purchaser.clone()))
    }

    pub fn get_purchase(
        &self,
        pool_id: u64,
        purchaser: &Address,
        purchase_id: u64,
    ) -> Option<&Purchase> {
        self.get_purchase_list(pool_id, purchaser)?
            .entries
            .iter()
            .find(|e| e.purchase_id == purchase_id)
    }

    /// Remove every purchase entry whose deletion time has passed,
    /// freeing its shield capacity. The only path that permanently frees
    /// expired coverage. Idempotent for a fixed `now`.
    pub fn expire_purchases(&mut self, ctx: &BlockCtx) {
        let due: Vec<_> = self
            .state
            .purchase_queue
            .range(..=ctx.time)
            .map(|(t, _)| *t)
            .collect();
        for time in due {
            let references = self.state.purchase_queue.remove(&time).unwrap_or_default();
            for reference in references {
                let key = (reference.pool_id, reference.purchaser.clone());
                let Some(list) = self.state.purchase_lists.get_mut(&key) else {
                    continue;
                };
                let mut freed: Amount = 0;
                list.entries.retain(|entry| {
                    if entry.deletion_time <= ctx.time {
                        freed += entry.shield;
                        false
                    } else {
                        true
                    }
                });
                if list.entries.is_empty() {
                    self.state.purchase_lists.remove(&key);
                }
                if freed > 0 {
                    if let Some(pool) = self.state.pools.get_mut(&reference.pool_id) {
                        pool.total_shield_issued = pool.total_shield_issued.saturating_sub(freed);
                    }
                    self.state.total_shield = self.state.total_shield.saturating_sub(freed);
                    info!(
                        "expired {} shield for {} in pool {}",
                        freed, reference.purchaser, reference.pool_id
                    );
                }
            }
        }
    }
}
