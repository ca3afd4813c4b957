//! Claim resolution.
//!
//! Driven by two governance events: claim-proposal submission secures
//! collateral across every provider, and the final outcome either pays
//! the beneficiary from the locked collateral or restores the shield.
//!
//! Invariants enforced here:
//! 1. `total_claimed` always equals the sum of provider locks.
//! 2. `total_claimed` never exceeds `total_collateral`; a violation is a
//!    bookkeeping bug and panics instead of clamping.
//! 3. Provider iteration is ascending by address, so locking is
//!    reproducible across replicas.
//! 4. A purchase under claim never expires before the vote concludes:
//!    its deletion time is extended, never shortened.

use log::info;
use num_rational::Ratio;
use shield_core::{
    mul_div_floor, Address, Amount, BankCollaborator, BlockCtx, PoolPurchaser, ShieldError,
    StakingCollaborator,
};

use crate::engine::ShieldEngine;

impl<B: BankCollaborator, S: StakingCollaborator> ShieldEngine<B, S> {
    /// Secure collateral for a submitted claim proposal. Runs within the
    /// same atomic transaction as the submission, so an insufficiently
    /// collateralized claim is rejected before a vote ever starts.
    #[allow(clippy::too_many_arguments)]
    pub fn secure_collaterals(
        &mut self,
        ctx: &BlockCtx,
        proposal_id: u64,
        pool_id: u64,
        purchaser: &Address,
        purchase_id: u64,
        loss: Amount,
        lock_duration: u64,
    ) -> Result<(), ShieldError> {
        let purchaser = purchaser.clone();
        self.transactional(|eng| {
            eng.secure_collaterals_inner(
                ctx,
                proposal_id,
                pool_id,
                &purchaser,
                purchase_id,
                loss,
                lock_duration,
            )
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn secure_collaterals_inner(
        &mut self,
        ctx: &BlockCtx,
        proposal_id: u64,
        pool_id: u64,
        purchaser: &Address,
        purchase_id: u64,
        loss: Amount,
        lock_duration: u64,
    ) -> Result<(), ShieldError> {
        if loss == 0 {
            return Err(ShieldError::InvalidAmount);
        }
        let pool = self
            .state
            .pools
            .get(&pool_id)
            .ok_or(ShieldError::NoSuchPool(pool_id))?;
        if loss > pool.total_shield_issued {
            return Err(ShieldError::InsufficientShield);
        }
        let key = (pool_id, purchaser.clone());
        let entry = self
            .state
            .purchase_lists
            .get(&key)
            .and_then(|list| list.entries.iter().find(|e| e.purchase_id == purchase_id))
            .ok_or(ShieldError::NoSuchPurchase(purchase_id))?;
        if loss > entry.shield {
            return Err(ShieldError::InsufficientShield);
        }
        let old_deletion_time = entry.deletion_time;

        let total_collateral = self.state.total_collateral;
        let claimed_after = self.state.total_claimed.saturating_add(loss);
        if claimed_after > total_collateral {
            panic!(
                "total claimed {claimed_after} surpassed total collateral {total_collateral}"
            );
        }

        // Secure the updated loss ratio from each provider, ascending by
        // address. Each provider's cumulative obligation is the ceiling
        // of its collateral share; the new lock is the increment over
        // what previous claims already hold.
        let loss_ratio: Ratio<u128> = Ratio::new(claimed_after, total_collateral);
        let addresses: Vec<Address> = self.state.providers.keys().cloned().collect();
        for address in addresses {
            let record = &self.state.providers[&address];
            let obligation = (Ratio::from_integer(record.collateral) * loss_ratio)
                .ceil()
                .to_integer();
            let new_lock = obligation.saturating_sub(record.locked);
            if new_lock == 0 {
                continue;
            }
            self.secure_from_provider(ctx, &address, new_lock, proposal_id, lock_duration)?;
            self.state.total_claimed += new_lock;
        }

        // Update purchase state: burn the shield under claim and keep the
        // purchase alive until the vote can conclude.
        let vote_end_time = ctx.time + lock_duration;
        let list = self
            .state
            .purchase_lists
            .get_mut(&key)
            .expect("purchase checked above");
        let entry = list
            .entries
            .iter_mut()
            .find(|e| e.purchase_id == purchase_id)
            .expect("purchase checked above");
        entry.shield -= loss;
        if entry.deletion_time < vote_end_time {
            entry.deletion_time = vote_end_time;
            let reference = PoolPurchaser {
                pool_id,
                purchaser: purchaser.clone(),
            };
            self.state.dequeue_purchase(old_deletion_time, &reference);
            self.state.enqueue_purchase(vote_end_time, reference);
        }

        let pool = self
            .state
            .pools
            .get_mut(&pool_id)
            .expect("pool checked above");
        pool.total_shield_issued -= loss;
        self.state.total_shield -= loss;

        info!(
            "secured {} against proposal {} (pool {}, purchase {})",
            loss, proposal_id, pool_id, purchase_id
        );
        Ok(())
    }

    /// Lock `amount` of one provider's collateral for a proposal. When
    /// the bonded delegation no longer covers the provider's total locks,
    /// withdrawals are delayed so the collateral stays deposited through
    /// the lock period.
    fn secure_from_provider(
        &mut self,
        ctx: &BlockCtx,
        provider: &Address,
        amount: Amount,
        proposal_id: u64,
        lock_duration: u64,
    ) -> Result<(), ShieldError> {
        let record = &self.state.providers[provider];
        let required = record.locked.saturating_add(amount);
        if record.delegation_bonded < required {
            // Lenient check: non-withdrawing collateral may already cover
            // the requirement.
            if required > record.collateral.saturating_sub(record.withdrawing) {
                // Strict check: count only collateral that remains
                // deposited until the lock period ends.
                let end_time = ctx.time + lock_duration;
                let upcoming = self.compute_withdraw_amount_by_time(provider, end_time);
                let record = &self.state.providers[provider];
                let available = record.collateral.saturating_sub(upcoming);
                if required > available {
                    self.delay_withdraws_inner(ctx, provider, required - available, lock_duration)?;
                }
            }
        }
        let record = self
            .state
            .providers
            .get_mut(provider)
            .expect("provider exists");
        record.locked += amount;
        *record.locked_by_proposal.entry(proposal_id).or_insert(0) += amount;
        Ok(())
    }

    /// Pay an approved claim from the collateral locked under the
    /// proposal. `amount` may be an approved sub-amount of the original
    /// loss. Providers fund the payout pro-rata to their secured
    /// obligation; all of their locks under the proposal are released.
    pub fn payout_claim(
        &mut self,
        _ctx: &BlockCtx,
        proposal_id: u64,
        beneficiary: &Address,
        amount: Amount,
    ) -> Result<(), ShieldError> {
        if amount == 0 {
            return Err(ShieldError::InvalidAmount);
        }
        let locks: Vec<(Address, Amount)> = self
            .state
            .providers
            .iter()
            .filter_map(|(address, record)| {
                record
                    .locked_by_proposal
                    .get(&proposal_id)
                    .map(|locked| (address.clone(), *locked))
            })
            .collect();
        let total_locked: Amount = locks.iter().map(|(_, locked)| *locked).sum();
        if total_locked == 0 {
            return Err(ShieldError::NoSuchProposal(proposal_id));
        }
        if amount > total_locked {
            return Err(ShieldError::NotEnoughCollateral);
        }

        // Bank first: a failed transfer aborts with no state change.
        self.bank.transfer_from_module(beneficiary, amount)?;

        // Floor shares, then hand out the rounding remainder one unit at
        // a time in ascending address order, never beyond a lock.
        let mut shares: Vec<Amount> = locks
            .iter()
            .map(|(_, locked)| mul_div_floor(*locked, amount, total_locked))
            .collect();
        let mut remainder = amount - shares.iter().sum::<Amount>();
        for (index, (_, locked)) in locks.iter().enumerate() {
            if remainder == 0 {
                break;
            }
            let take = remainder.min(locked - shares[index]);
            shares[index] += take;
            remainder -= take;
        }

        for ((address, locked), share) in locks.iter().zip(shares) {
            let record = self
                .state
                .providers
                .get_mut(address)
                .expect("lock holder exists");
            record.collateral -= share;
            record.locked -= locked;
            record.locked_by_proposal.remove(&proposal_id);
        }
        self.state.total_collateral -= amount;
        self.state.total_claimed -= total_locked;

        info!(
            "paid out {} to {} for proposal {} ({} locked released)",
            amount, beneficiary, proposal_id, total_locked
        );
        self.state.assert_invariants();
        Ok(())
    }

    /// Reverse the shield-side bookkeeping after a rejected or expired
    /// claim and release every lock held under the proposal back into
    /// unlocked collateral. Providers who still want to withdraw must
    /// request again.
    pub fn restore_shield(
        &mut self,
        _ctx: &BlockCtx,
        proposal_id: u64,
        pool_id: u64,
        purchaser: &Address,
        purchase_id: u64,
        loss: Amount,
    ) -> Result<(), ShieldError> {
        let key = (pool_id, purchaser.clone());
        if !self.state.pools.contains_key(&pool_id) {
            return Err(ShieldError::NoSuchPool(pool_id));
        }
        let exists = self
            .state
            .purchase_lists
            .get(&key)
            .map(|list| list.entries.iter().any(|e| e.purchase_id == purchase_id))
            .unwrap_or(false);
        if !exists {
            return Err(ShieldError::NoSuchPurchase(purchase_id));
        }

        for record in self.state.providers.values_mut() {
            if let Some(locked) = record.locked_by_proposal.remove(&proposal_id) {
                record.locked -= locked;
                self.state.total_claimed -= locked;
            }
        }

        let list = self
            .state
            .purchase_lists
            .get_mut(&key)
            .expect("checked above");
        let entry = list
            .entries
            .iter_mut()
            .find(|e| e.purchase_id == purchase_id)
            .expect("checked above");
        entry.shield += loss;
        let pool = self.state.pools.get_mut(&pool_id).expect("checked above");
        pool.total_shield_issued += loss;
        self.state.total_shield += loss;

        info!(
            "restored {} shield after proposal {} (pool {}, purchase {})",
            loss, proposal_id, pool_id, purchase_id
        );
        self.state.assert_invariants();
        Ok(())
    }
}
