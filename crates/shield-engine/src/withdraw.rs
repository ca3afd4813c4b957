//! Withdrawal scheduler.
//!
//! Withdrawals live in a completion-time-indexed queue. A pending entry
//! either completes at the per-block sweep or is delayed — repeatedly if
//! needed — when a claim must keep the provider's collateral in place
//! past the original completion time.

use log::{info, warn};
use shield_core::{
    Address, Amount, BankCollaborator, BlockCtx, ShieldError, StakingCollaborator, Timestamp,
    Withdraw,
};

use crate::engine::ShieldEngine;

impl<B: BankCollaborator, S: StakingCollaborator> ShieldEngine<B, S> {
    /// Collateral of the provider that will already have left by `as_of`:
    /// the sum of queued withdrawals completing at or before that time.
    /// Lets the claim engine reason about availability at the moment a
    /// vote concludes, not just today.
    pub fn compute_withdraw_amount_by_time(&self, provider: &Address, as_of: Timestamp) -> Amount {
        self.state
            .withdraw_queue
            .range(..=as_of)
            .flat_map(|(_, slot)| slot.iter())
            .filter(|w| w.address == *provider)
            .map(|w| w.amount)
            .sum()
    }

    /// Delay the provider's earliest-scheduled withdrawals until the
    /// deferred total covers `amount`, pushing each one's completion out
    /// by `duration`. A delayed withdrawal with a linked unbonding needs
    /// the staking module to delay the unbonding as well; a refusal
    /// propagates and the whole operation rolls back.
    pub fn delay_withdraws(
        &mut self,
        ctx: &BlockCtx,
        provider: &Address,
        amount: Amount,
        duration: u64,
    ) -> Result<(), ShieldError> {
        let provider = provider.clone();
        self.transactional(|eng| eng.delay_withdraws_inner(ctx, &provider, amount, duration))
    }

    pub(crate) fn delay_withdraws_inner(
        &mut self,
        _ctx: &BlockCtx,
        provider: &Address,
        amount: Amount,
        duration: u64,
    ) -> Result<(), ShieldError> {
        // Earliest completion first; within a slot, insertion order.
        let mut slots: Vec<(Timestamp, usize)> = Vec::new();
        for (time, slot) in &self.state.withdraw_queue {
            for (index, withdraw) in slot.iter().enumerate() {
                if withdraw.address == *provider {
                    slots.push((*time, index));
                }
            }
        }

        let mut covered: Amount = 0;
        let mut picked: Vec<(Timestamp, usize)> = Vec::new();
        for (time, index) in slots {
            if covered >= amount {
                break;
            }
            covered += self.state.withdraw_queue[&time][index].amount;
            picked.push((time, index));
        }
        debug_assert!(
            covered >= amount,
            "withdrawals cannot cover the required delay amount"
        );

        // Remove back to front within each slot so indices stay valid.
        picked.sort_by(|a, b| b.cmp(a));
        let mut delayed: Vec<Withdraw> = Vec::new();
        for (time, index) in picked {
            let slot = self
                .state
                .withdraw_queue
                .get_mut(&time)
                .expect("slot just scanned");
            delayed.push(slot.remove(index));
            if slot.is_empty() {
                self.state.withdraw_queue.remove(&time);
            }
        }

        // Reinsert earliest-first so insertion order inside the new slots
        // stays deterministic.
        delayed.reverse();
        for mut withdraw in delayed {
            let new_completion = withdraw.completion_time + duration;
            if let Some(unbonding) = &mut withdraw.linked_unbonding {
                self.staking.request_delay_unbonding(
                    provider,
                    &unbonding.validator_address,
                    new_completion,
                )?;
                unbonding.completion_time = new_completion;
            }
            info!(
                "delayed withdrawal of {} for {} to {}",
                withdraw.amount, provider, new_completion
            );
            withdraw.completion_time = new_completion;
            self.state.enqueue_withdraw(withdraw);
        }
        Ok(())
    }

    /// Release every withdrawal whose completion time has passed. An
    /// entry whose linked unbonding is still unconfirmed stays queued and
    /// is retried next block rather than dropped.
    pub fn process_due_withdrawals(&mut self, ctx: &BlockCtx) {
        let due: Vec<_> = self
            .state
            .withdraw_queue
            .range(..=ctx.time)
            .map(|(t, _)| *t)
            .collect();
        for time in due {
            let entries = self.state.withdraw_queue.remove(&time).unwrap_or_default();
            let mut retained: Vec<Withdraw> = Vec::new();
            for withdraw in entries {
                if let Some(unbonding) = &withdraw.linked_unbonding {
                    if !unbonding.confirmed
                        && !self
                            .staking
                            .is_unbonding_confirmed(&withdraw.address, &unbonding.validator_address)
                    {
                        warn!(
                            "unbonding for {} not confirmed, retrying withdrawal next block",
                            withdraw.address
                        );
                        retained.push(withdraw);
                        continue;
                    }
                }
                let Some(record) = self.state.providers.get_mut(&withdraw.address) else {
                    warn!("dropping withdrawal for unknown provider {}", withdraw.address);
                    continue;
                };
                record.collateral = record.collateral.saturating_sub(withdraw.amount);
                record.withdrawing = record.withdrawing.saturating_sub(withdraw.amount);
                self.state.total_collateral =
                    self.state.total_collateral.saturating_sub(withdraw.amount);
                self.state.total_withdrawing =
                    self.state.total_withdrawing.saturating_sub(withdraw.amount);
                info!(
                    "released withdrawal of {} to {}",
                    withdraw.amount, withdraw.address
                );
            }
            if !retained.is_empty() {
                self.state.withdraw_queue.insert(time, retained);
            }
        }
    }
}
