//! Provider ledger: collateral deposits, withdrawal requests, and
//! reconciliation against the staking module's bonded delegations.

use log::{info, warn};
use shield_core::{
    Address, Amount, BankCollaborator, BlockCtx, Provider, ShieldError, StakingCollaborator,
    Timestamp, UnbondingInfo, Withdraw,
};

use crate::engine::ShieldEngine;

impl<B: BankCollaborator, S: StakingCollaborator> ShieldEngine<B, S> {
    /// Deposit collateral backed by bonded delegation. Creates the
    /// provider record on first use.
    pub fn deposit_collateral(
        &mut self,
        _ctx: &BlockCtx,
        provider: &Address,
        amount: Amount,
    ) -> Result<(), ShieldError> {
        if amount == 0 {
            return Err(ShieldError::InvalidAmount);
        }
        let bonded = self.staking.bonded_delegation(provider);
        let record = self
            .state
            .providers
            .entry(provider.clone())
            .or_insert_with(|| Provider::new(provider.clone(), bonded));
        record.delegation_bonded = bonded;
        if record.collateral.saturating_add(amount) > record.delegation_bonded {
            return Err(ShieldError::InsufficientStake);
        }
        record.collateral += amount;
        self.state.total_collateral += amount;
        info!("provider {provider} deposited {amount} collateral");
        Ok(())
    }

    /// Request a withdrawal of unlocked collateral. The amount stays
    /// counted in `collateral` (as `withdrawing`) until the queue entry
    /// completes one unbonding period later.
    pub fn request_withdraw_collateral(
        &mut self,
        ctx: &BlockCtx,
        provider: &Address,
        amount: Amount,
    ) -> Result<Timestamp, ShieldError> {
        if amount == 0 {
            return Err(ShieldError::InvalidAmount);
        }
        let record = self
            .state
            .providers
            .get(provider)
            .ok_or_else(|| ShieldError::NoSuchProvider(provider.clone()))?;
        if amount > record.unlocked_collateral() {
            return Err(ShieldError::InsufficientUnlockedCollateral);
        }
        // Issued shield and pending claims must stay backed once every
        // queued withdrawal, including this one, has completed.
        let headroom = self
            .state
            .total_collateral
            .saturating_sub(self.state.total_withdrawing)
            .saturating_sub(amount);
        if self.state.total_shield.saturating_add(self.state.total_claimed) > headroom {
            return Err(ShieldError::OverWithdraw);
        }

        let completion_time = ctx.time + self.params.unbonding_period_secs;
        self.state.enqueue_withdraw(Withdraw {
            address: provider.clone(),
            amount,
            completion_time,
            linked_unbonding: None,
        });
        let record = self
            .state
            .providers
            .get_mut(provider)
            .expect("provider checked above");
        record.withdrawing += amount;
        self.state.total_withdrawing += amount;
        info!("provider {provider} queued withdrawal of {amount}, completes at {completion_time}");
        Ok(completion_time)
    }

    /// Delegation still available to back additional collateral.
    pub fn get_available(&self, provider: &Address) -> Amount {
        match self.state.providers.get(provider) {
            Some(p) => p.delegation_bonded.saturating_sub(p.collateral),
            None => self.staking.bonded_delegation(provider),
        }
    }

    pub fn get_provider(&self, provider: &Address) -> Option<&Provider> {
        self.state.providers.get(provider)
    }

    pub fn list_providers(&self) -> impl Iterator<Item = &Provider> {
        self.state.providers.values()
    }

    /// Refresh a provider's bonded delegation from the staking module.
    /// Collateral no longer backed by stake (and not already leaving) is
    /// force-queued as a withdrawal linked to the reported unbonding, so
    /// the shield and staking schedules cannot diverge.
    pub fn sync_delegation(
        &mut self,
        ctx: &BlockCtx,
        provider: &Address,
    ) -> Result<(), ShieldError> {
        let bonded = self.staking.bonded_delegation(provider);
        let linked = self.staking.unbonding(provider);
        let record = self
            .state
            .providers
            .get_mut(provider)
            .ok_or_else(|| ShieldError::NoSuchProvider(provider.clone()))?;
        record.delegation_bonded = bonded;

        let backed = bonded.saturating_add(record.withdrawing);
        if record.collateral <= backed {
            return Ok(());
        }
        // Locked collateral cannot be force-withdrawn; it stays pledged
        // to its claim until the proposal resolves.
        let excess = (record.collateral - backed).min(record.unlocked_collateral());
        if excess == 0 {
            return Ok(());
        }
        let completion_time = ctx.time + self.params.unbonding_period_secs;
        let linked_unbonding = linked.map(|r| UnbondingInfo {
            validator_address: r.validator_address,
            completion_time: r.completion_time,
            confirmed: false,
        });
        record.withdrawing += excess;
        self.state.total_withdrawing += excess;
        self.state.enqueue_withdraw(Withdraw {
            address: provider.clone(),
            amount: excess,
            completion_time,
            linked_unbonding,
        });
        warn!("provider {provider} lost bonded backing, force-queued withdrawal of {excess}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ctx, test_engine, T0};
    use shield_core::UnbondingReport;

    #[test]
    fn test_deposit_bounded_by_bonded_delegation() {
        let mut engine = test_engine();
        let alice = "alice".to_string();
        // alice has 1000 bonded and 100 already deposited
        let err = engine
            .deposit_collateral(&ctx(T0), &alice, 901)
            .unwrap_err();
        assert_eq!(err, ShieldError::InsufficientStake);
        engine.deposit_collateral(&ctx(T0), &alice, 900).unwrap();
        assert_eq!(engine.get_provider(&alice).unwrap().collateral, 1_000);
        assert_eq!(engine.get_available(&alice), 0);
    }

    #[test]
    fn test_deposit_of_zero_rejected() {
        let mut engine = test_engine();
        let err = engine
            .deposit_collateral(&ctx(T0), &"alice".to_string(), 0)
            .unwrap_err();
        assert_eq!(err, ShieldError::InvalidAmount);
    }

    #[test]
    fn test_withdraw_request_bounded_by_unlocked_collateral() {
        let mut engine = test_engine();
        let alice = "alice".to_string();
        let err = engine
            .request_withdraw_collateral(&ctx(T0), &alice, 101)
            .unwrap_err();
        assert_eq!(err, ShieldError::InsufficientUnlockedCollateral);

        let completion = engine
            .request_withdraw_collateral(&ctx(T0), &alice, 60)
            .unwrap();
        assert_eq!(completion, T0 + 100);
        let p = engine.get_provider(&alice).unwrap();
        assert_eq!(p.withdrawing, 60);
        // still counted as collateral until the sweep releases it
        assert_eq!(p.collateral, 100);
        // a second request may only take what is left
        let err = engine
            .request_withdraw_collateral(&ctx(T0), &alice, 41)
            .unwrap_err();
        assert_eq!(err, ShieldError::InsufficientUnlockedCollateral);
    }

    #[test]
    fn test_unknown_provider_cannot_withdraw() {
        let mut engine = test_engine();
        let err = engine
            .request_withdraw_collateral(&ctx(T0), &"nobody".to_string(), 10)
            .unwrap_err();
        assert!(matches!(err, ShieldError::NoSuchProvider(_)));
    }

    #[test]
    fn test_sync_delegation_force_queues_unbacked_collateral() {
        let mut engine = test_engine();
        let alice = "alice".to_string();
        engine.staking.bonded.insert(alice.clone(), 40);
        engine.staking.unbondings.insert(
            alice.clone(),
            UnbondingReport {
                validator_address: "val1".to_string(),
                completion_time: T0 + 500,
            },
        );
        engine.sync_delegation(&ctx(T0), &alice).unwrap();
        let p = engine.get_provider(&alice).unwrap();
        assert_eq!(p.withdrawing, 60);
        let queued = engine.state.withdraws_of(&alice);
        assert_eq!(queued.len(), 1);
        let linked = queued[0].linked_unbonding.as_ref().unwrap();
        assert_eq!(linked.validator_address, "val1");
        assert!(!linked.confirmed);
    }
}
