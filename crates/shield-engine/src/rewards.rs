//! Service-fee distribution and reward payout.

use log::info;
use shield_core::{
    Address, Amount, BankCollaborator, BlockCtx, DecAmount, ShieldError, StakingCollaborator,
};

use crate::engine::ShieldEngine;

impl<B: BankCollaborator, S: StakingCollaborator> ShieldEngine<B, S> {
    /// Distribute pending service fees to providers proportional to their
    /// collateral share, ascending by address. Shares are truncated at
    /// the fixed-point scale against the running fee balance; whatever is
    /// not handed out stays pending for the next round. No fee is ever
    /// lost, only deferred.
    pub fn distribute_fees(&mut self, _ctx: &BlockCtx) {
        if self.state.pending_service_fees.is_zero() || self.state.total_collateral == 0 {
            return;
        }
        let total_collateral = self.state.total_collateral;
        let mut fees = self.state.pending_service_fees;
        for record in self.state.providers.values_mut() {
            let share = fees.mul_ratio_truncate(record.collateral, total_collateral);
            fees = fees.sub(share);
            record.rewards = record.rewards.add(share);
        }
        self.state.pending_service_fees = fees;
    }

    /// Pay out a provider's accumulated rewards, truncated to a whole
    /// transferable amount. The fractional change goes back into the
    /// pending service fees. Returns the amount paid; zero when nothing
    /// is transferable yet.
    pub fn payout_rewards(
        &mut self,
        _ctx: &BlockCtx,
        provider: &Address,
    ) -> Result<Amount, ShieldError> {
        let record = self
            .state
            .providers
            .get(provider)
            .ok_or_else(|| ShieldError::NoSuchProvider(provider.clone()))?;
        let (payable, change) = record.rewards.truncate();
        if payable == 0 {
            return Ok(0);
        }
        // Bank first: a failed transfer aborts with no state change.
        self.bank.transfer_from_module(provider, payable)?;

        let record = self
            .state
            .providers
            .get_mut(provider)
            .expect("provider checked above");
        record.rewards = DecAmount::zero();
        self.state.pending_service_fees = self.state.pending_service_fees.add(change);
        info!("paid {payable} rewards to {provider}");
        Ok(payable)
    }

    pub fn get_rewards(&self, provider: &Address) -> DecAmount {
        self.state
            .providers
            .get(provider)
            .map(|p| p.rewards)
            .unwrap_or_else(DecAmount::zero)
    }
}
