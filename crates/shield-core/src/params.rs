//! Module parameters.

use serde::{Deserialize, Serialize};

use crate::errors::ShieldError;
use crate::types::{Amount, DecAmount};

/// Tunable parameters of the shield module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldParams {
    /// Delay between a withdrawal request and its completion, mirroring
    /// the staking module's unbonding period.
    pub unbonding_period_secs: u64,
    /// How long a purchased shield protects the asset.
    pub protection_period_secs: u64,
    /// Time after protection ends during which a claim may still be filed.
    /// Must exceed two governance voting periods so a claim filed at the
    /// last moment can still be voted before the purchase is deleted.
    pub claim_window_secs: u64,
    /// Governance voting period for claim proposals.
    pub voting_period_secs: u64,
    /// Premium rate charged per unit of purchased shield.
    pub shield_fee_rate: DecAmount,
    /// Smallest purchase accepted.
    pub min_purchase_amount: Amount,
}

impl Default for ShieldParams {
    fn default() -> Self {
        ShieldParams {
            unbonding_period_secs: 21 * 24 * 3600,
            protection_period_secs: 30 * 24 * 3600,
            claim_window_secs: 21 * 24 * 3600,
            voting_period_secs: 7 * 24 * 3600,
            shield_fee_rate: DecAmount::from_raw(DecAmount::SCALE / 100), // 1%
            min_purchase_amount: 1,
        }
    }
}

impl ShieldParams {
    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), ShieldError> {
        if self.unbonding_period_secs == 0
            || self.protection_period_secs == 0
            || self.claim_window_secs == 0
            || self.voting_period_secs == 0
        {
            return Err(ShieldError::InvalidParams(
                "periods must be non-zero".to_string(),
            ));
        }
        if self.claim_window_secs <= 2 * self.voting_period_secs {
            return Err(ShieldError::InvalidParams(format!(
                "claim window {}s must exceed two voting periods ({}s)",
                self.claim_window_secs,
                2 * self.voting_period_secs
            )));
        }
        if self.shield_fee_rate >= DecAmount::from_int(1) {
            return Err(ShieldError::InvalidParams(
                "shield fee rate must be below 1".to_string(),
            ));
        }
        if self.min_purchase_amount == 0 {
            return Err(ShieldError::InvalidParams(
                "minimum purchase must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
