//! Contracts of the external modules the engine relies on.
//!
//! The bank moves tokens, the staking module reports bonded delegations
//! and manages unbonding schedules. Both are reached only through these
//! traits; failures propagate to the caller unchanged and abort the
//! operation atomically.
//!
//! `InMemoryBank` and `StaticStaking` are reference implementations used
//! throughout the test suites.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Address, Amount, Timestamp};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("bank transfer failed: {0}")]
    TransferFailed(String),

    #[error("staking module rejected the unbonding delay: {0}")]
    DelayRejected(String),
}

/// Token movement between accounts and the shield module account.
pub trait BankCollaborator {
    /// Premiums and deposits flow into the module account.
    fn transfer_to_module(&mut self, from: &Address, amount: Amount)
        -> Result<(), CollaboratorError>;

    /// Payouts and rewards flow out of the module account.
    fn transfer_from_module(&mut self, to: &Address, amount: Amount)
        -> Result<(), CollaboratorError>;
}

/// An unbonding reported by the staking module for a delegator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingReport {
    pub validator_address: Address,
    pub completion_time: Timestamp,
}

/// Bonded-delegation and unbonding-schedule queries against the staking
/// module.
pub trait StakingCollaborator {
    /// Total bonded delegation for the address.
    fn bonded_delegation(&self, addr: &Address) -> Amount;

    /// The earliest ongoing unbonding for the address, if any.
    fn unbonding(&self, addr: &Address) -> Option<UnbondingReport>;

    /// Ask the staking module to push an unbonding's completion out so it
    /// never finishes before the shield-side withdrawal it is linked to.
    fn request_delay_unbonding(
        &mut self,
        addr: &Address,
        validator: &Address,
        new_completion: Timestamp,
    ) -> Result<(), CollaboratorError>;

    /// Whether the unbonding linked to a withdrawal has been confirmed.
    fn is_unbonding_confirmed(&self, addr: &Address, validator: &Address) -> bool;
}

/// In-memory bank keeping one balance per account plus the module account.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBank {
    pub balances: BTreeMap<Address, Amount>,
    pub module_balance: Amount,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(mut self, addr: &str, amount: Amount) -> Self {
        self.balances.insert(addr.to_string(), amount);
        self
    }

    pub fn balance_of(&self, addr: &str) -> Amount {
        self.balances.get(addr).copied().unwrap_or(0)
    }
}

impl BankCollaborator for InMemoryBank {
    fn transfer_to_module(
        &mut self,
        from: &Address,
        amount: Amount,
    ) -> Result<(), CollaboratorError> {
        let balance = self.balances.entry(from.clone()).or_insert(0);
        if *balance < amount {
            return Err(CollaboratorError::TransferFailed(format!(
                "insufficient funds for {from}"
            )));
        }
        *balance -= amount;
        self.module_balance = self.module_balance.saturating_add(amount);
        debug!("bank: {from} -> module {amount}");
        Ok(())
    }

    fn transfer_from_module(
        &mut self,
        to: &Address,
        amount: Amount,
    ) -> Result<(), CollaboratorError> {
        if self.module_balance < amount {
            return Err(CollaboratorError::TransferFailed(
                "module account underfunded".to_string(),
            ));
        }
        self.module_balance -= amount;
        *self.balances.entry(to.clone()).or_insert(0) += amount;
        debug!("bank: module -> {to} {amount}");
        Ok(())
    }
}

/// Staking stub with fixed bonded delegations and scriptable unbondings.
#[derive(Debug, Clone, Default)]
pub struct StaticStaking {
    pub bonded: BTreeMap<Address, Amount>,
    pub unbondings: BTreeMap<Address, UnbondingReport>,
    pub confirmed: BTreeMap<(Address, Address), bool>,
    /// When set, every delay request is refused; used to test that the
    /// rejection propagates and aborts the claim.
    pub deny_delays: bool,
}

impl StaticStaking {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bonded(mut self, addr: &str, amount: Amount) -> Self {
        self.bonded.insert(addr.to_string(), amount);
        self
    }
}

impl StakingCollaborator for StaticStaking {
    fn bonded_delegation(&self, addr: &Address) -> Amount {
        self.bonded.get(addr).copied().unwrap_or(0)
    }

    fn unbonding(&self, addr: &Address) -> Option<UnbondingReport> {
        self.unbondings.get(addr).cloned()
    }

    fn request_delay_unbonding(
        &mut self,
        addr: &Address,
        validator: &Address,
        new_completion: Timestamp,
    ) -> Result<(), CollaboratorError> {
        if self.deny_delays {
            return Err(CollaboratorError::DelayRejected(format!(
                "delay refused for {addr}/{validator}"
            )));
        }
        if let Some(report) = self.unbondings.get_mut(addr) {
            if report.validator_address == *validator {
                report.completion_time = new_completion;
            }
        }
        Ok(())
    }

    fn is_unbonding_confirmed(&self, addr: &Address, validator: &Address) -> bool {
        self.confirmed
            .get(&(addr.clone(), validator.clone()))
            .copied()
            .unwrap_or(false)
    }
}
