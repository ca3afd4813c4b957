// Claim proposal payload and dispatch.
//
// Governance delivers two events: submission (within the same atomic
// transaction as the proposal, so an under-collateralized claim never
// reaches a vote) and finalization. Payloads carry an explicit kind
// discriminant and handlers are resolved through a lookup table, never
// through runtime type assertions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shield_core::{
    Address, Amount, BankCollaborator, BlockCtx, ShieldError, StakingCollaborator,
};

use crate::engine::ShieldEngine;

/// Discriminant of a proposal payload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ProposalKind {
    ShieldClaim,
}

/// A loss claim filed against a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimProposal {
    /// Governance proposal id; locks are keyed by it.
    pub proposal_id: u64,
    pub pool_id: u64,
    pub purchase_id: u64,
    pub purchaser: Address,
    /// Claimed loss amount.
    pub loss: Amount,
    /// Evidence of the loss event.
    pub evidence: String,
    pub description: String,
    pub proposer: Address,
}

/// Tagged proposal payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalPayload {
    ShieldClaim(ClaimProposal),
}

impl ProposalPayload {
    pub fn kind(&self) -> ProposalKind {
        match self {
            ProposalPayload::ShieldClaim(_) => ProposalKind::ShieldClaim,
        }
    }
}

/// Final outcome of a proposal vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalOutcome {
    /// Approved, possibly for a sub-amount of the claimed loss.
    Approved {
        beneficiary: Address,
        amount: Amount,
    },
    Rejected,
    Expired,
}

type SubmitHandler<B, S> =
    fn(&mut ShieldEngine<B, S>, &BlockCtx, &ProposalPayload) -> Result<(), ShieldError>;
type OutcomeHandler<B, S> = fn(
    &mut ShieldEngine<B, S>,
    &BlockCtx,
    &ProposalPayload,
    &ProposalOutcome,
) -> Result<(), ShieldError>;

/// Lookup-table dispatch from proposal kind to engine hooks.
pub struct ProposalRouter<B, S> {
    on_submit: BTreeMap<ProposalKind, SubmitHandler<B, S>>,
    on_outcome: BTreeMap<ProposalKind, OutcomeHandler<B, S>>,
}

impl<B: BankCollaborator, S: StakingCollaborator> ProposalRouter<B, S> {
    pub fn new() -> Self {
        let mut router = ProposalRouter {
            on_submit: BTreeMap::new(),
            on_outcome: BTreeMap::new(),
        };
        router
            .on_submit
            .insert(ProposalKind::ShieldClaim, submit_shield_claim::<B, S>);
        router
            .on_outcome
            .insert(ProposalKind::ShieldClaim, finalize_shield_claim::<B, S>);
        router
    }

    /// Dispatch a freshly submitted proposal.
    pub fn submit(
        &self,
        engine: &mut ShieldEngine<B, S>,
        ctx: &BlockCtx,
        payload: &ProposalPayload,
    ) -> Result<(), ShieldError> {
        let handler = self
            .on_submit
            .get(&payload.kind())
            .ok_or(ShieldError::UnknownProposalKind)?;
        handler(engine, ctx, payload)
    }

    /// Dispatch a proposal's final voting outcome.
    pub fn finalize(
        &self,
        engine: &mut ShieldEngine<B, S>,
        ctx: &BlockCtx,
        payload: &ProposalPayload,
        outcome: &ProposalOutcome,
    ) -> Result<(), ShieldError> {
        let handler = self
            .on_outcome
            .get(&payload.kind())
            .ok_or(ShieldError::UnknownProposalKind)?;
        handler(engine, ctx, payload, outcome)
    }
}

impl<B: BankCollaborator, S: StakingCollaborator> Default for ProposalRouter<B, S> {
    fn default() -> Self {
        Self::new()
    }
}

fn submit_shield_claim<B: BankCollaborator, S: StakingCollaborator>(
    engine: &mut ShieldEngine<B, S>,
    ctx: &BlockCtx,
    payload: &ProposalPayload,
) -> Result<(), ShieldError> {
    match payload {
        ProposalPayload::ShieldClaim(claim) => {
            // Collateral stays secured through voting plus finalization
            // slack; the claim window parameter rule guarantees the
            // purchase itself outlives this lock.
            let lock_duration = engine.params.voting_period_secs.saturating_mul(2);
            engine.secure_collaterals(
                ctx,
                claim.proposal_id,
                claim.pool_id,
                &claim.purchaser,
                claim.purchase_id,
                claim.loss,
                lock_duration,
            )
        }
    }
}

fn finalize_shield_claim<B: BankCollaborator, S: StakingCollaborator>(
    engine: &mut ShieldEngine<B, S>,
    ctx: &BlockCtx,
    payload: &ProposalPayload,
    outcome: &ProposalOutcome,
) -> Result<(), ShieldError> {
    match payload {
        ProposalPayload::ShieldClaim(claim) => match outcome {
            ProposalOutcome::Approved {
                beneficiary,
                amount,
            } => engine.payout_claim(ctx, claim.proposal_id, beneficiary, *amount),
            ProposalOutcome::Rejected | ProposalOutcome::Expired => engine.restore_shield(
                ctx,
                claim.proposal_id,
                claim.pool_id,
                &claim.purchaser,
                claim.purchase_id,
                claim.loss,
            ),
        },
    }
}
