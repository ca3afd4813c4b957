//! Engine composition and the per-block hook.

use log::info;
use shield_core::{
    Address, BankCollaborator, BlockCtx, ShieldError, ShieldParams, StakingCollaborator,
};

use crate::state::ShieldState;

/// The shield state machine.
///
/// Owns the module state, the parameters, and the collaborator handles.
/// Exactly one operation is applied at a time in a globally agreed order;
/// there is no internal parallelism and no wall-clock access.
#[derive(Debug)]
pub struct ShieldEngine<B, S> {
    pub params: ShieldParams,
    pub state: ShieldState,
    pub bank: B,
    pub staking: S,
}

impl<B: BankCollaborator, S: StakingCollaborator> ShieldEngine<B, S> {
    /// Create an engine at genesis with an empty state.
    pub fn new(
        admin: Address,
        params: ShieldParams,
        bank: B,
        staking: S,
    ) -> Result<Self, ShieldError> {
        params.validate()?;
        Ok(ShieldEngine {
            params,
            state: ShieldState::new(admin),
            bank,
            staking,
        })
    }

    /// Per-block hook, invoked exactly once per block by the runtime:
    /// drain expired purchases, release due withdrawals, distribute fees.
    pub fn end_block(&mut self, ctx: &BlockCtx) {
        self.expire_purchases(ctx);
        self.process_due_withdrawals(ctx);
        self.distribute_fees(ctx);
        self.state.assert_invariants();
    }

    /// Deterministic fingerprint of the module state after the last
    /// committed operation.
    pub fn state_hash(&self) -> String {
        self.state.fingerprint()
    }

    /// Run a multi-step operation all-or-nothing: on error the state is
    /// restored to the snapshot taken on entry. Used by operations that
    /// can fail after their first mutation.
    pub(crate) fn transactional<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, ShieldError>,
    ) -> Result<T, ShieldError> {
        let snapshot = self.state.clone();
        let out = op(self);
        if out.is_err() {
            self.state = snapshot;
            info!("operation aborted, state rolled back");
        }
        out
    }
}
