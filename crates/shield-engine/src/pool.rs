//! Coverage pool registry and lifecycle.

use log::info;
use shield_core::{
    Address, Amount, BankCollaborator, BlockCtx, Pool, PoolPurchaser, ShieldError,
    StakingCollaborator,
};

use crate::engine::ShieldEngine;

impl<B: BankCollaborator, S: StakingCollaborator> ShieldEngine<B, S> {
    /// Create a pool for a sponsor. Admin only; one pool per sponsor.
    pub fn create_pool(
        &mut self,
        ctx: &BlockCtx,
        creator: &Address,
        sponsor: String,
        sponsor_address: Address,
        description: String,
        shield_limit: Amount,
    ) -> Result<Pool, ShieldError> {
        if *creator != self.state.admin {
            return Err(ShieldError::NotAuthorized);
        }
        if shield_limit == 0 {
            return Err(ShieldError::InvalidAmount);
        }
        if self.get_pool_by_sponsor(&sponsor).is_some() {
            return Err(ShieldError::DuplicateSponsor(sponsor));
        }

        let id = self.state.next_pool_id;
        self.state.next_pool_id += 1;
        let pool = Pool::new(id, sponsor, sponsor_address, description, shield_limit);
        self.state.pools.insert(id, pool.clone());
        info!(
            "created pool {} for sponsor {} at height {}",
            id, pool.sponsor, ctx.height
        );
        Ok(pool)
    }

    /// Update a pool's description and/or shield limit. Admin only. The
    /// new limit may not drop below the shield already issued.
    pub fn update_pool(
        &mut self,
        _ctx: &BlockCtx,
        updater: &Address,
        pool_id: u64,
        description: Option<String>,
        shield_limit: Option<Amount>,
    ) -> Result<Pool, ShieldError> {
        if *updater != self.state.admin {
            return Err(ShieldError::NotAuthorized);
        }
        let pool = self
            .state
            .pools
            .get_mut(&pool_id)
            .ok_or(ShieldError::NoSuchPool(pool_id))?;
        if let Some(limit) = shield_limit {
            if limit < pool.total_shield_issued {
                return Err(ShieldError::PoolShieldLimitExceeded(pool_id));
            }
            pool.shield_limit = limit;
        }
        if let Some(description) = description {
            pool.description = description;
        }
        Ok(pool.clone())
    }

    /// Pause an active pool: new purchases are blocked, existing coverage
    /// and withdrawals are unaffected.
    pub fn pause_pool(
        &mut self,
        _ctx: &BlockCtx,
        updater: &Address,
        pool_id: u64,
    ) -> Result<Pool, ShieldError> {
        if *updater != self.state.admin {
            return Err(ShieldError::NotAuthorized);
        }
        let pool = self
            .state
            .pools
            .get_mut(&pool_id)
            .ok_or(ShieldError::NoSuchPool(pool_id))?;
        if !pool.active {
            return Err(ShieldError::PoolAlreadyPaused(pool_id));
        }
        pool.active = false;
        info!("paused pool {pool_id}");
        Ok(pool.clone())
    }

    /// Resume a paused pool.
    pub fn resume_pool(
        &mut self,
        _ctx: &BlockCtx,
        updater: &Address,
        pool_id: u64,
    ) -> Result<Pool, ShieldError> {
        if *updater != self.state.admin {
            return Err(ShieldError::NotAuthorized);
        }
        let pool = self
            .state
            .pools
            .get_mut(&pool_id)
            .ok_or(ShieldError::NoSuchPool(pool_id))?;
        if pool.active {
            return Err(ShieldError::PoolAlreadyActive(pool_id));
        }
        pool.active = true;
        info!("resumed pool {pool_id}");
        Ok(pool.clone())
    }

    /// Close a pool. Fails while purchase entries are outstanding unless
    /// forced; closing drops the pool's issued shield from the global
    /// totals and removes its purchases from the expiry queue.
    pub fn close_pool(
        &mut self,
        _ctx: &BlockCtx,
        closer: &Address,
        pool_id: u64,
        force: bool,
    ) -> Result<(), ShieldError> {
        if *closer != self.state.admin {
            return Err(ShieldError::NotAuthorized);
        }
        if !self.state.pools.contains_key(&pool_id) {
            return Err(ShieldError::NoSuchPool(pool_id));
        }

        let keys: Vec<(u64, Address)> = self
            .state
            .purchase_lists
            .keys()
            .filter(|(id, _)| *id == pool_id)
            .cloned()
            .collect();
        let outstanding = keys
            .iter()
            .any(|key| !self.state.purchase_lists[key].entries.is_empty());
        if outstanding && !force {
            return Err(ShieldError::PoolNotClosable(pool_id));
        }

        for key in keys {
            let list = self.state.purchase_lists.remove(&key).expect("key just listed");
            let reference = PoolPurchaser {
                pool_id,
                purchaser: key.1.clone(),
            };
            for entry in &list.entries {
                self.state.total_shield = self.state.total_shield.saturating_sub(entry.shield);
                self.state.dequeue_purchase(entry.deletion_time, &reference);
            }
        }
        self.state.pools.remove(&pool_id);
        info!("closed pool {pool_id} (force: {force})");
        Ok(())
    }

    pub fn get_pool(&self, pool_id: u64) -> Option<&Pool> {
        self.state.pools.get(&pool_id)
    }

    pub fn get_pool_by_sponsor(&self, sponsor: &str) -> Option<&Pool> {
        self.state.pools.values().find(|p| p.sponsor == sponsor)
    }

    pub fn list_pools(&self) -> impl Iterator<Item = &Pool> {
        self.state.pools.values()
    }
}
