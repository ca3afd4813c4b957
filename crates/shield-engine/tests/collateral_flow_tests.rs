// Collateral flow integration tests: deposits, the withdrawal queue, the
// expiry sweep, and fee distribution driven through the per-block hook.

#[cfg(test)]
mod collateral_flow_tests {
    use shield_core::{
        BlockCtx, DecAmount, InMemoryBank, ShieldError, ShieldParams, StaticStaking, Timestamp,
    };
    use shield_engine::ShieldEngine;

    const T0: Timestamp = 1_700_000_000;

    fn ctx(time: Timestamp) -> BlockCtx {
        BlockCtx::new(1, time)
    }

    fn params() -> ShieldParams {
        ShieldParams {
            unbonding_period_secs: 100,
            protection_period_secs: 1_000,
            claim_window_secs: 300,
            voting_period_secs: 100,
            shield_fee_rate: DecAmount::from_raw(DecAmount::SCALE / 100),
            min_purchase_amount: 10,
        }
    }

    fn engine() -> ShieldEngine<InMemoryBank, StaticStaking> {
        let bank = InMemoryBank::new().with_balance("buyer", 1_000_000);
        let staking = StaticStaking::new()
            .with_bonded("alice", 1_000)
            .with_bonded("bob", 1_000);
        let mut engine = ShieldEngine::new("admin".to_string(), params(), bank, staking).unwrap();
        engine
            .deposit_collateral(&ctx(T0), &"alice".to_string(), 100)
            .unwrap();
        engine
            .deposit_collateral(&ctx(T0), &"bob".to_string(), 300)
            .unwrap();
        engine
    }

    #[test]
    fn test_withdrawal_conservation_through_completion() {
        let mut engine = engine();
        let alice = "alice".to_string();
        let completion = engine
            .request_withdraw_collateral(&ctx(T0), &alice, 100)
            .unwrap();

        // before completion the collateral is unavailable but not removed
        engine.end_block(&ctx(completion - 1));
        let p = engine.get_provider(&alice).unwrap();
        assert_eq!(p.collateral, 100);
        assert_eq!(p.withdrawing, 100);
        assert_eq!(
            engine
                .request_withdraw_collateral(&ctx(completion - 1), &alice, 1)
                .unwrap_err(),
            ShieldError::InsufficientUnlockedCollateral
        );

        // at completion the sweep removes it for real
        engine.end_block(&ctx(completion));
        let p = engine.get_provider(&alice).unwrap();
        assert_eq!(p.collateral, 0);
        assert_eq!(p.withdrawing, 0);
        assert_eq!(engine.state.total_collateral, 300);

        // the deposit-withdraw cycle nets to zero
        engine.deposit_collateral(&ctx(completion), &alice, 100).unwrap();
        assert_eq!(engine.get_provider(&alice).unwrap().collateral, 100);
    }

    #[test]
    fn test_withdrawals_blocked_when_shield_would_lose_backing() {
        let mut engine = engine();
        let admin = "admin".to_string();
        let pool = engine
            .create_pool(
                &ctx(T0),
                &admin,
                "umee".to_string(),
                "umee-sponsor".to_string(),
                "terms".to_string(),
                1_000,
            )
            .unwrap();
        engine
            .purchase_shield(&ctx(T0), &"buyer".to_string(), pool.id, 350, "asset".into())
            .unwrap();

        // 350 of the 400 collateral now backs shield; bob can only pull 50
        let bob = "bob".to_string();
        assert_eq!(
            engine
                .request_withdraw_collateral(&ctx(T0), &bob, 60)
                .unwrap_err(),
            ShieldError::OverWithdraw
        );
        engine.request_withdraw_collateral(&ctx(T0), &bob, 50).unwrap();

        // and nothing further once the queue holds the headroom
        assert_eq!(
            engine
                .request_withdraw_collateral(&ctx(T0), &bob, 1)
                .unwrap_err(),
            ShieldError::OverWithdraw
        );
    }

    #[test]
    fn test_end_block_runs_the_sweeps_in_order() {
        let mut engine = engine();
        let admin = "admin".to_string();
        let pool = engine
            .create_pool(
                &ctx(T0),
                &admin,
                "umee".to_string(),
                "umee-sponsor".to_string(),
                "terms".to_string(),
                1_000,
            )
            .unwrap();
        engine
            .purchase_shield(&ctx(T0), &"buyer".to_string(), pool.id, 400, "asset".into())
            .unwrap();

        // a withdrawal requested once the purchase has expired completes
        // in the same block as the expiry sweep: purchases drain first,
        // freeing the headroom the withdrawal release then relies on
        engine.end_block(&ctx(T0 + 1_300));
        assert_eq!(engine.state.total_shield, 0);

        let alice = "alice".to_string();
        let completion = engine
            .request_withdraw_collateral(&ctx(T0 + 1_300), &alice, 100)
            .unwrap();
        engine.end_block(&ctx(completion));
        assert_eq!(engine.get_provider(&alice).unwrap().collateral, 0);
        assert_eq!(engine.state.total_collateral, 300);
    }

    #[test]
    fn test_fees_distribute_each_block_and_pay_out() {
        let mut engine = engine();
        let admin = "admin".to_string();
        let pool = engine
            .create_pool(
                &ctx(T0),
                &admin,
                "umee".to_string(),
                "umee-sponsor".to_string(),
                "terms".to_string(),
                1_000,
            )
            .unwrap();
        // 1% of 400 = 4 units of service fees
        engine
            .purchase_shield(&ctx(T0), &"buyer".to_string(), pool.id, 400, "asset".into())
            .unwrap();
        assert_eq!(engine.state.pending_service_fees, DecAmount::from_int(4));

        for block in 1..=30 {
            engine.end_block(&ctx(T0 + block));
        }

        let alice = "alice".to_string();
        let bob = "bob".to_string();
        let paid_alice = engine.payout_rewards(&ctx(T0 + 31), &alice).unwrap();
        let paid_bob = engine.payout_rewards(&ctx(T0 + 31), &bob).unwrap();
        assert!(paid_alice >= 1);
        assert!(paid_bob >= 2);
        // nothing was lost: paid plus re-deferred change plus pending
        // still accounts for the full 4 units
        let leftover = engine
            .state
            .pending_service_fees
            .add(engine.get_rewards(&alice))
            .add(engine.get_rewards(&bob));
        assert_eq!(
            DecAmount::from_int(paid_alice + paid_bob).add(leftover),
            DecAmount::from_int(4)
        );
        assert_eq!(engine.bank.balance_of("alice"), paid_alice);
        assert_eq!(engine.bank.balance_of("bob"), paid_bob);
    }

    #[test]
    fn test_expiry_sweep_is_idempotent_across_blocks() {
        let mut engine = engine();
        let admin = "admin".to_string();
        let pool = engine
            .create_pool(
                &ctx(T0),
                &admin,
                "umee".to_string(),
                "umee-sponsor".to_string(),
                "terms".to_string(),
                1_000,
            )
            .unwrap();
        engine
            .purchase_shield(&ctx(T0), &"buyer".to_string(), pool.id, 200, "asset".into())
            .unwrap();

        engine.expire_purchases(&ctx(T0 + 1_300));
        let hash = engine.state_hash();
        engine.expire_purchases(&ctx(T0 + 1_300));
        assert_eq!(engine.state_hash(), hash);
        // later sweeps with nothing due are also no-ops
        engine.expire_purchases(&ctx(T0 + 1_400));
        assert_eq!(engine.state_hash(), hash);
    }

    #[test]
    fn test_claim_keeps_withdrawing_collateral_in_place() {
        let mut engine = engine();
        let admin = "admin".to_string();
        let pool = engine
            .create_pool(
                &ctx(T0),
                &admin,
                "umee".to_string(),
                "umee-sponsor".to_string(),
                "terms".to_string(),
                1_000,
            )
            .unwrap();
        let purchase = engine
            .purchase_shield(&ctx(T0), &"buyer".to_string(), pool.id, 200, "asset".into())
            .unwrap();

        // alice queues out almost everything, then loses her bonded stake
        let alice = "alice".to_string();
        let completion = engine
            .request_withdraw_collateral(&ctx(T0), &alice, 95)
            .unwrap();
        engine.staking.bonded.insert(alice.clone(), 0);
        engine.sync_delegation(&ctx(T0), &alice).unwrap();

        engine
            .secure_collaterals(
                &ctx(T0 + 10),
                1,
                pool.id,
                &"buyer".to_string(),
                purchase.purchase_id,
                40,
                200,
            )
            .unwrap();

        // the 95 queued before the claim was pushed out past the lock
        // window; only the 5 force-queued by the delegation sync leaves
        // at the original completion time
        engine.end_block(&ctx(completion));
        let p = engine.get_provider(&alice).unwrap();
        assert_eq!(p.collateral, 95);
        assert_eq!(p.withdrawing, 95);
        assert_eq!(p.locked, 10);

        // the vote concludes and releases the lock, then the delayed
        // completion lets the rest go
        engine
            .restore_shield(
                &ctx(T0 + 210),
                1,
                pool.id,
                &"buyer".to_string(),
                purchase.purchase_id,
                40,
            )
            .unwrap();
        engine.end_block(&ctx(completion + 200));
        let p = engine.get_provider(&alice).unwrap();
        assert_eq!(p.collateral, 0);
        assert_eq!(p.withdrawing, 0);
        assert_eq!(p.locked, 0);
    }
}
