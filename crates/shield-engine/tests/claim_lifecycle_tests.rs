// Claim lifecycle integration tests.
//
// These drive the engine the way the runtime does: transactions, then
// governance callbacks through the proposal router, then the per-block
// hook. They verify:
// - collateral is locked proportionally before a vote opens
// - over-sized claims are rejected at submission
// - secure followed by restore is a true round trip
// - approved payouts reduce providers pro-rata and keep the invariants

#[cfg(test)]
mod claim_lifecycle_tests {
    use shield_core::{
        BlockCtx, DecAmount, InMemoryBank, ShieldError, ShieldParams, StaticStaking, Timestamp,
    };
    use shield_engine::{
        ClaimProposal, ProposalOutcome, ProposalPayload, ProposalRouter, ShieldEngine,
    };

    const T0: Timestamp = 1_700_000_000;
    const DAY: u64 = 24 * 3600;

    fn ctx(time: Timestamp) -> BlockCtx {
        BlockCtx::new(1, time)
    }

    fn params() -> ShieldParams {
        ShieldParams {
            unbonding_period_secs: 21 * DAY,
            protection_period_secs: 30 * DAY,
            claim_window_secs: 15 * DAY,
            voting_period_secs: 7 * DAY,
            shield_fee_rate: DecAmount::from_raw(DecAmount::SCALE / 100),
            min_purchase_amount: 10,
        }
    }

    /// Providers alice (100) and bob (300), one pool with limit 1000.
    fn engine_with_pool() -> (ShieldEngine<InMemoryBank, StaticStaking>, u64) {
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
        let pool = engine
            .create_pool(
                &ctx(T0),
                &"admin".to_string(),
                "umee".to_string(),
                "umee-sponsor".to_string(),
                "coverage for the umee bridge".to_string(),
                1_000,
            )
            .unwrap();
        // the runtime funds the module account for payouts out of band
        engine.bank.module_balance = 1_000_000;
        let id = pool.id;
        (engine, id)
    }

    fn shield_claim(proposal_id: u64, pool_id: u64, purchase_id: u64, loss: u128) -> ProposalPayload {
        ProposalPayload::ShieldClaim(ClaimProposal {
            proposal_id,
            pool_id,
            purchase_id,
            purchaser: "buyer".to_string(),
            loss,
            evidence: "tx 0xdeadbeef".to_string(),
            description: "bridge exploit".to_string(),
            proposer: "buyer".to_string(),
        })
    }

    #[test]
    fn test_claim_scenario_locks_before_vote_and_rejects_oversized_loss() {
        let (mut engine, pool_id) = engine_with_pool();
        let buyer = "buyer".to_string();
        let purchase = engine
            .purchase_shield(&ctx(T0), &buyer, pool_id, 200, "bridge assets".into())
            .unwrap();

        // the claim window always leaves room for a full vote
        assert!(
            purchase.deletion_time
                >= purchase.protection_end_time + 2 * engine.params.voting_period_secs
        );

        let router = ProposalRouter::new();

        // a claim for more than the purchase covers never reaches a vote
        let err = router
            .submit(
                &mut engine,
                &ctx(T0 + DAY),
                &shield_claim(1, pool_id, purchase.purchase_id, 250),
            )
            .unwrap_err();
        assert_eq!(err, ShieldError::InsufficientShield);
        assert_eq!(engine.state.total_claimed, 0);

        // a covered claim locks collateral at submission, before voting
        router
            .submit(
                &mut engine,
                &ctx(T0 + DAY),
                &shield_claim(1, pool_id, purchase.purchase_id, 50),
            )
            .unwrap();
        let alice = engine.get_provider(&"alice".to_string()).unwrap();
        let bob = engine.get_provider(&"bob".to_string()).unwrap();
        assert!(alice.locked > 0);
        assert!(bob.locked > 0);
        // bob backs three times alice's share
        assert!(bob.locked >= 3 * alice.locked - 1 && bob.locked <= 3 * alice.locked + 3);
        assert_eq!(
            engine.state.total_claimed,
            alice.locked + bob.locked
        );
        assert!(engine.state.total_claimed >= 50);
    }

    #[test]
    fn test_obligations_are_proportional_and_cover_the_loss() {
        let (mut engine, pool_id) = engine_with_pool();
        let buyer = "buyer".to_string();
        let purchase = engine
            .purchase_shield(&ctx(T0), &buyer, pool_id, 200, "bridge assets".into())
            .unwrap();
        engine
            .secure_collaterals(
                &ctx(T0 + DAY),
                1,
                pool_id,
                &buyer,
                purchase.purchase_id,
                40,
                14 * DAY,
            )
            .unwrap();

        // collateral {100, 300} and 40 to lock: exactly {10, 30}
        assert_eq!(engine.get_provider(&"alice".to_string()).unwrap().locked, 10);
        assert_eq!(engine.get_provider(&"bob".to_string()).unwrap().locked, 30);
        assert!(engine.state.total_claimed >= 40);
    }

    #[test]
    fn test_rejected_claim_restores_everything() {
        let (mut engine, pool_id) = engine_with_pool();
        let buyer = "buyer".to_string();
        let purchase = engine
            .purchase_shield(&ctx(T0), &buyer, pool_id, 200, "bridge assets".into())
            .unwrap();
        let router = ProposalRouter::new();
        let payload = shield_claim(1, pool_id, purchase.purchase_id, 50);

        router.submit(&mut engine, &ctx(T0 + DAY), &payload).unwrap();
        router
            .finalize(
                &mut engine,
                &ctx(T0 + 8 * DAY),
                &payload,
                &ProposalOutcome::Rejected,
            )
            .unwrap();

        // shield-side bookkeeping is back to the pre-claim values
        assert_eq!(engine.state.total_shield, 200);
        assert_eq!(engine.state.total_claimed, 0);
        assert_eq!(engine.get_pool(pool_id).unwrap().total_shield_issued, 200);
        assert_eq!(
            engine
                .get_purchase(pool_id, &buyer, purchase.purchase_id)
                .unwrap()
                .shield,
            200
        );
        for provider in engine.list_providers() {
            assert_eq!(provider.locked, 0);
            assert_eq!(provider.collateral, if provider.address == "alice" { 100 } else { 300 });
            assert!(provider.locked_by_proposal.is_empty());
        }
    }

    #[test]
    fn test_expired_claim_restores_like_a_rejection() {
        let (mut engine, pool_id) = engine_with_pool();
        let buyer = "buyer".to_string();
        let purchase = engine
            .purchase_shield(&ctx(T0), &buyer, pool_id, 200, "bridge assets".into())
            .unwrap();
        let router = ProposalRouter::new();
        let payload = shield_claim(1, pool_id, purchase.purchase_id, 50);

        router.submit(&mut engine, &ctx(T0 + DAY), &payload).unwrap();
        router
            .finalize(
                &mut engine,
                &ctx(T0 + 20 * DAY),
                &payload,
                &ProposalOutcome::Expired,
            )
            .unwrap();
        assert_eq!(engine.state.total_claimed, 0);
        assert_eq!(engine.state.total_shield, 200);
    }

    #[test]
    fn test_approved_claim_pays_and_reduces_providers_pro_rata() {
        let (mut engine, pool_id) = engine_with_pool();
        let buyer = "buyer".to_string();
        let purchase = engine
            .purchase_shield(&ctx(T0), &buyer, pool_id, 200, "bridge assets".into())
            .unwrap();
        let router = ProposalRouter::new();
        let payload = shield_claim(1, pool_id, purchase.purchase_id, 40);

        router.submit(&mut engine, &ctx(T0 + DAY), &payload).unwrap();
        let victim_before = engine.bank.balance_of("buyer");
        router
            .finalize(
                &mut engine,
                &ctx(T0 + 8 * DAY),
                &payload,
                &ProposalOutcome::Approved {
                    beneficiary: buyer.clone(),
                    amount: 40,
                },
            )
            .unwrap();

        assert_eq!(engine.bank.balance_of("buyer"), victim_before + 40);
        assert_eq!(engine.get_provider(&"alice".to_string()).unwrap().collateral, 90);
        assert_eq!(engine.get_provider(&"bob".to_string()).unwrap().collateral, 270);
        assert_eq!(engine.state.total_collateral, 360);
        assert_eq!(engine.state.total_claimed, 0);
        // the paid shield stays burned
        assert_eq!(engine.state.total_shield, 160);

        // the system keeps running: the per-block hook stays consistent
        engine.end_block(&ctx(T0 + 9 * DAY));
    }

    #[test]
    fn test_invariants_hold_across_a_busy_lifecycle() {
        let (mut engine, pool_id) = engine_with_pool();
        let buyer = "buyer".to_string();
        let router = ProposalRouter::new();

        let p1 = engine
            .purchase_shield(&ctx(T0), &buyer, pool_id, 120, "vault one".into())
            .unwrap();
        let p2 = engine
            .purchase_shield(&ctx(T0 + DAY), &buyer, pool_id, 100, "vault two".into())
            .unwrap();
        engine.end_block(&ctx(T0 + DAY));

        let claim1 = shield_claim(1, pool_id, p1.purchase_id, 30);
        router.submit(&mut engine, &ctx(T0 + 2 * DAY), &claim1).unwrap();
        engine.end_block(&ctx(T0 + 2 * DAY));

        let claim2 = shield_claim(2, pool_id, p2.purchase_id, 45);
        router.submit(&mut engine, &ctx(T0 + 3 * DAY), &claim2).unwrap();
        engine.end_block(&ctx(T0 + 3 * DAY));

        router
            .finalize(
                &mut engine,
                &ctx(T0 + 10 * DAY),
                &claim1,
                &ProposalOutcome::Approved {
                    beneficiary: buyer.clone(),
                    amount: 30,
                },
            )
            .unwrap();
        router
            .finalize(
                &mut engine,
                &ctx(T0 + 11 * DAY),
                &claim2,
                &ProposalOutcome::Rejected,
            )
            .unwrap();

        // run blocks until every purchase expires and verify the state
        // drains cleanly
        for day in 12..60 {
            engine.end_block(&ctx(T0 + day * DAY));
        }
        assert_eq!(engine.state.total_shield, 0);
        assert_eq!(engine.state.total_claimed, 0);
        assert!(engine.state.purchase_queue.is_empty());
    }
}
