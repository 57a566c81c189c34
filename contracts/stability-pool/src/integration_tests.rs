//! Integration Tests
//!
//! End-to-end scenarios driving the pool through its public operations with
//! an in-memory ledger standing in for the host's token ledgers.

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;
    use num_traits::Zero;
    use proptest::prelude::*;

    use stabilio_common::{
        constants::{issuance::SUPPLY_CAP, precision::DECIMAL_PRECISION},
        errors::{PoolError, PoolResult},
        events::{EventType, PoolEvent},
        math::mul_div,
        types::{Address, Asset, Timestamp},
    };

    use crate::accumulator::SumKind;
    use crate::config::{IssuanceConfig, PoolConfig};
    use crate::ledger::{AssetLedger, InMemoryLedger};
    use crate::pool::{DepositRequest, OffsetRequest, OffsetResult, StabilityPool, WithdrawRequest};

    const ONE: u128 = DECIMAL_PRECISION;
    const ENGINE: Address = [0xEE; 32];
    const ALICE: Address = [1u8; 32];
    const BOB: Address = [2u8; 32];
    const CAROL: Address = [3u8; 32];
    const FRONT_END: Address = [0xFE; 32];
    const DAY: Timestamp = 86_400;

    fn quiet_pool() -> StabilityPool {
        let config = PoolConfig::new(ENGINE).with_issuance(IssuanceConfig::disabled());
        StabilityPool::new(config).unwrap()
    }

    fn rewarding_pool() -> StabilityPool {
        let config = PoolConfig::new(ENGINE).with_issuance(IssuanceConfig::starting_at(0));
        StabilityPool::new(config).unwrap()
    }

    fn funded(accounts: &[(Address, u128)]) -> InMemoryLedger {
        let mut ledger = InMemoryLedger::new();
        for (account, amount) in accounts {
            ledger.credit(Asset::Stable, *account, *amount).unwrap();
        }
        ledger
    }

    fn deposit(
        pool: &mut StabilityPool,
        ledger: &mut InMemoryLedger,
        depositor: Address,
        amount: u128,
        timestamp: Timestamp,
    ) {
        let request = DepositRequest { depositor, amount, front_end: None, timestamp };
        pool.deposit(ledger, &request).unwrap();
    }

    /// The liquidation engine hands the collateral over, then calls offset
    fn absorb(
        pool: &mut StabilityPool,
        ledger: &mut InMemoryLedger,
        debt: u128,
        collateral: u128,
        timestamp: Timestamp,
    ) -> OffsetResult {
        ledger.credit_pool(Asset::Collateral, collateral).unwrap();
        pool.offset(&OffsetRequest { caller: ENGINE, debt, collateral, timestamp }).unwrap()
    }

    fn withdraw_all(
        pool: &mut StabilityPool,
        ledger: &mut InMemoryLedger,
        depositor: Address,
        timestamp: Timestamp,
    ) -> crate::pool::WithdrawResult {
        let request = WithdrawRequest { depositor, amount: u128::MAX, timestamp };
        pool.withdraw(ledger, &request).unwrap()
    }

    fn assert_close(actual: u128, expected: &BigUint) {
        assert!(!expected.is_zero());
        let actual_big = BigUint::from(actual);
        let diff = if actual_big > *expected {
            &actual_big - expected
        } else {
            expected - &actual_big
        };
        assert!(
            diff * 1_000_000_000u32 <= *expected,
            "{actual} differs from {expected} by more than 1e-9"
        );
    }

    /// Ledger that refuses to pay out one asset
    struct RejectingLedger {
        inner: InMemoryLedger,
        rejected: Asset,
    }

    impl AssetLedger for RejectingLedger {
        fn transfer_in(&mut self, asset: Asset, from: &Address, amount: u128) -> PoolResult<()> {
            self.inner.transfer_in(asset, from, amount)
        }

        fn transfer_out(&mut self, asset: Asset, to: &Address, amount: u128) -> PoolResult<()> {
            if asset == self.rejected {
                return Err(PoolError::TransferFailed { asset, account: *to, amount });
            }
            self.inner.transfer_out(asset, to, amount)
        }
    }

    // ============================================================================
    // Distribution
    // ============================================================================

    #[test]
    fn test_equal_deposits_share_equally() {
        let mut pool = quiet_pool();
        let depositors = [ALICE, BOB, CAROL];
        let mut ledger = funded(&depositors.map(|d| (d, 10_000 * ONE)));
        for depositor in depositors {
            deposit(&mut pool, &mut ledger, depositor, 10_000 * ONE, 0);
        }

        absorb(&mut pool, &mut ledger, 10_000 * ONE, 995 * ONE / 10, 60);

        for depositor in depositors {
            assert_eq!(pool.compounded_deposit(&depositor).unwrap(), 6_666_666_666_666_666_660_000);
            assert_eq!(pool.depositor_collateral_gain(&depositor).unwrap(), 33_166_666_666_666_660_000);
        }

        for depositor in depositors {
            let result = withdraw_all(&mut pool, &mut ledger, depositor, 120);
            assert_eq!(result.amount_withdrawn, 6_666_666_666_666_666_660_000);
            assert_eq!(result.gains.collateral_gain, 33_166_666_666_666_660_000);
            assert_eq!(result.gains.deposit_loss, 10_000 * ONE - 6_666_666_666_666_666_660_000);
            assert_eq!(ledger.balance(Asset::Collateral, &depositor), 33_166_666_666_666_660_000);
        }

        // Only rounding dust stays behind
        assert_eq!(pool.depositor_count(), 0);
        assert_eq!(pool.total_deposits(), 20_000);
        assert_eq!(pool.collateral_balance(), 20_000);
    }

    #[test]
    fn test_later_deposit_does_not_share_earlier_offset() {
        let mut pool = quiet_pool();
        let mut ledger = funded(&[(ALICE, 100 * ONE), (BOB, 100 * ONE)]);

        deposit(&mut pool, &mut ledger, ALICE, 100 * ONE, 0);
        absorb(&mut pool, &mut ledger, 50 * ONE, ONE, 60);
        deposit(&mut pool, &mut ledger, BOB, 100 * ONE, 120);

        assert_eq!(pool.compounded_deposit(&BOB).unwrap(), 100 * ONE);
        assert_eq!(pool.depositor_collateral_gain(&BOB).unwrap(), 0);
        assert_eq!(pool.compounded_deposit(&ALICE).unwrap(), 49_999_999_999_999_999_900);
        assert_eq!(pool.depositor_collateral_gain(&ALICE).unwrap(), ONE);

        // Second offset is shared 1:2 on the balances at that time
        absorb(&mut pool, &mut ledger, 30 * ONE, 3 * ONE, 180);
        let tolerance = 1_000_000_000;
        assert!(pool.compounded_deposit(&ALICE).unwrap().abs_diff(40 * ONE) < tolerance);
        assert!(pool.compounded_deposit(&BOB).unwrap().abs_diff(80 * ONE) < tolerance);
        assert!(pool.depositor_collateral_gain(&ALICE).unwrap().abs_diff(2 * ONE) < tolerance);
        assert!(pool.depositor_collateral_gain(&BOB).unwrap().abs_diff(2 * ONE) < tolerance);
    }

    #[test]
    fn test_pool_emptying_offset() {
        let mut pool = quiet_pool();
        let mut ledger = funded(&[(ALICE, 100 * ONE), (BOB, 100 * ONE), (CAROL, 10 * ONE)]);
        deposit(&mut pool, &mut ledger, ALICE, 100 * ONE, 0);
        deposit(&mut pool, &mut ledger, BOB, 100 * ONE, 0);

        let result = absorb(&mut pool, &mut ledger, 200 * ONE, 2 * ONE, 60);
        assert_eq!(result.new_pool_total, 0);
        assert_eq!(result.epoch, 1);
        assert_eq!(result.scale, 0);
        assert_eq!(result.product_p, ONE);

        assert_eq!(pool.compounded_deposit(&ALICE).unwrap(), 0);
        assert_eq!(pool.depositor_collateral_gain(&ALICE).unwrap(), ONE);

        // A fresh epoch accumulates independently
        deposit(&mut pool, &mut ledger, CAROL, 10 * ONE, 120);
        absorb(&mut pool, &mut ledger, 5 * ONE, ONE, 180);
        assert_eq!(pool.compounded_deposit(&CAROL).unwrap(), 4_999_999_999_999_999_990);
        assert_eq!(pool.depositor_collateral_gain(&CAROL).unwrap(), ONE);

        // Emptied deposits still claim their collateral, then close
        let claim = pool.claim_gains(&mut ledger, &ALICE, 240).unwrap();
        assert_eq!(claim.gains.collateral_gain, ONE);
        assert_eq!(claim.gains.deposit_loss, 100 * ONE);
        assert_eq!(claim.remaining_deposit, 0);
        assert!(pool.deposit_record(&ALICE).is_none());
        assert_eq!(ledger.balance(Asset::Collateral, &ALICE), ONE);
        assert_eq!(pool.total_deposits(), 5 * ONE);
    }

    #[test]
    fn test_two_rescales_track_exact_shares() {
        let mut pool = quiet_pool();
        let initial = [(ALICE, 200_000_000_000_000_000_000_000_000_000_000_000_000u128),
            (BOB, 100_000_000_000_000_000_000_000_000_000_000_000_000u128)];
        let mut ledger = funded(&initial);
        for (depositor, amount) in initial {
            deposit(&mut pool, &mut ledger, depositor, amount, 0);
        }
        let first_total = BigUint::from(pool.total_deposits());

        let mut collateral_sum = BigUint::zero();
        for step in 0..3u64 {
            // Each offset leaves one ten-millionth of the pool
            let total = pool.total_deposits();
            let debt = total - total / 10_000_000;
            let collateral = total / 1_000;
            absorb(&mut pool, &mut ledger, debt, collateral, 60 * (step + 1));
            collateral_sum += BigUint::from(collateral);

            for (depositor, _) in initial {
                pool.claim_gains(&mut ledger, &depositor, 60 * (step + 1)).unwrap();
            }
        }

        assert_eq!(pool.accumulator().current_scale(), 2);
        assert_eq!(pool.accumulator().current_epoch(), 0);

        let final_total = BigUint::from(pool.total_deposits());
        let mut compounded_sum = 0u128;
        for (depositor, amount) in initial {
            let compounded = pool.compounded_deposit(&depositor).unwrap();
            compounded_sum += compounded;
            assert_close(compounded, &(BigUint::from(amount) * &final_total / &first_total));
            assert_close(
                ledger.balance(Asset::Collateral, &depositor),
                &(BigUint::from(amount) * &collateral_sum / &first_total),
            );
        }
        assert!(compounded_sum <= pool.total_deposits());
    }

    #[test]
    fn test_extreme_magnitudes() {
        let mut pool = quiet_pool();
        let big = 1_000_000_000_000_000_000_000_000_000_000_000_000u128;
        let mut ledger = funded(&[(ALICE, big), (BOB, big)]);
        deposit(&mut pool, &mut ledger, ALICE, big, 0);
        deposit(&mut pool, &mut ledger, BOB, big, 0);

        let collateral = 995_000_000_000_000_000_000_000_000u128;
        absorb(&mut pool, &mut ledger, big, collateral, 60);

        for depositor in [ALICE, BOB] {
            assert!(pool.compounded_deposit(&depositor).unwrap().abs_diff(big / 2) <= ONE);
            assert_eq!(pool.depositor_collateral_gain(&depositor).unwrap(), collateral / 2);
        }

        // Three deposits near the top of the u128 range
        let mut pool = quiet_pool();
        let huge = 100 * big;
        let depositors = [ALICE, BOB, CAROL];
        let mut ledger = funded(&depositors.map(|d| (d, huge)));
        for depositor in depositors {
            deposit(&mut pool, &mut ledger, depositor, huge, 0);
        }
        let collateral = big / 1_000_000;
        absorb(&mut pool, &mut ledger, 3 * huge / 2, collateral, 60);

        for depositor in depositors {
            assert_close(pool.compounded_deposit(&depositor).unwrap(), &BigUint::from(huge / 2));
            assert_close(
                pool.depositor_collateral_gain(&depositor).unwrap(),
                &(BigUint::from(collateral) / 3u32),
            );
        }
    }

    #[test]
    fn test_tiny_collateral_gain_rounds_to_zero() {
        let mut pool = quiet_pool();
        let whale = 10_000_000_000_000_000_000_000_000_000_000_000_000u128;
        let mut ledger = funded(&[(ALICE, 100 * ONE), (BOB, whale)]);
        deposit(&mut pool, &mut ledger, ALICE, 100 * ONE, 0);
        deposit(&mut pool, &mut ledger, BOB, whale, 0);

        absorb(&mut pool, &mut ledger, 1, 1, 60);

        assert_eq!(pool.depositor_collateral_gain(&ALICE).unwrap(), 0);
        let claim = pool.claim_gains(&mut ledger, &ALICE, 120).unwrap();
        assert_eq!(claim.gains.collateral_gain, 0);
        assert_eq!(ledger.balance(Asset::Collateral, &ALICE), 0);
    }

    #[test]
    fn test_closed_deposit_is_not_touched_by_later_offset() {
        let mut pool = quiet_pool();
        let mut ledger = funded(&[(ALICE, 100 * ONE), (BOB, 100 * ONE)]);
        deposit(&mut pool, &mut ledger, ALICE, 100 * ONE, 0);
        let closed = withdraw_all(&mut pool, &mut ledger, ALICE, 60);
        assert_eq!(closed.amount_withdrawn, 100 * ONE);
        assert!(pool.deposit_record(&ALICE).is_none());

        deposit(&mut pool, &mut ledger, BOB, 100 * ONE, 120);
        absorb(&mut pool, &mut ledger, 50 * ONE, ONE, 180);

        assert_eq!(pool.compounded_deposit(&ALICE).unwrap(), 0);
        assert_eq!(pool.depositor_collateral_gain(&ALICE).unwrap(), 0);
        assert!(pool.compounded_deposit(&BOB).unwrap().abs_diff(50 * ONE) <= 1_000);
        assert_eq!(pool.depositor_collateral_gain(&BOB).unwrap(), ONE);
        assert_eq!(pool.depositor_count(), 1);
        assert_eq!(ledger.balance(Asset::Stable, &ALICE), 100 * ONE);
    }

    #[test]
    fn test_deep_loss_keeps_remainder_one_scale_behind() {
        let mut pool = quiet_pool();
        let total = 10_000_000_000_000 * ONE;
        let mut ledger = funded(&[(ALICE, total)]);
        deposit(&mut pool, &mut ledger, ALICE, total, 0);

        // 2e-10 of the pool survives, one scale down
        let result = absorb(&mut pool, &mut ledger, total - 2_000 * ONE, ONE, 60);
        assert_eq!(result.scale, 1);
        assert_eq!(result.new_pool_total, 2_000 * ONE);

        let compounded = pool.compounded_deposit(&ALICE).unwrap();
        assert_eq!(compounded, 1_999_999_990_000_000_000_000);

        let closed = withdraw_all(&mut pool, &mut ledger, ALICE, 120);
        assert_eq!(closed.amount_withdrawn, compounded);
        assert_eq!(pool.total_deposits(), 2_000 * ONE - compounded);
        assert!(pool.total_deposits() < ONE / 10_000);
    }

    #[test]
    fn test_collateral_gain_spans_scale_change() {
        let mut pool = quiet_pool();
        let total = 10_000_000_000 * ONE;
        let mut ledger = funded(&[(ALICE, total)]);
        deposit(&mut pool, &mut ledger, ALICE, total, 0);

        // First offset rescales P, second credits S at the next scale
        let first = absorb(&mut pool, &mut ledger, total - ONE, 3 * ONE, 60);
        assert_eq!(first.scale, 1);
        let second = absorb(&mut pool, &mut ledger, ONE / 2, 4 * ONE, 120);
        assert_eq!(second.scale, 1);
        assert!(!pool.accumulator().sum(SumKind::Collateral, 0, 1).is_zero());

        // Sole depositor is owed both liquidations
        let gain = pool.depositor_collateral_gain(&ALICE).unwrap();
        assert!(gain <= 7 * ONE);
        assert!(gain.abs_diff(7 * ONE) <= 7 * ONE / 10_000_000, "gain {gain}");
        let compounded = pool.compounded_deposit(&ALICE).unwrap();
        assert!(compounded.abs_diff(ONE / 2) <= ONE / 20_000_000, "deposit {compounded}");

        let closed = withdraw_all(&mut pool, &mut ledger, ALICE, 180);
        assert_eq!(closed.gains.collateral_gain, gain);
        assert_eq!(ledger.balance(Asset::Collateral, &ALICE), gain);
    }

    // ============================================================================
    // Atomicity
    // ============================================================================

    #[test]
    fn test_failed_payout_leaves_state_unchanged() {
        let mut pool = rewarding_pool();
        let mut inner = funded(&[(ALICE, 1_000 * ONE)]);
        deposit(&mut pool, &mut inner, ALICE, 1_000 * ONE, 0);
        absorb(&mut pool, &mut inner, 100 * ONE, 2 * ONE, 3_600);

        let digest = pool.state_digest().unwrap();
        let events_len = pool.events().len();
        let mut ledger = RejectingLedger { inner, rejected: Asset::Reward };
        let ledger_before = ledger.inner.clone();

        let request = WithdrawRequest { depositor: ALICE, amount: 500 * ONE, timestamp: 7_200 };
        let result = pool.withdraw(&mut ledger, &request);

        assert!(matches!(result, Err(PoolError::TransferFailed { asset: Asset::Reward, .. })));
        assert_eq!(pool.state_digest().unwrap(), digest);
        assert_eq!(pool.events().len(), events_len);
        assert_eq!(ledger.inner, ledger_before);

        // Once rewards can be paid the same withdrawal goes through
        ledger.inner.credit_pool(Asset::Reward, SUPPLY_CAP).unwrap();
        let result = pool.withdraw(&mut ledger.inner, &request).unwrap();
        assert_eq!(result.amount_withdrawn, 500 * ONE);
        assert!(result.gains.depositor_reward > 0);
        assert!(result.gains.collateral_gain > 0);
    }

    #[test]
    fn test_offset_rejections_leave_state_unchanged() {
        let mut pool = quiet_pool();
        let mut ledger = funded(&[(ALICE, 10 * ONE)]);
        deposit(&mut pool, &mut ledger, ALICE, 10 * ONE, 0);
        let digest = pool.state_digest().unwrap();

        let too_much = OffsetRequest { caller: ENGINE, debt: 11 * ONE, collateral: ONE, timestamp: 60 };
        assert!(matches!(pool.offset(&too_much), Err(PoolError::InsufficientPoolBalance { .. })));
        let stranger = OffsetRequest { caller: BOB, debt: ONE, collateral: ONE, timestamp: 60 };
        assert!(matches!(pool.offset(&stranger), Err(PoolError::Unauthorized { .. })));

        assert_eq!(pool.state_digest().unwrap(), digest);
    }

    #[test]
    fn test_collapsing_product_rejects_offset() {
        let mut pool = quiet_pool();
        let big = 1_000_000_000_000 * ONE;
        let kept = 2_000_000_000_000;
        let mut ledger = funded(&[(ALICE, big), (BOB, big), (CAROL, big)]);
        deposit(&mut pool, &mut ledger, ALICE, big, 0);

        // Each offset keeps 2e-18 of the pool; top-ups restore the total
        let first = absorb(&mut pool, &mut ledger, big - kept, 0, 60);
        assert_eq!((first.scale, first.product_p), (1, 1_000_000_000));
        deposit(&mut pool, &mut ledger, BOB, big - kept, 120);
        let second = absorb(&mut pool, &mut ledger, big - kept, 0, 180);
        assert_eq!((second.scale, second.product_p), (2, 2));
        deposit(&mut pool, &mut ledger, CAROL, big - kept, 240);
        assert_eq!(pool.total_deposits(), big);

        let digest = pool.state_digest().unwrap();
        let deep = OffsetRequest { caller: ENGINE, debt: big - kept, collateral: 0, timestamp: 300 };
        assert!(matches!(pool.offset(&deep), Err(PoolError::ProductCollapsed)));
        assert_eq!(pool.state_digest().unwrap(), digest);

        // A shallower loss still fits
        let half = absorb(&mut pool, &mut ledger, big / 2, 0, 360);
        assert_eq!((half.scale, half.product_p), (3, 1_000_000_000));
    }

    // ============================================================================
    // Front Ends and Issuance
    // ============================================================================

    #[test]
    fn test_front_end_kickback_split() {
        let mut pool = rewarding_pool();
        let mut ledger = funded(&[(ALICE, 1_000 * ONE), (BOB, 1_000 * ONE)]);
        ledger.credit_pool(Asset::Reward, SUPPLY_CAP).unwrap();

        // Front end passes 60% of its depositors' rewards on
        pool.register_front_end(&FRONT_END, 6 * ONE / 10, 0).unwrap();
        let tagged = DepositRequest {
            depositor: ALICE,
            amount: 1_000 * ONE,
            front_end: Some(FRONT_END),
            timestamp: 0,
        };
        pool.deposit(&mut ledger, &tagged).unwrap();
        deposit(&mut pool, &mut ledger, BOB, 1_000 * ONE, 0);

        let alice = pool.claim_gains(&mut ledger, &ALICE, 30 * DAY).unwrap().gains;
        let bob = pool.claim_gains(&mut ledger, &BOB, 30 * DAY).unwrap().gains;
        let issued = pool.total_rewards_issued();
        assert!(issued > 0);

        let alice_gross = alice.depositor_reward + alice.front_end_reward;
        assert!(alice_gross.abs_diff(issued / 2) < ONE / 1_000_000);
        assert!(bob.depositor_reward.abs_diff(issued / 2) < ONE / 1_000_000);
        assert_eq!(bob.front_end_reward, 0);
        assert!((alice.depositor_reward * 4).abs_diff(alice.front_end_reward * 6) < 100);
        assert!(alice.depositor_reward + alice.front_end_reward + bob.depositor_reward <= issued);

        assert_eq!(ledger.balance(Asset::Reward, &FRONT_END), alice.front_end_reward);
        assert_eq!(ledger.balance(Asset::Reward, &ALICE), alice.depositor_reward);

        // The front end's stake takes the same losses as its deposits
        absorb(&mut pool, &mut ledger, 1_000 * ONE, 0, 30 * DAY);
        assert_eq!(
            pool.compounded_front_end_stake(&FRONT_END).unwrap(),
            pool.compounded_deposit(&ALICE).unwrap()
        );
    }

    #[test]
    fn test_new_tagged_deposit_pays_front_end() {
        let mut pool = rewarding_pool();
        let mut ledger = funded(&[(ALICE, 1_000 * ONE), (CAROL, 500 * ONE)]);
        ledger.credit_pool(Asset::Reward, SUPPLY_CAP).unwrap();
        pool.register_front_end(&FRONT_END, ONE / 2, 0).unwrap();

        let tagged = |depositor, amount, timestamp| DepositRequest {
            depositor,
            amount,
            front_end: Some(FRONT_END),
            timestamp,
        };
        pool.deposit(&mut ledger, &tagged(ALICE, 1_000 * ONE, 0)).unwrap();
        pool.trigger_issuance(DAY).unwrap();
        let pending = pool.front_end_reward_gain(&FRONT_END).unwrap();
        assert!(pending > 0);
        pool.take_events();

        // First deposit of another depositor under the same front end
        let result = pool.deposit(&mut ledger, &tagged(CAROL, 500 * ONE, DAY)).unwrap();
        assert_eq!(result.gains.front_end_reward, pending);
        assert_eq!(result.gains.depositor_reward, 0);
        assert_eq!(result.gains.collateral_gain, 0);
        assert_eq!(ledger.balance(Asset::Reward, &FRONT_END), pending);
        assert_eq!(pool.front_end_reward_gain(&FRONT_END).unwrap(), 0);

        let events = pool.take_events();
        assert!(events.iter().any(|e| matches!(
            e,
            PoolEvent::RewardPaidToFrontEnd { front_end: FRONT_END, amount, .. } if *amount == pending
        )));

        // Nothing is paid twice
        let again = pool.claim_gains(&mut ledger, &ALICE, DAY).unwrap();
        assert_eq!(again.gains.front_end_reward, 0);
        assert_eq!(ledger.balance(Asset::Reward, &FRONT_END), pending);
    }

    #[test]
    fn test_issuance_halves_each_year() {
        let mut pool = rewarding_pool();
        let mut ledger = funded(&[(ALICE, 1_000 * ONE)]);
        deposit(&mut pool, &mut ledger, ALICE, 1_000 * ONE, 0);

        let first_year = pool.trigger_issuance(365 * DAY).unwrap();
        assert!(first_year.abs_diff(SUPPLY_CAP / 2) < SUPPLY_CAP / 1_000_000);
        assert!(pool.depositor_reward_gain(&ALICE).unwrap().abs_diff(first_year) < ONE / 1_000_000);

        let second_year = pool.trigger_issuance(2 * 365 * DAY).unwrap();
        assert!(second_year.abs_diff(SUPPLY_CAP / 4) < SUPPLY_CAP / 1_000_000);
        assert_eq!(pool.total_rewards_issued(), first_year + second_year);

        let issued = pool.events().filter_by_type(EventType::RewardIssued);
        assert_eq!(issued.len(), 2);
    }

    #[test]
    fn test_rewards_while_empty_are_not_credited() {
        let mut pool = rewarding_pool();
        let mut ledger = funded(&[(ALICE, ONE)]);

        let issued = pool.trigger_issuance(DAY).unwrap();
        assert!(issued > 0);
        assert!(pool.accumulator().current_sum_g().is_zero());

        deposit(&mut pool, &mut ledger, ALICE, ONE, DAY);
        assert_eq!(pool.depositor_reward_gain(&ALICE).unwrap(), 0);
    }

    // ============================================================================
    // Queries and Events
    // ============================================================================

    #[test]
    fn test_queries_do_not_change_state() {
        let mut pool = rewarding_pool();
        let mut ledger = funded(&[(ALICE, 100 * ONE)]);
        deposit(&mut pool, &mut ledger, ALICE, 100 * ONE, 0);
        absorb(&mut pool, &mut ledger, 10 * ONE, ONE, 600);

        let digest = pool.state_digest().unwrap();
        for _ in 0..2 {
            assert_eq!(
                pool.compounded_deposit(&ALICE).unwrap(),
                pool.compounded_deposit(&ALICE).unwrap()
            );
            pool.depositor_collateral_gain(&ALICE).unwrap();
            pool.depositor_reward_gain(&ALICE).unwrap();
        }
        assert_eq!(pool.state_digest().unwrap(), digest);
        assert_eq!(pool.compounded_deposit(&BOB).unwrap(), 0);
    }

    #[test]
    fn test_offset_events() {
        let mut pool = quiet_pool();
        let mut ledger = funded(&[(ALICE, 100 * ONE)]);
        deposit(&mut pool, &mut ledger, ALICE, 100 * ONE, 0);
        pool.take_events();

        absorb(&mut pool, &mut ledger, 100 * ONE, ONE, 60);
        let events = pool.take_events();

        assert!(events.iter().any(|e| matches!(e, PoolEvent::EpochUpdated { epoch: 1 })));
        assert!(events.iter().any(|e| matches!(
            e,
            PoolEvent::LiquidationOffset { new_pool_total: 0, timestamp: 60, .. }
        )));
        assert!(events.iter().any(|e| matches!(e, PoolEvent::SumUpdated { epoch: 0, scale: 0, .. })));
    }

    // ============================================================================
    // Conservation
    // ============================================================================

    #[derive(Debug, Clone)]
    enum Action {
        Deposit { who: usize, amount: u128 },
        Withdraw { who: usize, amount: u128 },
        Offset { per_mille: u128 },
        DeepOffset { keep_per_trillion: u128 },
    }

    const ACTORS: [Address; 4] = [[1u8; 32], [2u8; 32], [3u8; 32], [4u8; 32]];
    const MAX_AMOUNT: u128 = 1_000_000 * DECIMAL_PRECISION;

    fn action_strategy() -> impl Strategy<Value = Action> {
        prop_oneof![
            4 => (0usize..4, 1u128..=MAX_AMOUNT).prop_map(|(who, amount)| Action::Deposit { who, amount }),
            2 => (0usize..4, 0u128..=2 * MAX_AMOUNT).prop_map(|(who, amount)| Action::Withdraw { who, amount }),
            3 => (1u128..=1_000).prop_map(|per_mille| Action::Offset { per_mille }),
            2 => (4_000u128..=1_000_000_000).prop_map(|keep_per_trillion| Action::DeepOffset { keep_per_trillion }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_deposits_track_pool_total(actions in prop::collection::vec(action_strategy(), 1..40)) {
            let mut pool = quiet_pool();
            let mut ledger = funded(&ACTORS.map(|a| (a, u128::MAX / 8)));
            let mut max_total = 0u128;

            for (step, action) in actions.iter().enumerate() {
                let timestamp = step as Timestamp * 60;
                match *action {
                    Action::Deposit { who, amount } => {
                        deposit(&mut pool, &mut ledger, ACTORS[who], amount, timestamp);
                    }
                    Action::Withdraw { who, amount } => {
                        let request = WithdrawRequest { depositor: ACTORS[who], amount, timestamp };
                        match pool.withdraw(&mut ledger, &request) {
                            Ok(_) | Err(PoolError::DepositNotFound { .. }) => {}
                            Err(err) => prop_assert!(false, "withdraw failed: {err}"),
                        }
                    }
                    Action::Offset { per_mille } => {
                        let total = pool.total_deposits();
                        let debt = total / 1_000 * per_mille + total % 1_000 * per_mille / 1_000;
                        absorb(&mut pool, &mut ledger, debt, debt / 100, timestamp);
                    }
                    Action::DeepOffset { keep_per_trillion } => {
                        let total = pool.total_deposits();
                        let kept = mul_div(total, keep_per_trillion, 1_000_000_000_000).unwrap();
                        absorb(&mut pool, &mut ledger, total - kept, ONE, timestamp);
                    }
                }
                max_total = max_total.max(pool.total_deposits());

                let compounded: u128 = ACTORS
                    .iter()
                    .map(|a| pool.compounded_deposit(a).unwrap())
                    .sum();
                let total = pool.total_deposits();
                let tolerance = (step as u128 + 1) * (max_total / 100_000_000 + 1_000);
                prop_assert!(
                    compounded.abs_diff(total) <= tolerance,
                    "step {}: deposits {} vs pool {}", step, compounded, total
                );
            }
        }
    }
}
