//! Property tests: random operation sequences never break pool accounting

use proptest::prelude::*;
use stakepool_core::{
    estimate_rewards, Address, Amount, DepositId, InMemoryLedger, ManualClock, PoolEngine,
    SignerSet, WithdrawalKind,
};
use std::sync::Arc;

const STAKERS: usize = 3;

#[derive(Clone, Debug)]
enum Op {
    Fund(Amount),
    ChangeCooldown(i64),
    EnableEmergency,
    DrainRewards,
    Stake { staker: usize, id: DepositId, amount: Amount },
    Activate { staker: usize, id: DepositId },
    Unstake { staker: usize, id: DepositId },
    UnstakeEmergency { staker: usize, id: DepositId },
    Advance(i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let staker = 0..STAKERS;
    let id = 0u64..4;
    prop_oneof![
        (0u64..500).prop_map(Op::Fund),
        (-2i64..20).prop_map(Op::ChangeCooldown),
        Just(Op::EnableEmergency),
        Just(Op::DrainRewards),
        (staker.clone(), id.clone(), 0u64..400)
            .prop_map(|(staker, id, amount)| Op::Stake { staker, id, amount }),
        (staker.clone(), id.clone()).prop_map(|(staker, id)| Op::Activate { staker, id }),
        (staker.clone(), id.clone()).prop_map(|(staker, id)| Op::Unstake { staker, id }),
        (staker, id).prop_map(|(staker, id)| Op::UnstakeEmergency { staker, id }),
        (0i64..15).prop_map(Op::Advance),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_random_sequences_preserve_invariants(
        funding in 0u64..2_000,
        cooldown in 1i64..10,
        ops in prop::collection::vec(op_strategy(), 1..60),
    ) {
        let ledger = Arc::new(InMemoryLedger::new());
        let clock = Arc::new(ManualClock::new(0));
        let signers = Arc::new(SignerSet::new());
        let mint = Address::from_label("stake-token");
        let creator = Address::from_label("creator");
        signers.add(creator);
        ledger.mint_to(&mint, &creator, 50_000).unwrap();

        let stakers: Vec<Address> = (0..STAKERS)
            .map(|i| {
                let staker = Address::from_label(&format!("staker-{i}"));
                signers.add(staker);
                ledger.mint_to(&mint, &staker, 2_000).unwrap();
                staker
            })
            .collect();

        let engine = PoolEngine::new(ledger.clone(), clock.clone(), signers);
        let pool = engine.create_pool(&creator, 1, mint, funding, cooldown).unwrap();
        let supply = ledger.total_supply(&mint);

        for op in ops {
            let before = engine.pool(&pool).unwrap();
            let result = match op {
                Op::Fund(amount) => engine.fund_pool(&creator, pool, amount).map(|_| ()),
                Op::ChangeCooldown(seconds) => {
                    engine.change_pool_cooldown(&creator, pool, seconds).map(|_| ())
                }
                Op::EnableEmergency => engine.enable_emergency_mode(&creator, pool).map(|_| ()),
                Op::DrainRewards => engine.withdraw_rewards_emergency(&creator, pool).map(|_| ()),
                Op::Stake { staker, id, amount } => {
                    engine.stake(&stakers[staker], pool, id, amount).map(|_| ())
                }
                Op::Activate { staker, id } => {
                    engine.activate_cooldown(&stakers[staker], pool, id).map(|_| ())
                }
                Op::Unstake { staker, id } => engine.unstake(&stakers[staker], pool, id).map(|_| ()),
                Op::UnstakeEmergency { staker, id } => {
                    engine.unstake_emergency(&stakers[staker], pool, id).map(|_| ())
                }
                Op::Advance(seconds) => {
                    clock.advance(seconds);
                    Ok(())
                }
            };

            let after = engine.pool(&pool).unwrap();
            if result.is_err() {
                prop_assert_eq!(&after, &before);
            }
            prop_assert!(!before.emergency_mode_enabled || after.emergency_mode_enabled);

            let violations = engine.audit_pool(&pool).unwrap();
            prop_assert!(violations.is_empty(), "{:?}", violations);
            prop_assert_eq!(ledger.total_supply(&mint), supply);
        }

        for deposit in engine.deposits_in_pool(&pool) {
            let stats = engine.staker_stats(&deposit.staker).unwrap();
            prop_assert!(stats.deposit_count >= stats.active_deposits);
            if deposit.withdrawal == Some(WithdrawalKind::Emergency) {
                prop_assert_eq!(deposit.tokens_claimed, 0);
            }
        }
    }

    #[test]
    fn test_estimate_never_exceeds_reserve(
        total in 1u64..=u64::MAX,
        share in 0.0f64..=1.0,
        rewards in any::<u64>(),
    ) {
        let user = ((total as f64) * share) as u64;
        let user = user.min(total);
        let reward = estimate_rewards(total, user, rewards).unwrap();
        prop_assert!(reward <= rewards);
        if user == total {
            prop_assert_eq!(reward, rewards);
        }
    }
}
