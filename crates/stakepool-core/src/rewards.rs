//! # Reward Accounting
//!
//! A withdrawing deposit receives a share of the pool's reward reserve as it
//! stands at the moment of withdrawal:
//!
//! ```text
//! entitlement = floor(current_rewards * tokens_deposited / current_tokens_staked)
//! ```
//!
//! The aggregates are read before the withdrawal's own decrements. A single
//! staker exiting with the whole stake receives the whole reserve. Flooring
//! leaves small residues behind, so later claimants receive a slightly larger
//! relative share of what remains.
//!
//! The rule sits behind [`RewardAccountant`] so an accumulator-per-share model
//! can replace it without touching the deposit state machine.

use crate::error::{Result, StakingError};
use crate::state::{StakerDeposit, StakingPool};
use crate::types::Amount;

/// Computes the reward paid to a deposit on normal withdrawal
pub trait RewardAccountant: Send + Sync {
    fn entitlement(&self, pool: &StakingPool, deposit: &StakerDeposit) -> Result<Amount>;
}

/// Proportional share of the live reward reserve
#[derive(Clone, Copy, Debug, Default)]
pub struct LiveRatioAccountant;

impl RewardAccountant for LiveRatioAccountant {
    fn entitlement(&self, pool: &StakingPool, deposit: &StakerDeposit) -> Result<Amount> {
        estimate_rewards(
            pool.current_tokens_staked,
            deposit.tokens_deposited,
            pool.current_rewards,
        )
    }
}

/// `floor(total_rewards * user_staked / total_staked)` in 128-bit arithmetic
///
/// Fails closed with `ArithmeticOverflow` when the pool reports no stake, or
/// when the user's stake exceeds the pool's (an accounting breach, not a
/// rounding case).
pub fn estimate_rewards(
    total_staked: Amount,
    user_staked: Amount,
    total_rewards: Amount,
) -> Result<Amount> {
    if user_staked > total_staked {
        return Err(StakingError::ArithmeticOverflow);
    }

    let share = (total_rewards as u128)
        .checked_mul(user_staked as u128)
        .and_then(|product| product.checked_div(total_staked as u128))
        .ok_or(StakingError::ArithmeticOverflow)?;

    Amount::try_from(share).map_err(|_| StakingError::ArithmeticOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, DepositKey, PoolKey};

    #[test]
    fn test_sole_staker_takes_everything() {
        assert_eq!(estimate_rewards(200, 200, 1000).unwrap(), 1000);
    }

    #[test]
    fn test_proportional_share_floors() {
        // 1000 * 100 / 300 = 333.33
        assert_eq!(estimate_rewards(300, 100, 1000).unwrap(), 333);
        assert_eq!(estimate_rewards(300, 200, 1000).unwrap(), 666);
    }

    #[test]
    fn test_later_claimant_collects_residue() {
        // Three equal stakers exit one after another
        let mut staked = 300;
        let mut rewards = 1000;
        let mut paid = Vec::new();
        for _ in 0..3 {
            let share = estimate_rewards(staked, 100, rewards).unwrap();
            paid.push(share);
            staked -= 100;
            rewards -= share;
        }

        assert_eq!(paid, vec![333, 333, 334]);
        assert_eq!(rewards, 0);
    }

    #[test]
    fn test_no_overflow_at_extremes() {
        assert_eq!(
            estimate_rewards(Amount::MAX, Amount::MAX, Amount::MAX).unwrap(),
            Amount::MAX
        );
        assert_eq!(estimate_rewards(Amount::MAX, 1, Amount::MAX).unwrap(), 1);
    }

    #[test]
    fn test_empty_pool_fails_closed() {
        assert_eq!(estimate_rewards(0, 0, 1000), Err(StakingError::ArithmeticOverflow));
        assert_eq!(estimate_rewards(10, 11, 1000), Err(StakingError::ArithmeticOverflow));
    }

    #[test]
    fn test_zero_rewards() {
        assert_eq!(estimate_rewards(500, 100, 0).unwrap(), 0);
    }

    #[test]
    fn test_accountant_reads_pool_aggregates() {
        let key = PoolKey::new(Address::from_label("creator"), 1);
        let mut pool = StakingPool::new(key, Address::from_label("mint"), 900, 5, 0);
        pool.current_tokens_staked = 300;
        let deposit = StakerDeposit::new(
            DepositKey::new(Address::from_label("staker"), key, 1),
            100,
            0,
        );

        assert_eq!(LiveRatioAccountant.entitlement(&pool, &deposit).unwrap(), 300);
    }
}
