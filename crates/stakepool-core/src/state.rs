//! # Pool Records
//!
//! The three persisted records and the transitions each one permits.
//!
//! ## Deposit lifecycle
//!
//! ```text
//!   stake ──► Active ──activate_cooldown──► CooldownActive ──unstake──► Withdrawn
//!               │                               │
//!               └──────── unstake_emergency ────┴──────────────► WithdrawnEmergency
//! ```
//!
//! Both withdrawn states are terminal. The emergency edge is only taken while
//! the pool is in emergency mode and ignores the cooldown entirely.

use crate::error::{Result, StakingError};
use crate::types::{Address, Amount, DepositId, DepositKey, MintId, PoolId, PoolKey, Timestamp};
use serde::{Deserialize, Serialize};

/// Aggregate state of one staking pool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingPool {
    pub pool_id: PoolId,
    pub creator: Address,

    /// Asset staked and paid out by this pool
    pub mint: MintId,

    /// Custodial account, derived from the pool key
    pub vault: Address,

    /// Principal of all deposits not yet withdrawn
    pub current_tokens_staked: Amount,

    /// Unclaimed reward reserve
    pub current_rewards: Amount,

    /// Seconds between activating a cooldown and being allowed to unstake
    pub claim_cooldown_seconds: i64,

    /// One-way switch; once set it is never cleared
    pub emergency_mode_enabled: bool,

    pub created_at: Timestamp,
}

impl StakingPool {
    pub fn new(
        key: PoolKey,
        mint: MintId,
        initial_funding: Amount,
        claim_cooldown_seconds: i64,
        created_at: Timestamp,
    ) -> Self {
        Self {
            pool_id: key.pool_id,
            creator: key.creator,
            mint,
            vault: key.vault(),
            current_tokens_staked: 0,
            current_rewards: initial_funding,
            claim_cooldown_seconds,
            emergency_mode_enabled: false,
            created_at,
        }
    }

    pub fn key(&self) -> PoolKey {
        PoolKey::new(self.creator, self.pool_id)
    }

    /// Balance the vault must hold: staked principal plus reward reserve
    pub fn expected_vault_balance(&self) -> u128 {
        self.current_tokens_staked as u128 + self.current_rewards as u128
    }
}

/// How a deposit was closed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalKind {
    /// Normal unstake after cooldown, principal plus reward share
    Standard,
    /// Emergency unstake, principal only
    Emergency,
}

/// Lifecycle state derived from a deposit's flags
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositState {
    Active,
    CooldownActive,
    Withdrawn,
    WithdrawnEmergency,
}

impl DepositState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Withdrawn | Self::WithdrawnEmergency)
    }
}

/// One staking event by one staker into one pool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakerDeposit {
    pub staker: Address,

    /// Pool this deposit belongs to (lookup key, not an owning link)
    pub pool: PoolKey,

    pub deposit_id: DepositId,

    /// Principal, fixed at creation
    pub tokens_deposited: Amount,

    /// Reward paid out on withdrawal
    pub tokens_claimed: Amount,

    pub deposited_at: Timestamp,

    pub is_cooldown_active: bool,
    pub cooldown_activated_at: Option<Timestamp>,

    pub is_withdrawn: bool,
    pub withdrawal: Option<WithdrawalKind>,
    pub withdrawn_at: Option<Timestamp>,
}

impl StakerDeposit {
    pub fn new(key: DepositKey, amount: Amount, deposited_at: Timestamp) -> Self {
        Self {
            staker: key.staker,
            pool: key.pool,
            deposit_id: key.deposit_id,
            tokens_deposited: amount,
            tokens_claimed: 0,
            deposited_at,
            is_cooldown_active: false,
            cooldown_activated_at: None,
            is_withdrawn: false,
            withdrawal: None,
            withdrawn_at: None,
        }
    }

    pub fn key(&self) -> DepositKey {
        DepositKey::new(self.staker, self.pool, self.deposit_id)
    }

    pub fn state(&self) -> DepositState {
        match (self.withdrawal, self.is_cooldown_active) {
            (Some(WithdrawalKind::Standard), _) => DepositState::Withdrawn,
            (Some(WithdrawalKind::Emergency), _) => DepositState::WithdrawnEmergency,
            (None, true) => DepositState::CooldownActive,
            (None, false) => DepositState::Active,
        }
    }

    /// When the deposit becomes claimable under `claim_cooldown_seconds`
    ///
    /// `None` while no cooldown has been activated.
    pub fn unlocks_at(&self, claim_cooldown_seconds: i64) -> Result<Option<Timestamp>> {
        self.cooldown_activated_at
            .map(|activated| {
                activated
                    .checked_add(claim_cooldown_seconds)
                    .ok_or(StakingError::ArithmeticOverflow)
            })
            .transpose()
    }

    pub fn ensure_open(&self) -> Result<()> {
        if self.is_withdrawn {
            return Err(StakingError::AlreadyWithdrawn);
        }
        Ok(())
    }

    /// Check the cooldown may be started
    pub fn ensure_can_activate(&self) -> Result<()> {
        self.ensure_open()?;
        if self.is_cooldown_active {
            return Err(StakingError::AlreadyActive);
        }
        Ok(())
    }

    /// Check a normal unstake is allowed at `now`
    pub fn ensure_claimable(&self, claim_cooldown_seconds: i64, now: Timestamp) -> Result<()> {
        self.ensure_open()?;
        if !self.is_cooldown_active {
            return Err(StakingError::CooldownNotActive);
        }
        let unlocks_at = self
            .unlocks_at(claim_cooldown_seconds)?
            .ok_or(StakingError::CooldownNotActive)?;
        if now < unlocks_at {
            return Err(StakingError::ClaimCooldownNotElapsed { unlocks_at, now });
        }
        Ok(())
    }

    pub fn activate_cooldown(&mut self, now: Timestamp) {
        self.is_cooldown_active = true;
        self.cooldown_activated_at = Some(now);
    }

    /// Mark the deposit withdrawn; no further transitions are allowed
    pub fn close(&mut self, kind: WithdrawalKind, reward: Amount, now: Timestamp) {
        self.is_withdrawn = true;
        self.withdrawal = Some(kind);
        self.withdrawn_at = Some(now);
        self.tokens_claimed = reward;
    }
}

/// Per-staker counters across all pools
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakerStats {
    pub staker: Address,

    /// Principal currently staked across pools
    pub total_staked: Amount,

    /// Deposits not yet withdrawn
    pub active_deposits: u64,

    /// Deposits ever created
    pub deposit_count: u64,

    /// Rewards received through normal unstakes
    pub total_rewards_claimed: Amount,
}

impl StakerStats {
    pub fn new(staker: Address) -> Self {
        Self {
            staker,
            ..Self::default()
        }
    }

    pub fn record_deposit(&mut self, amount: Amount) -> Result<()> {
        self.total_staked = checked_add(self.total_staked, amount)?;
        self.active_deposits = self
            .active_deposits
            .checked_add(1)
            .ok_or(StakingError::ArithmeticOverflow)?;
        self.deposit_count = self
            .deposit_count
            .checked_add(1)
            .ok_or(StakingError::ArithmeticOverflow)?;
        Ok(())
    }

    pub fn record_withdrawal(&mut self, principal: Amount, reward: Amount) -> Result<()> {
        self.total_staked = checked_sub(self.total_staked, principal)?;
        self.active_deposits = self
            .active_deposits
            .checked_sub(1)
            .ok_or(StakingError::ArithmeticOverflow)?;
        self.total_rewards_claimed = checked_add(self.total_rewards_claimed, reward)?;
        Ok(())
    }
}

pub(crate) fn checked_add(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_add(b).ok_or(StakingError::ArithmeticOverflow)
}

pub(crate) fn checked_sub(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_sub(b).ok_or(StakingError::ArithmeticOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deposit() -> StakerDeposit {
        let pool = PoolKey::new(Address::from_label("creator"), 1);
        StakerDeposit::new(DepositKey::new(Address::from_label("staker"), pool, 7), 200, 0)
    }

    #[test]
    fn test_new_pool() {
        let key = PoolKey::new(Address::from_label("creator"), 1);
        let pool = StakingPool::new(key, Address::from_label("mint"), 1000, 5, 0);

        assert_eq!(pool.key(), key);
        assert_eq!(pool.vault, key.vault());
        assert_eq!(pool.current_tokens_staked, 0);
        assert_eq!(pool.current_rewards, 1000);
        assert!(!pool.emergency_mode_enabled);
        assert_eq!(pool.expected_vault_balance(), 1000);
    }

    #[test]
    fn test_deposit_lifecycle() {
        let mut d = deposit();
        assert_eq!(d.state(), DepositState::Active);
        assert_eq!(d.unlocks_at(5).unwrap(), None);
        assert_eq!(d.ensure_claimable(5, 100), Err(StakingError::CooldownNotActive));

        d.ensure_can_activate().unwrap();
        d.activate_cooldown(10);
        assert_eq!(d.state(), DepositState::CooldownActive);
        assert_eq!(d.unlocks_at(5).unwrap(), Some(15));
        assert_eq!(d.ensure_can_activate(), Err(StakingError::AlreadyActive));

        assert_eq!(
            d.ensure_claimable(5, 14),
            Err(StakingError::ClaimCooldownNotElapsed { unlocks_at: 15, now: 14 })
        );
        d.ensure_claimable(5, 15).unwrap();

        d.close(WithdrawalKind::Standard, 40, 15);
        assert_eq!(d.state(), DepositState::Withdrawn);
        assert!(d.state().is_terminal());
        assert_eq!(d.tokens_claimed, 40);
        assert_eq!(d.ensure_claimable(5, 100), Err(StakingError::AlreadyWithdrawn));
        assert_eq!(d.ensure_can_activate(), Err(StakingError::AlreadyWithdrawn));
    }

    #[test]
    fn test_cooldown_uses_supplied_duration() {
        let mut d = deposit();
        d.activate_cooldown(10);

        // Shortened cooldown applies to an already-active cooldown
        d.ensure_claimable(1, 11).unwrap();
        assert!(d.ensure_claimable(100, 11).is_err());
    }

    #[test]
    fn test_unlock_overflow_fails_closed() {
        let mut d = deposit();
        d.activate_cooldown(i64::MAX - 1);
        assert_eq!(d.unlocks_at(5), Err(StakingError::ArithmeticOverflow));
        assert_eq!(d.ensure_claimable(5, i64::MAX), Err(StakingError::ArithmeticOverflow));
    }

    #[test]
    fn test_emergency_close() {
        let mut d = deposit();
        d.close(WithdrawalKind::Emergency, 0, 3);
        assert_eq!(d.state(), DepositState::WithdrawnEmergency);
        assert_eq!(d.withdrawn_at, Some(3));
    }

    #[test]
    fn test_staker_stats() {
        let mut stats = StakerStats::new(Address::from_label("staker"));
        stats.record_deposit(200).unwrap();
        stats.record_deposit(50).unwrap();
        assert_eq!(stats.total_staked, 250);
        assert_eq!(stats.active_deposits, 2);
        assert_eq!(stats.deposit_count, 2);

        stats.record_withdrawal(200, 30).unwrap();
        assert_eq!(stats.total_staked, 50);
        assert_eq!(stats.active_deposits, 1);
        assert_eq!(stats.deposit_count, 2);
        assert_eq!(stats.total_rewards_claimed, 30);

        assert_eq!(
            stats.record_withdrawal(51, 0),
            Err(StakingError::ArithmeticOverflow)
        );
    }
}
