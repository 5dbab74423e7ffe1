//! # Pool Engine
//!
//! The only component that mutates pool, deposit and staker-stats records.
//!
//! ## Atomicity
//!
//! Every operation runs in three phases:
//!
//! 1. **Validate**: authority, record state and all checked arithmetic are
//!    evaluated against a consistent snapshot. Any failure returns here.
//! 2. **Transfer**: at most one ledger transfer. A ledger failure returns
//!    here, still with nothing written.
//! 3. **Commit**: the precomputed values are written. This phase cannot fail.
//!
//! ## Locking
//!
//! ```text
//! pool table entry ──► pool shard (pool + its deposits) ──► staker stats entry ──► ledger
//! ```
//!
//! Locks are always taken left to right. Operations on different pools touch
//! different shards and proceed in parallel; operations on the same pool are
//! serialized by that pool's shard mutex.

use crate::authority::Authority;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{Result, StakingError};
use crate::events::PoolEvent;
use crate::instruction::Instruction;
use crate::invariants::{check_pool, InvariantViolation};
use crate::ledger::AssetLedger;
use crate::rewards::{LiveRatioAccountant, RewardAccountant};
use crate::state::{checked_add, checked_sub, StakerDeposit, StakerStats, StakingPool, WithdrawalKind};
use crate::types::{Address, Amount, DepositId, DepositKey, MintId, PoolId, PoolKey, Timestamp};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// A pool and the deposits filed under it, guarded together
struct PoolShard {
    pool: StakingPool,
    deposits: HashMap<(Address, DepositId), StakerDeposit>,
}

/// Operation dispatcher for every staking pool
pub struct PoolEngine {
    config: EngineConfig,
    ledger: Arc<dyn AssetLedger>,
    clock: Arc<dyn Clock>,
    authority: Arc<dyn Authority>,
    accountant: Arc<dyn RewardAccountant>,
    pools: DashMap<PoolKey, Arc<Mutex<PoolShard>>>,
    stats: DashMap<Address, StakerStats>,
    history: Mutex<VecDeque<PoolEvent>>,
}

impl PoolEngine {
    /// Create an engine with the default config and the live-ratio reward rule
    pub fn new(
        ledger: Arc<dyn AssetLedger>,
        clock: Arc<dyn Clock>,
        authority: Arc<dyn Authority>,
    ) -> Self {
        Self {
            config: EngineConfig::default(),
            ledger,
            clock,
            authority,
            accountant: Arc::new(LiveRatioAccountant),
            pools: DashMap::new(),
            stats: DashMap::new(),
            history: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the reward rule
    pub fn with_accountant(mut self, accountant: Arc<dyn RewardAccountant>) -> Self {
        self.accountant = accountant;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate and apply one instruction submitted by `caller`
    pub fn execute(&self, caller: &Address, instruction: Instruction) -> Result<PoolEvent> {
        let now = self.clock.now();
        let op = instruction.name();
        let pool_key = instruction.pool(caller);

        let result = match instruction {
            Instruction::CreatePool {
                pool_id,
                mint,
                initial_funding,
                claim_cooldown_seconds,
            } => self.process_create_pool(
                caller,
                pool_id,
                mint,
                initial_funding,
                claim_cooldown_seconds,
                now,
            ),
            Instruction::FundPool { pool, amount } => {
                self.process_fund_pool(caller, &pool, amount, now)
            }
            Instruction::ChangePoolCooldown {
                pool,
                new_cooldown_seconds,
            } => self.process_change_pool_cooldown(caller, &pool, new_cooldown_seconds, now),
            Instruction::EnableEmergencyMode { pool } => {
                self.process_enable_emergency_mode(caller, &pool, now)
            }
            Instruction::WithdrawRewardsEmergency { pool } => {
                self.process_withdraw_rewards_emergency(caller, &pool, now)
            }
            Instruction::Stake {
                pool,
                deposit_id,
                amount,
            } => self.process_stake(caller, &pool, deposit_id, amount, now),
            Instruction::ActivateCooldown { deposit } => {
                self.process_activate_cooldown(caller, &deposit, now)
            }
            Instruction::Unstake { deposit } => self.process_unstake(caller, &deposit, now),
            Instruction::UnstakeEmergency { deposit } => {
                self.process_unstake_emergency(caller, &deposit, now)
            }
        };

        match &result {
            Ok(event) => {
                tracing::info!(op, pool = %pool_key, caller = %caller, "instruction committed");
                self.after_commit(&pool_key, event);
            }
            Err(err) => {
                tracing::debug!(op, pool = %pool_key, caller = %caller, error = %err, "instruction rejected");
            }
        }
        result
    }

    // ********* POOL CREATOR OPERATIONS **************

    /// Create a pool owned by `creator`, returning its key
    pub fn create_pool(
        &self,
        creator: &Address,
        pool_id: PoolId,
        mint: MintId,
        initial_funding: Amount,
        claim_cooldown_seconds: i64,
    ) -> Result<PoolKey> {
        self.execute(
            creator,
            Instruction::CreatePool {
                pool_id,
                mint,
                initial_funding,
                claim_cooldown_seconds,
            },
        )?;
        Ok(PoolKey::new(*creator, pool_id))
    }

    pub fn fund_pool(&self, creator: &Address, pool: PoolKey, amount: Amount) -> Result<PoolEvent> {
        self.execute(creator, Instruction::FundPool { pool, amount })
    }

    pub fn change_pool_cooldown(
        &self,
        creator: &Address,
        pool: PoolKey,
        new_cooldown_seconds: i64,
    ) -> Result<PoolEvent> {
        self.execute(
            creator,
            Instruction::ChangePoolCooldown {
                pool,
                new_cooldown_seconds,
            },
        )
    }

    pub fn enable_emergency_mode(&self, creator: &Address, pool: PoolKey) -> Result<PoolEvent> {
        self.execute(creator, Instruction::EnableEmergencyMode { pool })
    }

    pub fn withdraw_rewards_emergency(&self, creator: &Address, pool: PoolKey) -> Result<PoolEvent> {
        self.execute(creator, Instruction::WithdrawRewardsEmergency { pool })
    }

    // ********* STAKER OPERATIONS **************

    /// Open a deposit owned by `staker`, returning its key
    pub fn stake(
        &self,
        staker: &Address,
        pool: PoolKey,
        deposit_id: DepositId,
        amount: Amount,
    ) -> Result<DepositKey> {
        self.execute(
            staker,
            Instruction::Stake {
                pool,
                deposit_id,
                amount,
            },
        )?;
        Ok(DepositKey::new(*staker, pool, deposit_id))
    }

    pub fn activate_cooldown(
        &self,
        staker: &Address,
        pool: PoolKey,
        deposit_id: DepositId,
    ) -> Result<PoolEvent> {
        let deposit = DepositKey::new(*staker, pool, deposit_id);
        self.execute(staker, Instruction::ActivateCooldown { deposit })
    }

    pub fn unstake(&self, staker: &Address, pool: PoolKey, deposit_id: DepositId) -> Result<PoolEvent> {
        let deposit = DepositKey::new(*staker, pool, deposit_id);
        self.execute(staker, Instruction::Unstake { deposit })
    }

    pub fn unstake_emergency(
        &self,
        staker: &Address,
        pool: PoolKey,
        deposit_id: DepositId,
    ) -> Result<PoolEvent> {
        let deposit = DepositKey::new(*staker, pool, deposit_id);
        self.execute(staker, Instruction::UnstakeEmergency { deposit })
    }

    // ********* QUERIES **************

    pub fn pool(&self, key: &PoolKey) -> Option<StakingPool> {
        let shard = self.shard(key).ok()?;
        let guard = shard.lock();
        Some(guard.pool.clone())
    }

    /// All pool keys, sorted
    pub fn pools(&self) -> Vec<PoolKey> {
        let mut keys: Vec<PoolKey> = self.pools.iter().map(|entry| *entry.key()).collect();
        keys.sort();
        keys
    }

    pub fn deposit(&self, key: &DepositKey) -> Option<StakerDeposit> {
        let shard = self.shard(&key.pool).ok()?;
        let guard = shard.lock();
        guard.deposits.get(&(key.staker, key.deposit_id)).cloned()
    }

    /// Deposits filed under a pool, sorted by staker then deposit id
    pub fn deposits_in_pool(&self, key: &PoolKey) -> Vec<StakerDeposit> {
        let Ok(shard) = self.shard(key) else {
            return Vec::new();
        };
        let guard = shard.lock();
        let mut deposits: Vec<StakerDeposit> = guard.deposits.values().cloned().collect();
        deposits.sort_by_key(|d| (d.staker, d.deposit_id));
        deposits
    }

    pub fn staker_stats(&self, staker: &Address) -> Option<StakerStats> {
        self.stats.get(staker).map(|entry| entry.value().clone())
    }

    /// Reward the deposit would receive if it unstaked now
    pub fn estimate_rewards(&self, key: &DepositKey) -> Result<Amount> {
        let shard = self.shard(&key.pool)?;
        let guard = shard.lock();
        let deposit = guard
            .deposits
            .get(&(key.staker, key.deposit_id))
            .ok_or(StakingError::DepositNotFound(*key))?;
        deposit.ensure_open()?;
        self.accountant.entitlement(&guard.pool, deposit)
    }

    /// Check the pool's accounting against its deposits and vault
    pub fn audit_pool(&self, key: &PoolKey) -> Result<Vec<InvariantViolation>> {
        let shard = self.shard(key)?;
        let guard = shard.lock();
        let vault_balance = self.ledger.balance_of(&guard.pool.mint, &guard.pool.vault);
        Ok(check_pool(&guard.pool, guard.deposits.values(), vault_balance))
    }

    /// Most recent committed events, oldest first
    pub fn recent_events(&self) -> Vec<PoolEvent> {
        self.history.lock().iter().cloned().collect()
    }

    // === Internal: pool administration ===

    fn process_create_pool(
        &self,
        caller: &Address,
        pool_id: PoolId,
        mint: MintId,
        initial_funding: Amount,
        claim_cooldown_seconds: i64,
        now: Timestamp,
    ) -> Result<PoolEvent> {
        self.require_signer(caller)?;
        self.config.validate_cooldown(claim_cooldown_seconds)?;

        let key = PoolKey::new(*caller, pool_id);
        match self.pools.entry(key) {
            Entry::Occupied(_) => Err(StakingError::DuplicatePool(key)),
            Entry::Vacant(slot) => {
                let pool = StakingPool::new(key, mint, initial_funding, claim_cooldown_seconds, now);

                if initial_funding > 0 {
                    self.ledger
                        .transfer(&mint, caller, &pool.vault, initial_funding)?;
                }

                let event = PoolEvent::PoolCreated {
                    pool: key,
                    mint,
                    vault: pool.vault,
                    initial_funding,
                    claim_cooldown_seconds,
                    timestamp: now,
                };
                slot.insert(Arc::new(Mutex::new(PoolShard {
                    pool,
                    deposits: HashMap::new(),
                })));
                Ok(event)
            }
        }
    }

    fn process_fund_pool(
        &self,
        caller: &Address,
        key: &PoolKey,
        amount: Amount,
        now: Timestamp,
    ) -> Result<PoolEvent> {
        self.require_signer(caller)?;
        let shard = self.shard(key)?;
        let mut guard = shard.lock();
        let pool = &mut guard.pool;

        require_creator(caller, pool)?;
        if amount == 0 {
            return Err(StakingError::InvalidAmount);
        }
        let current_rewards = checked_add(pool.current_rewards, amount)?;

        self.ledger.transfer(&pool.mint, caller, &pool.vault, amount)?;

        pool.current_rewards = current_rewards;
        Ok(PoolEvent::PoolFunded {
            pool: *key,
            amount,
            current_rewards,
            timestamp: now,
        })
    }

    fn process_change_pool_cooldown(
        &self,
        caller: &Address,
        key: &PoolKey,
        new_cooldown_seconds: i64,
        now: Timestamp,
    ) -> Result<PoolEvent> {
        self.require_signer(caller)?;
        let shard = self.shard(key)?;
        let mut guard = shard.lock();
        let pool = &mut guard.pool;

        require_creator(caller, pool)?;
        self.config.validate_cooldown(new_cooldown_seconds)?;

        let old_cooldown_seconds = pool.claim_cooldown_seconds;
        pool.claim_cooldown_seconds = new_cooldown_seconds;
        Ok(PoolEvent::CooldownChanged {
            pool: *key,
            old_cooldown_seconds,
            new_cooldown_seconds,
            timestamp: now,
        })
    }

    fn process_enable_emergency_mode(
        &self,
        caller: &Address,
        key: &PoolKey,
        now: Timestamp,
    ) -> Result<PoolEvent> {
        self.require_signer(caller)?;
        let shard = self.shard(key)?;
        let mut guard = shard.lock();
        let pool = &mut guard.pool;

        require_creator(caller, pool)?;
        if pool.emergency_mode_enabled {
            return Err(StakingError::EmergencyModeAlreadyEnabled);
        }

        pool.emergency_mode_enabled = true;
        tracing::warn!(pool = %key, "emergency mode enabled");
        Ok(PoolEvent::EmergencyModeEnabled {
            pool: *key,
            timestamp: now,
        })
    }

    fn process_withdraw_rewards_emergency(
        &self,
        caller: &Address,
        key: &PoolKey,
        now: Timestamp,
    ) -> Result<PoolEvent> {
        self.require_signer(caller)?;
        let shard = self.shard(key)?;
        let mut guard = shard.lock();
        let pool = &mut guard.pool;

        require_creator(caller, pool)?;
        if !pool.emergency_mode_enabled {
            return Err(StakingError::EmergencyModeDisabled);
        }

        let amount = pool.current_rewards;
        if amount > 0 {
            self.ledger.transfer(&pool.mint, &pool.vault, caller, amount)?;
        }

        pool.current_rewards = 0;
        Ok(PoolEvent::RewardsWithdrawnEmergency {
            pool: *key,
            amount,
            timestamp: now,
        })
    }

    // === Internal: deposits ===

    fn process_stake(
        &self,
        caller: &Address,
        key: &PoolKey,
        deposit_id: DepositId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<PoolEvent> {
        self.require_signer(caller)?;
        if amount == 0 {
            return Err(StakingError::InvalidAmount);
        }

        let shard = self.shard(key)?;
        let mut guard = shard.lock();
        let PoolShard { pool, deposits } = &mut *guard;

        let deposit_key = DepositKey::new(*caller, *key, deposit_id);
        if deposits.contains_key(&(*caller, deposit_id)) {
            return Err(StakingError::DuplicateDeposit(deposit_key));
        }
        // Depositing is closed once the pool is winding down
        if pool.emergency_mode_enabled {
            return Err(StakingError::EmergencyModeEnabled);
        }
        let current_tokens_staked = checked_add(pool.current_tokens_staked, amount)?;

        let (mint, vault) = (pool.mint, pool.vault);
        self.with_stats(*caller, |stats| {
            stats.record_deposit(amount)?;
            self.ledger.transfer(&mint, caller, &vault, amount)?;
            Ok(())
        })?;

        pool.current_tokens_staked = current_tokens_staked;
        deposits.insert(
            (*caller, deposit_id),
            StakerDeposit::new(deposit_key, amount, now),
        );
        Ok(PoolEvent::Staked {
            deposit: deposit_key,
            amount,
            current_tokens_staked,
            timestamp: now,
        })
    }

    fn process_activate_cooldown(
        &self,
        caller: &Address,
        key: &DepositKey,
        now: Timestamp,
    ) -> Result<PoolEvent> {
        self.require_owner(caller, key)?;
        let shard = self.shard(&key.pool)?;
        let mut guard = shard.lock();
        let PoolShard { pool, deposits } = &mut *guard;

        let deposit = deposits
            .get_mut(&(key.staker, key.deposit_id))
            .ok_or(StakingError::DepositNotFound(*key))?;
        deposit.ensure_can_activate()?;
        let unlocks_at = now
            .checked_add(pool.claim_cooldown_seconds)
            .ok_or(StakingError::ArithmeticOverflow)?;

        deposit.activate_cooldown(now);
        Ok(PoolEvent::CooldownActivated {
            deposit: *key,
            unlocks_at,
            timestamp: now,
        })
    }

    fn process_unstake(&self, caller: &Address, key: &DepositKey, now: Timestamp) -> Result<PoolEvent> {
        self.require_owner(caller, key)?;
        let shard = self.shard(&key.pool)?;
        let mut guard = shard.lock();
        let PoolShard { pool, deposits } = &mut *guard;

        let deposit = deposits
            .get_mut(&(key.staker, key.deposit_id))
            .ok_or(StakingError::DepositNotFound(*key))?;
        deposit.ensure_open()?;
        // Emergency exits go through unstake_emergency
        if pool.emergency_mode_enabled {
            return Err(StakingError::EmergencyModeEnabled);
        }
        deposit.ensure_claimable(pool.claim_cooldown_seconds, now)?;

        // Aggregates are read before this withdrawal's own decrements
        let principal = deposit.tokens_deposited;
        let reward = self.accountant.entitlement(pool, deposit)?;
        let payout = checked_add(principal, reward)?;
        let current_tokens_staked = checked_sub(pool.current_tokens_staked, principal)?;
        let current_rewards = checked_sub(pool.current_rewards, reward)?;

        let (mint, vault) = (pool.mint, pool.vault);
        self.with_stats(key.staker, |stats| {
            stats.record_withdrawal(principal, reward)?;
            self.ledger.transfer(&mint, &vault, caller, payout)?;
            Ok(())
        })?;

        pool.current_tokens_staked = current_tokens_staked;
        pool.current_rewards = current_rewards;
        deposit.close(WithdrawalKind::Standard, reward, now);
        Ok(PoolEvent::Unstaked {
            deposit: *key,
            principal,
            reward,
            timestamp: now,
        })
    }

    fn process_unstake_emergency(
        &self,
        caller: &Address,
        key: &DepositKey,
        now: Timestamp,
    ) -> Result<PoolEvent> {
        self.require_owner(caller, key)?;
        let shard = self.shard(&key.pool)?;
        let mut guard = shard.lock();
        let PoolShard { pool, deposits } = &mut *guard;

        let deposit = deposits
            .get_mut(&(key.staker, key.deposit_id))
            .ok_or(StakingError::DepositNotFound(*key))?;
        deposit.ensure_open()?;
        if !pool.emergency_mode_enabled {
            return Err(StakingError::EmergencyModeDisabled);
        }

        let principal = deposit.tokens_deposited;
        let current_tokens_staked = checked_sub(pool.current_tokens_staked, principal)?;

        let (mint, vault) = (pool.mint, pool.vault);
        self.with_stats(key.staker, |stats| {
            stats.record_withdrawal(principal, 0)?;
            self.ledger.transfer(&mint, &vault, caller, principal)?;
            Ok(())
        })?;

        pool.current_tokens_staked = current_tokens_staked;
        deposit.close(WithdrawalKind::Emergency, 0, now);
        Ok(PoolEvent::UnstakedEmergency {
            deposit: *key,
            principal,
            timestamp: now,
        })
    }

    // === Internal helpers ===

    fn shard(&self, key: &PoolKey) -> Result<Arc<Mutex<PoolShard>>> {
        self.pools
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(StakingError::PoolNotFound(*key))
    }

    fn require_signer(&self, caller: &Address) -> Result<()> {
        if !self.authority.is_signer(caller) {
            return Err(StakingError::Unauthorized(*caller));
        }
        Ok(())
    }

    fn require_owner(&self, caller: &Address, deposit: &DepositKey) -> Result<()> {
        self.require_signer(caller)?;
        if *caller != deposit.staker {
            return Err(StakingError::Unauthorized(*caller));
        }
        Ok(())
    }

    /// Apply `update` to a copy of the staker's stats and store it only if
    /// `update` succeeds. The stats entry stays locked for the duration, so
    /// the closure may perform the operation's ledger transfer.
    fn with_stats<T>(
        &self,
        staker: Address,
        update: impl FnOnce(&mut StakerStats) -> Result<T>,
    ) -> Result<T> {
        match self.stats.entry(staker) {
            Entry::Occupied(mut slot) => {
                let mut next = slot.get().clone();
                let out = update(&mut next)?;
                *slot.get_mut() = next;
                Ok(out)
            }
            Entry::Vacant(slot) => {
                let mut next = StakerStats::new(staker);
                let out = update(&mut next)?;
                slot.insert(next);
                Ok(out)
            }
        }
    }

    fn after_commit(&self, key: &PoolKey, event: &PoolEvent) {
        if self.config.history_capacity > 0 {
            let mut history = self.history.lock();
            while history.len() >= self.config.history_capacity {
                history.pop_front();
            }
            history.push_back(event.clone());
        }

        if self.config.verify_invariants {
            match self.audit_pool(key) {
                Ok(violations) => {
                    for violation in violations {
                        tracing::error!(pool = %key, %violation, "pool invariant violated");
                    }
                }
                Err(err) => tracing::error!(pool = %key, error = %err, "pool audit failed"),
            }
        }
    }
}

fn require_creator(caller: &Address, pool: &StakingPool) -> Result<()> {
    if *caller != pool.creator {
        return Err(StakingError::Unauthorized(*caller));
    }
    Ok(())
}
