//! Closed set of pool operations
//!
//! Every public operation is one [`Instruction`] variant carrying its own
//! payload. [`crate::PoolEngine::execute`] is the single dispatcher.

use crate::types::{Address, Amount, DepositId, DepositKey, MintId, PoolId, PoolKey};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    // === Pool administration ===
    /// Create a pool owned by the caller
    CreatePool {
        pool_id: PoolId,
        mint: MintId,
        initial_funding: Amount,
        claim_cooldown_seconds: i64,
    },

    /// Add to the reward reserve (creator only)
    FundPool { pool: PoolKey, amount: Amount },

    /// Replace the claim cooldown (creator only)
    ChangePoolCooldown {
        pool: PoolKey,
        new_cooldown_seconds: i64,
    },

    /// Irreversibly switch the pool into emergency mode (creator only)
    EnableEmergencyMode { pool: PoolKey },

    /// Drain the reward reserve to the creator (creator only, emergency mode)
    WithdrawRewardsEmergency { pool: PoolKey },

    // === Deposits ===
    /// Open a new deposit owned by the caller
    Stake {
        pool: PoolKey,
        deposit_id: DepositId,
        amount: Amount,
    },

    ActivateCooldown { deposit: DepositKey },

    Unstake { deposit: DepositKey },

    UnstakeEmergency { deposit: DepositKey },
}

impl Instruction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreatePool { .. } => "create_pool",
            Self::FundPool { .. } => "fund_pool",
            Self::ChangePoolCooldown { .. } => "change_pool_cooldown",
            Self::EnableEmergencyMode { .. } => "enable_emergency_mode",
            Self::WithdrawRewardsEmergency { .. } => "withdraw_rewards_emergency",
            Self::Stake { .. } => "stake",
            Self::ActivateCooldown { .. } => "activate_cooldown",
            Self::Unstake { .. } => "unstake",
            Self::UnstakeEmergency { .. } => "unstake_emergency",
        }
    }

    /// Pool targeted when `caller` submits this instruction
    pub fn pool(&self, caller: &Address) -> PoolKey {
        match self {
            Self::CreatePool { pool_id, .. } => PoolKey::new(*caller, *pool_id),
            Self::FundPool { pool, .. }
            | Self::ChangePoolCooldown { pool, .. }
            | Self::EnableEmergencyMode { pool }
            | Self::WithdrawRewardsEmergency { pool }
            | Self::Stake { pool, .. } => *pool,
            Self::ActivateCooldown { deposit }
            | Self::Unstake { deposit }
            | Self::UnstakeEmergency { deposit } => deposit.pool,
        }
    }
}
