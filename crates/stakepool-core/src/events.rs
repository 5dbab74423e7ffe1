//! Events emitted by committed pool operations

use crate::types::{Address, Amount, DepositKey, MintId, PoolKey, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PoolEvent {
    // --- ADMIN ---
    PoolCreated {
        pool: PoolKey,
        mint: MintId,
        vault: Address,
        initial_funding: Amount,
        claim_cooldown_seconds: i64,
        timestamp: Timestamp,
    },

    PoolFunded {
        pool: PoolKey,
        amount: Amount,
        current_rewards: Amount,
        timestamp: Timestamp,
    },

    CooldownChanged {
        pool: PoolKey,
        old_cooldown_seconds: i64,
        new_cooldown_seconds: i64,
        timestamp: Timestamp,
    },

    EmergencyModeEnabled {
        pool: PoolKey,
        timestamp: Timestamp,
    },

    RewardsWithdrawnEmergency {
        pool: PoolKey,
        amount: Amount,
        timestamp: Timestamp,
    },

    // --- DEPOSITS ---
    Staked {
        deposit: DepositKey,
        amount: Amount,
        current_tokens_staked: Amount,
        timestamp: Timestamp,
    },

    CooldownActivated {
        deposit: DepositKey,
        unlocks_at: Timestamp,
        timestamp: Timestamp,
    },

    Unstaked {
        deposit: DepositKey,
        principal: Amount,
        reward: Amount,
        timestamp: Timestamp,
    },

    UnstakedEmergency {
        deposit: DepositKey,
        principal: Amount,
        timestamp: Timestamp,
    },
}

impl PoolEvent {
    pub fn pool(&self) -> PoolKey {
        match self {
            Self::PoolCreated { pool, .. }
            | Self::PoolFunded { pool, .. }
            | Self::CooldownChanged { pool, .. }
            | Self::EmergencyModeEnabled { pool, .. }
            | Self::RewardsWithdrawnEmergency { pool, .. } => *pool,
            Self::Staked { deposit, .. }
            | Self::CooldownActivated { deposit, .. }
            | Self::Unstaked { deposit, .. }
            | Self::UnstakedEmergency { deposit, .. } => deposit.pool,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            Self::PoolCreated { timestamp, .. }
            | Self::PoolFunded { timestamp, .. }
            | Self::CooldownChanged { timestamp, .. }
            | Self::EmergencyModeEnabled { timestamp, .. }
            | Self::RewardsWithdrawnEmergency { timestamp, .. }
            | Self::Staked { timestamp, .. }
            | Self::CooldownActivated { timestamp, .. }
            | Self::Unstaked { timestamp, .. }
            | Self::UnstakedEmergency { timestamp, .. } => *timestamp,
        }
    }
}
