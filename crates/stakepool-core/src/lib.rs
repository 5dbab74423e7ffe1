//! # Stakepool Core
//!
//! Accounting engine for token staking pools.
//!
//! A creator opens a pool for one asset and funds its reward reserve. Stakers
//! lock tokens as individual deposits; to leave, a staker activates a claim
//! cooldown and, once it elapses, withdraws principal plus a proportional
//! share of the reserve. A creator can switch a pool into emergency mode,
//! after which stakers recover principal immediately and the creator drains
//! the remaining rewards.
//!
//! This crate provides:
//! - `PoolEngine` - The single dispatcher that validates and applies operations
//! - `StakingPool` / `StakerDeposit` / `StakerStats` - The persisted records
//! - `AssetLedger` - Value movement between accounts, all or nothing
//! - `RewardAccountant` - The reward rule applied on withdrawal
//! - `Authority` / `Clock` - Signature checks and the time source
//!
//! ## Architecture
//!
//! ```text
//!   Instruction ──► PoolEngine::execute ──► validate ──► AssetLedger::transfer ──► commit
//!                        │                                                           │
//!                        │ Authority, Clock, RewardAccountant                        ▼
//!                        └──────────────────────────────────────────────────► PoolEvent
//! ```

pub mod authority;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod instruction;
pub mod invariants;
pub mod ledger;
pub mod rewards;
pub mod state;
pub mod types;

pub use authority::*;
pub use clock::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use events::*;
pub use instruction::*;
pub use invariants::*;
pub use ledger::*;
pub use rewards::*;
pub use state::*;
pub use types::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::authority::{Authority, SignerSet};
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::config::EngineConfig;
    pub use crate::engine::PoolEngine;
    pub use crate::error::{Result, StakingError};
    pub use crate::events::PoolEvent;
    pub use crate::instruction::Instruction;
    pub use crate::ledger::{AssetLedger, InMemoryLedger};
    pub use crate::rewards::{LiveRatioAccountant, RewardAccountant};
    pub use crate::state::{DepositState, StakerDeposit, StakerStats, StakingPool, WithdrawalKind};
    pub use crate::types::*;
}
