//! Scenario scripts for `stakepool simulate`
//!
//! A script funds labelled accounts, then runs timed, signed steps against an
//! in-memory ledger and a manual clock:
//!
//! ```toml
//! mint = "token"
//!
//! [accounts]
//! creator = 10000
//! alice = 500
//!
//! [[steps]]
//! signer = "creator"
//! op = "create_pool"
//! pool_id = 1
//! initial_funding = 1000
//! claim_cooldown_seconds = 5
//!
//! [[steps]]
//! signer = "alice"
//! advance = 10
//! op = "unstake"
//! creator = "creator"
//! pool_id = 1
//! deposit_id = 1
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use stakepool_core::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

fn default_mint() -> String {
    "token".to_string()
}

#[derive(Clone, Debug, Deserialize)]
pub struct Script {
    /// Label of the staked asset
    #[serde(default = "default_mint")]
    pub mint: String,

    #[serde(default)]
    pub start_time: Timestamp,

    /// Opening balance per account label; every account can sign
    #[serde(default)]
    pub accounts: BTreeMap<String, Amount>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Step {
    pub signer: String,

    /// Seconds to move the clock forward before this step
    #[serde(default)]
    pub advance: i64,

    #[serde(flatten)]
    pub action: Action,
}

/// Step payload; pools are addressed by creator label (defaulting to the
/// signer) and pool id
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    CreatePool {
        pool_id: PoolId,
        #[serde(default)]
        initial_funding: Amount,
        claim_cooldown_seconds: i64,
    },
    FundPool {
        creator: Option<String>,
        pool_id: PoolId,
        amount: Amount,
    },
    ChangePoolCooldown {
        creator: Option<String>,
        pool_id: PoolId,
        new_cooldown_seconds: i64,
    },
    EnableEmergencyMode {
        creator: Option<String>,
        pool_id: PoolId,
    },
    WithdrawRewardsEmergency {
        creator: Option<String>,
        pool_id: PoolId,
    },
    Stake {
        creator: Option<String>,
        pool_id: PoolId,
        deposit_id: DepositId,
        amount: Amount,
    },
    ActivateCooldown {
        creator: Option<String>,
        pool_id: PoolId,
        deposit_id: DepositId,
    },
    Unstake {
        creator: Option<String>,
        pool_id: PoolId,
        deposit_id: DepositId,
    },
    UnstakeEmergency {
        creator: Option<String>,
        pool_id: PoolId,
        deposit_id: DepositId,
    },
}

impl Script {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("invalid scenario script")
    }
}

/// Result of one step
#[derive(Clone, Debug, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub signer: String,
    pub time: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<PoolEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
}

/// Everything a finished simulation reports
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub outcomes: Vec<StepOutcome>,
    pub pools: Vec<StakingPool>,
    pub balances: BTreeMap<String, Amount>,
}

impl Report {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error.is_some()).count()
    }
}

/// Run a script to completion; rejected steps are reported, not fatal
pub fn run(script: &Script, config: EngineConfig) -> anyhow::Result<Report> {
    let ledger = Arc::new(InMemoryLedger::new());
    let clock = Arc::new(ManualClock::new(script.start_time));
    let signers = Arc::new(SignerSet::new());
    let mint = Address::from_label(&script.mint);

    for (label, balance) in &script.accounts {
        let account = Address::from_label(label);
        signers.add(account);
        ledger
            .mint_to(&mint, &account, *balance)
            .with_context(|| format!("funding account {label}"))?;
    }

    let engine = PoolEngine::new(ledger.clone(), clock.clone(), signers).with_config(config);
    let mut outcomes = Vec::with_capacity(script.steps.len());

    for (index, step) in script.steps.iter().enumerate() {
        if step.advance < 0 {
            anyhow::bail!("step {index}: advance must not be negative");
        }
        let time = clock.advance(step.advance);
        let signer = Address::from_label(&step.signer);
        let instruction = step.action.to_instruction(&signer, mint);

        let outcome = match engine.execute(&signer, instruction) {
            Ok(event) => StepOutcome {
                step: index,
                signer: step.signer.clone(),
                time,
                event: Some(event),
                error: None,
                code: None,
            },
            Err(err) => StepOutcome {
                step: index,
                signer: step.signer.clone(),
                time,
                event: None,
                error: Some(err.to_string()),
                code: Some(err.code()),
            },
        };
        outcomes.push(outcome);
    }

    let pools = engine
        .pools()
        .iter()
        .filter_map(|key| engine.pool(key))
        .collect();
    let balances = script
        .accounts
        .keys()
        .map(|label| {
            let account = Address::from_label(label);
            (label.clone(), ledger.balance_of(&mint, &account))
        })
        .collect();

    Ok(Report {
        outcomes,
        pools,
        balances,
    })
}

impl Action {
    fn to_instruction(&self, signer: &Address, mint: MintId) -> Instruction {
        let pool = |creator: &Option<String>, pool_id: PoolId| {
            let creator = creator
                .as_deref()
                .map(Address::from_label)
                .unwrap_or(*signer);
            PoolKey::new(creator, pool_id)
        };
        let deposit = |creator: &Option<String>, pool_id: PoolId, deposit_id: DepositId| {
            DepositKey::new(*signer, pool(creator, pool_id), deposit_id)
        };

        match self {
            Self::CreatePool {
                pool_id,
                initial_funding,
                claim_cooldown_seconds,
            } => Instruction::CreatePool {
                pool_id: *pool_id,
                mint,
                initial_funding: *initial_funding,
                claim_cooldown_seconds: *claim_cooldown_seconds,
            },
            Self::FundPool {
                creator,
                pool_id,
                amount,
            } => Instruction::FundPool {
                pool: pool(creator, *pool_id),
                amount: *amount,
            },
            Self::ChangePoolCooldown {
                creator,
                pool_id,
                new_cooldown_seconds,
            } => Instruction::ChangePoolCooldown {
                pool: pool(creator, *pool_id),
                new_cooldown_seconds: *new_cooldown_seconds,
            },
            Self::EnableEmergencyMode { creator, pool_id } => Instruction::EnableEmergencyMode {
                pool: pool(creator, *pool_id),
            },
            Self::WithdrawRewardsEmergency { creator, pool_id } => {
                Instruction::WithdrawRewardsEmergency {
                    pool: pool(creator, *pool_id),
                }
            }
            Self::Stake {
                creator,
                pool_id,
                deposit_id,
                amount,
            } => Instruction::Stake {
                pool: pool(creator, *pool_id),
                deposit_id: *deposit_id,
                amount: *amount,
            },
            Self::ActivateCooldown {
                creator,
                pool_id,
                deposit_id,
            } => Instruction::ActivateCooldown {
                deposit: deposit(creator, *pool_id, *deposit_id),
            },
            Self::Unstake {
                creator,
                pool_id,
                deposit_id,
            } => Instruction::Unstake {
                deposit: deposit(creator, *pool_id, *deposit_id),
            },
            Self::UnstakeEmergency {
                creator,
                pool_id,
                deposit_id,
            } => Instruction::UnstakeEmergency {
                deposit: deposit(creator, *pool_id, *deposit_id),
            },
        }
    }
}
