//! Pool invariant checks
//!
//! - staked principal equals the sum of the pool's open deposits
//! - the vault holds exactly staked principal plus the reward reserve
//! - every deposit filed under a pool points back at that pool

use crate::state::{StakerDeposit, StakingPool};
use crate::types::{Amount, DepositKey, PoolKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvariantViolation {
    #[error("Pool {pool}: recorded stake {recorded} != open deposits {deposits}")]
    StakedMismatch {
        pool: PoolKey,
        recorded: Amount,
        deposits: u128,
    },

    #[error("Pool {pool}: vault holds {actual}, expected {expected}")]
    VaultMismatch {
        pool: PoolKey,
        expected: u128,
        actual: Amount,
    },

    #[error("Deposit {deposit} filed under foreign pool {pool}")]
    ForeignDeposit { pool: PoolKey, deposit: DepositKey },
}

/// Check one pool against its deposits and its vault balance
pub fn check_pool<'a>(
    pool: &StakingPool,
    deposits: impl IntoIterator<Item = &'a StakerDeposit>,
    vault_balance: Amount,
) -> Vec<InvariantViolation> {
    let key = pool.key();
    let mut violations = Vec::new();
    let mut open_total: u128 = 0;

    for deposit in deposits {
        if deposit.pool != key {
            violations.push(InvariantViolation::ForeignDeposit {
                pool: key,
                deposit: deposit.key(),
            });
            continue;
        }
        if !deposit.is_withdrawn {
            open_total += deposit.tokens_deposited as u128;
        }
    }

    if open_total != pool.current_tokens_staked as u128 {
        violations.push(InvariantViolation::StakedMismatch {
            pool: key,
            recorded: pool.current_tokens_staked,
            deposits: open_total,
        });
    }

    let expected = pool.expected_vault_balance();
    if expected != vault_balance as u128 {
        violations.push(InvariantViolation::VaultMismatch {
            pool: key,
            expected,
            actual: vault_balance,
        });
    }

    violations
}
