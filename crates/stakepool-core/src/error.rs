//! Error types for stakepool operations

use crate::ledger::LedgerError;
use crate::types::{Address, Amount, DepositKey, PoolKey, Timestamp};
use thiserror::Error;

/// Result type alias for stakepool operations
pub type Result<T> = std::result::Result<T, StakingError>;

/// Errors surfaced by the pool engine
///
/// Every variant is raised before any record is mutated or any transfer is
/// attempted, so a failed call leaves the engine exactly as it found it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakingError {
    // === Authority ===
    /// Caller did not sign, or is not the creator/owner of the record
    #[error("Unauthorized: {0} may not perform this operation")]
    Unauthorized(Address),

    // === Lookups ===
    #[error("Pool not found: {0}")]
    PoolNotFound(PoolKey),

    #[error("Deposit not found: {0}")]
    DepositNotFound(DepositKey),

    #[error("Pool already exists: {0}")]
    DuplicatePool(PoolKey),

    #[error("Deposit already exists: {0}")]
    DuplicateDeposit(DepositKey),

    // === Arguments ===
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Invalid claim cooldown: {0} seconds")]
    InvalidCooldown(i64),

    // === Ledger ===
    #[error("Insufficient funds in {account}: need {required}, have {available}")]
    InsufficientFunds {
        account: Address,
        required: Amount,
        available: Amount,
    },

    // === Deposit lifecycle ===
    #[error("Claim cooldown is not active")]
    CooldownNotActive,

    #[error("Cooldown already activated")]
    AlreadyActive,

    #[error("Claim cooldown has not elapsed: unlocks at {unlocks_at}, now {now}")]
    ClaimCooldownNotElapsed { unlocks_at: Timestamp, now: Timestamp },

    #[error("Deposit already withdrawn")]
    AlreadyWithdrawn,

    // === Emergency mode ===
    #[error("Emergency mode is not enabled")]
    EmergencyModeDisabled,

    #[error("Emergency mode is enabled")]
    EmergencyModeEnabled,

    #[error("Emergency mode already enabled")]
    EmergencyModeAlreadyEnabled,

    // === Arithmetic ===
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}

impl StakingError {
    /// Numeric code for clients, in the custom program error range
    pub fn code(&self) -> u32 {
        match self {
            Self::Unauthorized(_) => 6000,
            Self::PoolNotFound(_) => 6001,
            Self::DepositNotFound(_) => 6002,
            Self::DuplicatePool(_) => 6003,
            Self::DuplicateDeposit(_) => 6004,
            Self::InvalidAmount => 6005,
            Self::InvalidCooldown(_) => 6006,
            Self::InsufficientFunds { .. } => 6007,
            Self::CooldownNotActive => 6008,
            Self::AlreadyActive => 6009,
            Self::ClaimCooldownNotElapsed { .. } => 6010,
            Self::AlreadyWithdrawn => 6011,
            Self::EmergencyModeDisabled => 6012,
            Self::EmergencyModeEnabled => 6013,
            Self::EmergencyModeAlreadyEnabled => 6014,
            Self::ArithmeticOverflow => 6015,
        }
    }

    /// Whether the same call may succeed later without the caller changing it
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ClaimCooldownNotElapsed { .. } | Self::InsufficientFunds { .. }
        )
    }
}

impl From<LedgerError> for StakingError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds {
                account,
                required,
                available,
            } => Self::InsufficientFunds {
                account,
                required,
                available,
            },
            LedgerError::BalanceOverflow(_) => Self::ArithmeticOverflow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_unique() {
        let errors = [
            StakingError::Unauthorized(Address::ZERO),
            StakingError::PoolNotFound(PoolKey::new(Address::ZERO, 0)),
            StakingError::DepositNotFound(DepositKey::new(
                Address::ZERO,
                PoolKey::new(Address::ZERO, 0),
                0,
            )),
            StakingError::DuplicatePool(PoolKey::new(Address::ZERO, 0)),
            StakingError::DuplicateDeposit(DepositKey::new(
                Address::ZERO,
                PoolKey::new(Address::ZERO, 0),
                0,
            )),
            StakingError::InvalidAmount,
            StakingError::InvalidCooldown(0),
            StakingError::InsufficientFunds {
                account: Address::ZERO,
                required: 1,
                available: 0,
            },
            StakingError::CooldownNotActive,
            StakingError::AlreadyActive,
            StakingError::ClaimCooldownNotElapsed { unlocks_at: 5, now: 0 },
            StakingError::AlreadyWithdrawn,
            StakingError::EmergencyModeDisabled,
            StakingError::EmergencyModeEnabled,
            StakingError::EmergencyModeAlreadyEnabled,
            StakingError::ArithmeticOverflow,
        ];

        let mut codes: Vec<u32> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_ledger_error_conversion() {
        let err: StakingError = LedgerError::InsufficientFunds {
            account: Address::ZERO,
            required: 10,
            available: 3,
        }
        .into();
        assert!(matches!(err, StakingError::InsufficientFunds { required: 10, .. }));

        let err: StakingError = LedgerError::BalanceOverflow(Address::ZERO).into();
        assert_eq!(err, StakingError::ArithmeticOverflow);
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(StakingError::ClaimCooldownNotElapsed { unlocks_at: 5, now: 1 }.is_recoverable());
        assert!(!StakingError::AlreadyWithdrawn.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let msg = StakingError::ClaimCooldownNotElapsed { unlocks_at: 5, now: 1 }.to_string();
        assert!(msg.contains("unlocks at 5"));
    }
}
