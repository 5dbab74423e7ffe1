//! Engine configuration

use crate::error::{Result, StakingError};
use serde::{Deserialize, Serialize};

/// Tunables for [`crate::PoolEngine`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of recent events kept in memory (0 disables the history)
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Upper bound for pool claim cooldowns, in seconds
    #[serde(default)]
    pub max_claim_cooldown_seconds: Option<i64>,

    /// Audit the touched pool after every committed operation
    #[serde(default)]
    pub verify_invariants: bool,
}

fn default_history_capacity() -> usize {
    1024
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            max_claim_cooldown_seconds: None,
            verify_invariants: false,
        }
    }
}

impl EngineConfig {
    /// Cooldowns must be positive and within the configured bound
    pub fn validate_cooldown(&self, seconds: i64) -> Result<()> {
        if seconds <= 0 {
            return Err(StakingError::InvalidCooldown(seconds));
        }
        if let Some(max) = self.max_claim_cooldown_seconds {
            if seconds > max {
                return Err(StakingError::InvalidCooldown(seconds));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cooldown_rules() {
        let config = EngineConfig::default();
        assert!(config.validate_cooldown(1).is_ok());
        assert!(config.validate_cooldown(i64::MAX).is_ok());
        assert_eq!(config.validate_cooldown(0), Err(StakingError::InvalidCooldown(0)));
        assert_eq!(config.validate_cooldown(-5), Err(StakingError::InvalidCooldown(-5)));
    }

    #[test]
    fn test_cooldown_upper_bound() {
        let config = EngineConfig {
            max_claim_cooldown_seconds: Some(3600),
            ..EngineConfig::default()
        };
        assert!(config.validate_cooldown(3600).is_ok());
        assert_eq!(config.validate_cooldown(3601), Err(StakingError::InvalidCooldown(3601)));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"verify_invariants": true}"#).unwrap();
        assert!(config.verify_invariants);
        assert_eq!(config.history_capacity, 1024);
        assert_eq!(config.max_claim_cooldown_seconds, None);
    }
}
