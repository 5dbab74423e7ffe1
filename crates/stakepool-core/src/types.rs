//! Identifier and scalar types shared by every stakepool record
//!
//! Principals, mints and vaults are all 32-byte addresses. Pool and deposit
//! records are addressed by composite keys mirroring how they are persisted:
//! pools by `(creator, pool_id)`, deposits by `(staker, pool, deposit_id)`.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Token amount in the mint's smallest unit
pub type Amount = u64;

/// Unix timestamp in seconds
pub type Timestamp = i64;

/// Creator-chosen pool number, unique per creator
pub type PoolId = u64;

/// Staker-chosen deposit number, unique per (staker, pool)
pub type DepositId = u64;

/// Seed prefix for pool vault derivation
pub const SEED_POOL: &[u8] = b"pool";

/// Seed prefix for label-derived addresses (simulations and tests)
pub const SEED_LABEL: &[u8] = b"label";

/// 32-byte account address (principal, mint or vault)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 32]);

/// Mint identifier; mints share the address space
pub type MintId = Address;

impl Address {
    /// Create an address from raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive an address from an ordered list of seeds using BLAKE3
    ///
    /// Each seed is length-prefixed so `["ab", "c"]` and `["a", "bc"]`
    /// never collide.
    pub fn derive(seeds: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for seed in seeds {
            hasher.update(&(seed.len() as u32).to_le_bytes());
            hasher.update(seed);
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// Deterministic address for a human-readable label
    pub fn from_label(label: &str) -> Self {
        Self::derive(&[SEED_LABEL, label.as_bytes()])
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 64-character hex string
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// The all-zero address
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..12])
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(de::Error::custom)
    }
}

/// Identity of a staking pool
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolKey {
    pub creator: Address,
    pub pool_id: PoolId,
}

impl PoolKey {
    pub fn new(creator: Address, pool_id: PoolId) -> Self {
        Self { creator, pool_id }
    }

    /// Custodial account backing this pool
    pub fn vault(&self) -> Address {
        Address::derive(&[SEED_POOL, self.creator.as_bytes(), &self.pool_id.to_le_bytes()])
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.creator, self.pool_id)
    }
}

/// Identity of a staker deposit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DepositKey {
    pub staker: Address,
    pub pool: PoolKey,
    pub deposit_id: DepositId,
}

impl DepositKey {
    pub fn new(staker: Address, pool: PoolKey, deposit_id: DepositId) -> Self {
        Self {
            staker,
            pool,
            deposit_id,
        }
    }
}

impl fmt::Display for DepositKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}#{}", self.staker, self.pool, self.deposit_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = Address::from_label("alice");
        let parsed = Address::from_hex(&addr.to_hex()).unwrap();
        assert_eq!(addr, parsed);
    }

    #[test]
    fn test_address_rejects_short_hex() {
        assert!(Address::from_hex("abcd").is_err());
    }

    #[test]
    fn test_derive_is_length_prefixed() {
        let a = Address::derive(&[b"ab", b"c"]);
        let b = Address::derive(&[b"a", b"bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_vault_is_per_pool() {
        let creator = Address::from_label("creator");
        let one = PoolKey::new(creator, 1);
        let two = PoolKey::new(creator, 2);

        assert_eq!(one.vault(), PoolKey::new(creator, 1).vault());
        assert_ne!(one.vault(), two.vault());
        assert_ne!(one.vault(), creator);
    }

    #[test]
    fn test_address_serializes_as_hex() {
        let addr = Address::new([0xab; 32]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));

        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
