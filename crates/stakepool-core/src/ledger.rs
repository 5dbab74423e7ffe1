//! # Asset Ledger
//!
//! Fungible balances keyed by `(mint, account)`. The pool engine never moves
//! value itself; it validates, then asks the ledger for one atomic transfer.
//!
//! [`InMemoryLedger`] is the reference implementation used by tests and the
//! simulator. A chain-backed ledger only needs to honour the same contract:
//! a failed transfer moves nothing.

use crate::types::{Address, Amount, MintId};
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;

/// Ledger failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient funds in {account}: need {required}, have {available}")]
    InsufficientFunds {
        account: Address,
        required: Amount,
        available: Amount,
    },

    #[error("Balance overflow in {0}")]
    BalanceOverflow(Address),
}

/// Value-movement collaborator consumed by the pool engine
pub trait AssetLedger: Send + Sync {
    /// Move `amount` of `mint` from `from` to `to`, all or nothing
    fn transfer(
        &self,
        mint: &MintId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Current balance of `account` in `mint`
    fn balance_of(&self, mint: &MintId, account: &Address) -> Amount;
}

/// Thread-safe in-memory ledger
#[derive(Default)]
pub struct InMemoryLedger {
    balances: RwLock<HashMap<(MintId, Address), Amount>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit new units of `mint` to `account`
    pub fn mint_to(
        &self,
        mint: &MintId,
        account: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let mut balances = self.balances.write();
        let balance = balances.entry((*mint, *account)).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow(*account))?;
        Ok(())
    }

    /// Sum of all balances of `mint`
    pub fn total_supply(&self, mint: &MintId) -> u128 {
        self.balances
            .read()
            .iter()
            .filter(|((m, _), _)| m == mint)
            .map(|(_, amount)| *amount as u128)
            .sum()
    }
}

impl AssetLedger for InMemoryLedger {
    fn transfer(
        &self,
        mint: &MintId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let mut balances = self.balances.write();

        let available = balances.get(&(*mint, *from)).copied().unwrap_or(0);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                account: *from,
                required: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }

        // Both sides are computed before either is written
        let receiver = balances.get(&(*mint, *to)).copied().unwrap_or(0);
        let credited = receiver
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow(*to))?;

        balances.insert((*mint, *from), available - amount);
        balances.insert((*mint, *to), credited);
        Ok(())
    }

    fn balance_of(&self, mint: &MintId, account: &Address) -> Amount {
        self.balances
            .read()
            .get(&(*mint, *account))
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mint() -> MintId {
        Address::from_label("mint")
    }

    #[test]
    fn test_transfer() {
        let ledger = InMemoryLedger::new();
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");

        ledger.mint_to(&mint(), &alice, 1000).unwrap();
        ledger.transfer(&mint(), &alice, &bob, 300).unwrap();

        assert_eq!(ledger.balance_of(&mint(), &alice), 700);
        assert_eq!(ledger.balance_of(&mint(), &bob), 300);
        assert_eq!(ledger.total_supply(&mint()), 1000);
    }

    #[test]
    fn test_insufficient_funds_moves_nothing() {
        let ledger = InMemoryLedger::new();
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");

        ledger.mint_to(&mint(), &alice, 100).unwrap();
        let result = ledger.transfer(&mint(), &alice, &bob, 101);

        assert_eq!(
            result,
            Err(LedgerError::InsufficientFunds {
                account: alice,
                required: 101,
                available: 100,
            })
        );
        assert_eq!(ledger.balance_of(&mint(), &alice), 100);
        assert_eq!(ledger.balance_of(&mint(), &bob), 0);
    }

    #[test]
    fn test_overflow_moves_nothing() {
        let ledger = InMemoryLedger::new();
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");

        ledger.mint_to(&mint(), &alice, 10).unwrap();
        ledger.mint_to(&mint(), &bob, Amount::MAX).unwrap();

        let result = ledger.transfer(&mint(), &alice, &bob, 10);
        assert_eq!(result, Err(LedgerError::BalanceOverflow(bob)));
        assert_eq!(ledger.balance_of(&mint(), &alice), 10);
    }

    #[test]
    fn test_mints_are_isolated() {
        let ledger = InMemoryLedger::new();
        let alice = Address::from_label("alice");
        let other = Address::from_label("other-mint");

        ledger.mint_to(&mint(), &alice, 50).unwrap();
        assert_eq!(ledger.balance_of(&other, &alice), 0);
    }
}
