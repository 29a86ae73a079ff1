// 2.0 ledger.rs: in-memory execution substrate. balances per (account, asset),
// fungible assets and the native pseudo-asset alike. pool reserves are ordinary
// balances here, so rolling back the ledger rolls back every venue with it.

use crate::error::RoutingError;
use crate::types::{AccountId, Amount, Asset};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    balances: HashMap<(AccountId, Asset), Amount>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, account: AccountId, asset: Asset) -> Amount {
        self.balances.get(&(account, asset)).copied().unwrap_or(0)
    }

    // mints out of thin air. seeding pools and test wallets only.
    pub fn credit(&mut self, account: AccountId, asset: Asset, amount: Amount) -> Result<(), RoutingError> {
        let entry = self.balances.entry((account, asset)).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or(RoutingError::ArithmeticOverflow("ledger credit"))?;
        Ok(())
    }

    pub fn with_balance(mut self, account: AccountId, asset: Asset, amount: Amount) -> Result<Self, RoutingError> {
        self.credit(account, asset, amount)?;
        Ok(self)
    }

    fn debit(&mut self, account: AccountId, asset: Asset, amount: Amount) -> Result<(), RoutingError> {
        let available = self.balance(account, asset);
        let remaining = available
            .checked_sub(amount)
            .ok_or(RoutingError::InsufficientBalance {
                account,
                asset,
                requested: amount,
                available,
            })?;
        if remaining == 0 {
            self.balances.remove(&(account, asset));
        } else {
            self.balances.insert((account, asset), remaining);
        }
        Ok(())
    }

    /// Moves `amount` of `asset` from one holder to another.
    ///
    /// Works the same for fungible assets and [`Asset::NATIVE`]. A zero amount or a
    /// self-transfer is a no-op. Fails with `InsufficientBalance` without touching
    /// either side.
    pub fn safe_transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        asset: Asset,
        amount: Amount,
    ) -> Result<(), RoutingError> {
        if amount == 0 || from == to {
            return Ok(());
        }
        // check the credit side first so a failed credit never leaves a debit behind
        self.balance(to, asset)
            .checked_add(amount)
            .ok_or(RoutingError::ArithmeticOverflow("ledger transfer"))?;
        self.debit(from, asset, amount)?;
        self.credit(to, asset, amount)
    }

    /// Runs `f` all-or-nothing: if it returns an error every balance change it
    /// made is discarded.
    pub fn atomic<T, F>(&mut self, f: F) -> Result<T, RoutingError>
    where
        F: FnOnce(&mut Ledger) -> Result<T, RoutingError>,
    {
        let snapshot = self.balances.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.balances = snapshot;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: AccountId = AccountId(1);
    const BOB: AccountId = AccountId(2);

    fn usdc() -> Asset {
        Asset::from_low_u64(1)
    }

    #[test]
    fn transfer_moves_balance() {
        let mut ledger = Ledger::new().with_balance(ALICE, usdc(), 100).unwrap();
        ledger.safe_transfer(ALICE, BOB, usdc(), 40).unwrap();
        assert_eq!(ledger.balance(ALICE, usdc()), 60);
        assert_eq!(ledger.balance(BOB, usdc()), 40);
    }

    #[test]
    fn native_value_uses_same_path() {
        let mut ledger = Ledger::new().with_balance(ALICE, Asset::NATIVE, 5).unwrap();
        ledger.safe_transfer(ALICE, BOB, Asset::NATIVE, 5).unwrap();
        assert_eq!(ledger.balance(BOB, Asset::NATIVE), 5);
        assert_eq!(ledger.balance(ALICE, Asset::NATIVE), 0);
    }

    #[test]
    fn insufficient_balance_leaves_state_untouched() {
        let mut ledger = Ledger::new().with_balance(ALICE, usdc(), 10).unwrap();
        let before = ledger.clone();
        let err = ledger.safe_transfer(ALICE, BOB, usdc(), 11).unwrap_err();
        assert_eq!(
            err,
            RoutingError::InsufficientBalance {
                account: ALICE,
                asset: usdc(),
                requested: 11,
                available: 10
            }
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn atomic_rolls_back_on_error() {
        let mut ledger = Ledger::new().with_balance(ALICE, usdc(), 100).unwrap();
        let result: Result<(), _> = ledger.atomic(|l| {
            l.safe_transfer(ALICE, BOB, usdc(), 50)?;
            l.safe_transfer(BOB, ALICE, usdc(), 80)
        });
        assert!(result.is_err());
        assert_eq!(ledger.balance(ALICE, usdc()), 100);
        assert_eq!(ledger.balance(BOB, usdc()), 0);

        let kept = ledger.atomic(|l| l.safe_transfer(ALICE, BOB, usdc(), 30));
        assert!(kept.is_ok());
        assert_eq!(ledger.balance(BOB, usdc()), 30);
    }

    #[test]
    fn zero_and_self_transfers_are_noops() {
        let mut ledger = Ledger::new();
        ledger.safe_transfer(ALICE, BOB, usdc(), 0).unwrap();
        ledger.safe_transfer(ALICE, ALICE, usdc(), 1_000).unwrap();
        assert_eq!(ledger, Ledger::new());
    }
}
