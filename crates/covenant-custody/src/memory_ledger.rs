//! In-process asset ledger.
//!
//! Tracks per-account balances and per-(owner, spender) allowances. All
//! mutations are atomic: either the full transfer succeeds or nothing
//! changes. Accounts can be blocked, after which every transfer into them
//! fails, which is how tests (and operators) model a payout destination the
//! asset issuer refuses to credit.

use std::collections::{HashMap, HashSet};

use covenant_types::{Amount, Principal};

use crate::asset::{AssetLedger, Transfer, TransferKind};

/// Reference [`AssetLedger`] backed by in-memory maps.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    balances: HashMap<Principal, Amount>,
    allowances: HashMap<(Principal, Principal), Amount>,
    /// Accounts that refuse incoming transfers.
    blocked: HashSet<Principal>,
}

impl MemoryLedger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit freshly issued value to `account`.
    ///
    /// Returns `false` (and credits nothing) if the balance would overflow.
    pub fn mint(&mut self, account: Principal, amount: Amount) -> bool {
        let entry = self.balances.entry(account).or_default();
        match entry.checked_add(amount) {
            Some(next) => {
                *entry = next;
                true
            }
            None => false,
        }
    }

    /// Set `owner`'s allowance for `spender`, replacing any previous value.
    pub fn approve(&mut self, owner: Principal, spender: Principal, amount: Amount) {
        self.allowances.insert((owner, spender), amount);
    }

    /// Make every transfer into `account` fail.
    pub fn block(&mut self, account: Principal) {
        self.blocked.insert(account);
    }

    pub fn unblock(&mut self, account: Principal) {
        self.blocked.remove(&account);
    }

    #[must_use]
    pub fn is_blocked(&self, account: &Principal) -> bool {
        self.blocked.contains(account)
    }

    /// Sum of all balances. Transfers never change it. `None` if the sum
    /// exceeds `u128`.
    #[must_use]
    pub fn total_supply(&self) -> Option<Amount> {
        Amount::checked_sum(self.balances.values().copied())
    }

    /// Move value between accounts without touching allowances.
    fn move_balance(&mut self, from: Principal, to: Principal, amount: Amount) -> bool {
        let from_balance = self.balance_of(from);
        let Some(from_after) = from_balance.checked_sub(amount) else {
            return false;
        };
        if from == to {
            return true;
        }
        let Some(to_after) = self.balance_of(to).checked_add(amount) else {
            return false;
        };
        self.balances.insert(from, from_after);
        self.balances.insert(to, to_after);
        true
    }
}

impl AssetLedger for MemoryLedger {
    fn transfer_from(&mut self, owner: Principal, spender: Principal, amount: Amount) -> bool {
        if self.blocked.contains(&spender) {
            return false;
        }
        let allowance = self.allowance(owner, spender);
        let Some(remaining) = allowance.checked_sub(amount) else {
            return false;
        };
        if !self.move_balance(owner, spender, amount) {
            return false;
        }
        self.allowances.insert((owner, spender), remaining);
        true
    }

    fn transfer(&mut self, sender: Principal, to: Principal, amount: Amount) -> bool {
        if self.blocked.contains(&to) {
            return false;
        }
        self.move_balance(sender, to, amount)
    }

    fn balance_of(&self, account: Principal) -> Amount {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    fn allowance(&self, owner: Principal, spender: Principal) -> Amount {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }

    fn undo(&mut self, transfer: &Transfer) -> bool {
        if !self.move_balance(transfer.to, transfer.from, transfer.amount) {
            return false;
        }
        if transfer.kind == TransferKind::Pull {
            let restored = self
                .allowance(transfer.from, transfer.to)
                .checked_add(transfer.amount)
                .unwrap_or(Amount(u128::MAX));
            self.allowances
                .insert((transfer.from, transfer.to), restored);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded(account: Principal, units: u128) -> MemoryLedger {
        let mut ledger = MemoryLedger::new();
        assert!(ledger.mint(account, Amount(units)));
        ledger
    }

    #[test]
    fn mint_increases_balance_and_supply() {
        let user = Principal::random();
        let ledger = funded(user, 1_000);
        assert_eq!(ledger.balance_of(user), Amount(1_000));
        assert_eq!(ledger.total_supply(), Some(Amount(1_000)));
    }

    #[test]
    fn mint_overflow_rejected() {
        let user = Principal::random();
        let mut ledger = funded(user, u128::MAX);
        assert!(!ledger.mint(user, Amount(1)));
        assert_eq!(ledger.balance_of(user), Amount(u128::MAX));
    }

    #[test]
    fn total_supply_reports_overflow() {
        let (a, b) = (Principal::random(), Principal::random());
        let mut ledger = funded(a, u128::MAX);
        assert!(ledger.mint(b, Amount(1)));
        assert_eq!(ledger.total_supply(), None);
    }

    #[test]
    fn transfer_moves_value() {
        let (a, b) = (Principal::random(), Principal::random());
        let mut ledger = funded(a, 1_000);
        assert!(ledger.transfer(a, b, Amount(400)));
        assert_eq!(ledger.balance_of(a), Amount(600));
        assert_eq!(ledger.balance_of(b), Amount(400));
        assert_eq!(ledger.total_supply(), Some(Amount(1_000)));
    }

    #[test]
    fn transfer_insufficient_balance_is_noop() {
        let (a, b) = (Principal::random(), Principal::random());
        let mut ledger = funded(a, 100);
        assert!(!ledger.transfer(a, b, Amount(200)));
        assert_eq!(ledger.balance_of(a), Amount(100));
        assert_eq!(ledger.balance_of(b), Amount::ZERO);
    }

    #[test]
    fn transfer_from_consumes_allowance() {
        let (owner, spender) = (Principal::random(), Principal::random());
        let mut ledger = funded(owner, 1_000);

        assert!(!ledger.transfer_from(owner, spender, Amount(1)), "no allowance");

        ledger.approve(owner, spender, Amount(500));
        assert!(ledger.transfer_from(owner, spender, Amount(300)));
        assert_eq!(ledger.allowance(owner, spender), Amount(200));
        assert_eq!(ledger.balance_of(spender), Amount(300));

        assert!(!ledger.transfer_from(owner, spender, Amount(300)), "allowance exhausted");
        assert_eq!(ledger.balance_of(owner), Amount(700));
    }

    #[test]
    fn transfer_from_insufficient_balance_keeps_allowance() {
        let (owner, spender) = (Principal::random(), Principal::random());
        let mut ledger = funded(owner, 100);
        ledger.approve(owner, spender, Amount(500));
        assert!(!ledger.transfer_from(owner, spender, Amount(200)));
        assert_eq!(ledger.allowance(owner, spender), Amount(500));
    }

    #[test]
    fn blocked_account_refuses_incoming() {
        let (a, b) = (Principal::random(), Principal::random());
        let mut ledger = funded(a, 1_000);
        ledger.block(b);
        assert!(ledger.is_blocked(&b));
        assert!(!ledger.transfer(a, b, Amount(1)));
        ledger.unblock(b);
        assert!(ledger.transfer(a, b, Amount(1)));
    }

    #[test]
    fn undo_push_and_pull() {
        let (owner, custody) = (Principal::random(), Principal::random());
        let mut ledger = funded(owner, 1_000);
        ledger.approve(owner, custody, Amount(1_000));

        assert!(ledger.transfer_from(owner, custody, Amount(600)));
        let pull = Transfer {
            kind: TransferKind::Pull,
            from: owner,
            to: custody,
            amount: Amount(600),
        };
        assert!(ledger.undo(&pull));
        assert_eq!(ledger.balance_of(owner), Amount(1_000));
        assert_eq!(ledger.allowance(owner, custody), Amount(1_000));

        assert!(ledger.transfer(owner, custody, Amount(10)));
        let push = Transfer {
            kind: TransferKind::Push,
            from: owner,
            to: custody,
            amount: Amount(10),
        };
        assert!(ledger.undo(&push));
        assert_eq!(ledger.balance_of(custody), Amount::ZERO);
        assert_eq!(ledger.allowance(owner, custody), Amount(1_000));
    }

    #[test]
    fn nonexistent_balance_is_zero() {
        let ledger = MemoryLedger::new();
        assert_eq!(ledger.balance_of(Principal::random()), Amount::ZERO);
        assert_eq!(ledger.total_supply(), Some(Amount::ZERO));
    }
}
