//! Boundary with the external asset-transfer service.
//!
//! The asset ledger is a trusted collaborator: it moves value between
//! accounts and reports success with a plain `bool`. A `false` return is
//! treated exactly like a thrown failure and aborts the calling operation.

use std::fmt;

use covenant_types::{Amount, Principal};
use serde::{Deserialize, Serialize};

/// Direction of a completed transfer leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferKind {
    /// `transfer_from`: `from` is the owner, `to` the spender that pulled.
    Pull,
    /// `transfer`: `from` is the sender.
    Push,
}

/// A transfer leg that the ledger reported as successful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub kind: TransferKind,
    pub from: Principal,
    pub to: Principal,
    pub amount: Amount,
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            TransferKind::Pull => "pull",
            TransferKind::Push => "push",
        };
        write!(f, "{verb} {} {} -> {}", self.amount, self.from, self.to)
    }
}

/// The external asset-transfer service.
///
/// Implementations must be atomic per call: a call that returns `false`
/// has moved nothing.
pub trait AssetLedger {
    /// Move `amount` from `owner` to `spender`, consuming `owner`'s
    /// allowance for `spender`.
    fn transfer_from(&mut self, owner: Principal, spender: Principal, amount: Amount) -> bool;

    /// Move `amount` from `sender` to `to`.
    fn transfer(&mut self, sender: Principal, to: Principal, amount: Amount) -> bool;

    fn balance_of(&self, account: Principal) -> Amount;

    fn allowance(&self, owner: Principal, spender: Principal) -> Amount;

    /// Reverse a leg this ledger previously reported as successful,
    /// restoring balances and, for pulls, the consumed allowance.
    ///
    /// Only called by journal rollback within the operation that performed
    /// the leg. Returns `false` if the reversal could not be applied.
    fn undo(&mut self, transfer: &Transfer) -> bool;
}
