//! Per-operation write-ahead journal of transfer legs.
//!
//! Every leg the ledger accepts is recorded before the next one runs. If a
//! later leg fails, [`TransferJournal::rollback`] reverses the recorded legs
//! newest-first, so an aborted operation leaves every balance exactly as it
//! found it. [`TransferJournal::commit`] discards the undo information once
//! the registry update is durable.

use covenant_types::{Amount, CovenantError, Principal, Result};

use crate::asset::{AssetLedger, Transfer, TransferKind};

/// Ordered record of the legs completed by one in-flight operation.
#[derive(Debug, Default)]
pub struct TransferJournal {
    entries: Vec<Transfer>,
}

impl TransferJournal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pull `amount` from `owner` into `spender` and record the leg.
    ///
    /// # Errors
    /// Returns `TransferFailed` if the ledger refuses the pull.
    pub fn pull<L: AssetLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        owner: Principal,
        spender: Principal,
        amount: Amount,
    ) -> Result<()> {
        if !ledger.transfer_from(owner, spender, amount) {
            return Err(CovenantError::TransferFailed {
                from: owner,
                to: spender,
                amount,
            });
        }
        self.record(Transfer {
            kind: TransferKind::Pull,
            from: owner,
            to: spender,
            amount,
        });
        Ok(())
    }

    /// Push `amount` from `sender` to `to` and record the leg.
    ///
    /// # Errors
    /// Returns `TransferFailed` if the ledger refuses the push.
    pub fn push<L: AssetLedger + ?Sized>(
        &mut self,
        ledger: &mut L,
        sender: Principal,
        to: Principal,
        amount: Amount,
    ) -> Result<()> {
        if !ledger.transfer(sender, to, amount) {
            return Err(CovenantError::TransferFailed {
                from: sender,
                to,
                amount,
            });
        }
        self.record(Transfer {
            kind: TransferKind::Push,
            from: sender,
            to,
            amount,
        });
        Ok(())
    }

    fn record(&mut self, transfer: Transfer) {
        tracing::debug!(leg = self.entries.len(), %transfer, "transfer leg completed");
        self.entries.push(transfer);
    }

    /// Reverse every recorded leg, newest first.
    ///
    /// Keeps going after a failed reversal so that as much as possible is
    /// restored, then reports the first failure.
    ///
    /// # Errors
    /// Returns `CustodyInvariantViolation` if the ledger refused any reversal.
    pub fn rollback<L: AssetLedger + ?Sized>(self, ledger: &mut L) -> Result<()> {
        let mut failed: Option<Transfer> = None;
        for transfer in self.entries.iter().rev() {
            if ledger.undo(transfer) {
                tracing::debug!(%transfer, "transfer leg reversed");
            } else {
                tracing::error!(%transfer, "transfer leg could not be reversed");
                failed.get_or_insert(*transfer);
            }
        }
        match failed {
            None => Ok(()),
            Some(transfer) => Err(CovenantError::CustodyInvariantViolation {
                reason: format!("rollback could not reverse {transfer}"),
            }),
        }
    }

    /// Accept all recorded legs; returns them for the caller's audit.
    #[must_use]
    pub fn commit(self) -> Vec<Transfer> {
        self.entries
    }

    #[must_use]
    pub fn entries(&self) -> &[Transfer] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
