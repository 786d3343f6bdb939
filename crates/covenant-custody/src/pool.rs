//! Custody pool invariant tracker.
//!
//! Invariant enforced around every operation:
//! ```text
//! held == Σ amount over invoices in FUNDED | PENDING_APPROVAL | DISPUTED
//! held <= ledger.balance_of(custody)
//! ```
//!
//! `held` is tracked incrementally from deposits and payouts; the registry
//! sum and the ledger balance are supplied by the caller for verification.
//! The ledger may hold more than `held` (value sent to the custody account
//! outside the escrow flow), never less.

use covenant_types::{Amount, CovenantError, Result};

/// Tracks escrowed value and lifetime flow totals.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CustodyPool {
    /// Value currently owed to open invoices.
    held: Amount,
    /// Total ever deposited by payers.
    deposited: Amount,
    /// Total ever paid out (fees included).
    paid_out: Amount,
}

impl CustodyPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for a payer's deposit.
    ///
    /// # Errors
    /// Returns `ArithmeticOverflow` if any total would overflow.
    pub fn record_deposit(&mut self, amount: Amount) -> Result<()> {
        let held = self
            .held
            .checked_add(amount)
            .ok_or(CovenantError::ArithmeticOverflow)?;
        let deposited = self
            .deposited
            .checked_add(amount)
            .ok_or(CovenantError::ArithmeticOverflow)?;
        self.held = held;
        self.deposited = deposited;
        Ok(())
    }

    /// Account for a full payout (release or refund) of `amount`.
    ///
    /// # Errors
    /// - `CustodyInvariantViolation` if more would leave than is held
    /// - `ArithmeticOverflow` if the lifetime total would overflow
    pub fn record_payout(&mut self, amount: Amount) -> Result<()> {
        let held = self.held.checked_sub(amount).ok_or_else(|| {
            CovenantError::CustodyInvariantViolation {
                reason: format!("payout {amount} exceeds held {}", self.held),
            }
        })?;
        let paid_out = self
            .paid_out
            .checked_add(amount)
            .ok_or(CovenantError::ArithmeticOverflow)?;
        self.held = held;
        self.paid_out = paid_out;
        Ok(())
    }

    #[must_use]
    pub fn held(&self) -> Amount {
        self.held
    }

    #[must_use]
    pub fn total_deposited(&self) -> Amount {
        self.deposited
    }

    #[must_use]
    pub fn total_paid_out(&self) -> Amount {
        self.paid_out
    }

    /// Verify `held` against the registry's open-invoice sum and the
    /// custody account's ledger balance.
    ///
    /// # Errors
    /// Returns [`CovenantError::CustodyInvariantViolation`] on any mismatch.
    pub fn verify(&self, open_invoice_total: Amount, ledger_balance: Amount) -> Result<()> {
        if self.held != open_invoice_total {
            return Err(CovenantError::CustodyInvariantViolation {
                reason: format!(
                    "held {} != open invoice total {open_invoice_total} \
                     (deposited={}, paid_out={})",
                    self.held, self.deposited, self.paid_out,
                ),
            });
        }
        if ledger_balance < self.held {
            return Err(CovenantError::CustodyInvariantViolation {
                reason: format!(
                    "custody ledger balance {ledger_balance} below held {}",
                    self.held
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pool_is_zero() {
        let pool = CustodyPool::new();
        assert_eq!(pool.held(), Amount::ZERO);
        assert!(pool.verify(Amount::ZERO, Amount::ZERO).is_ok());
    }

    #[test]
    fn deposits_and_payouts_move_held() {
        let mut pool = CustodyPool::new();
        pool.record_deposit(Amount(1_000)).unwrap();
        pool.record_deposit(Amount(500)).unwrap();
        pool.record_payout(Amount(1_000)).unwrap();
        assert_eq!(pool.held(), Amount(500));
        assert_eq!(pool.total_deposited(), Amount(1_500));
        assert_eq!(pool.total_paid_out(), Amount(1_000));
    }

    #[test]
    fn payout_beyond_held_rejected() {
        let mut pool = CustodyPool::new();
        pool.record_deposit(Amount(10)).unwrap();
        let err = pool.record_payout(Amount(11)).unwrap_err();
        assert!(matches!(err, CovenantError::CustodyInvariantViolation { .. }));
        assert_eq!(pool.held(), Amount(10), "failed payout leaves pool unchanged");
    }

    #[test]
    fn deposit_overflow_rejected() {
        let mut pool = CustodyPool::new();
        pool.record_deposit(Amount(u128::MAX)).unwrap();
        assert!(matches!(
            pool.record_deposit(Amount(1)),
            Err(CovenantError::ArithmeticOverflow)
        ));
        assert_eq!(pool.held(), Amount(u128::MAX));
    }

    #[test]
    fn verify_detects_registry_mismatch() {
        let mut pool = CustodyPool::new();
        pool.record_deposit(Amount(10)).unwrap();
        assert!(pool.verify(Amount(10), Amount(10)).is_ok());
        assert!(pool.verify(Amount(9), Amount(10)).is_err());
    }

    #[test]
    fn verify_tolerates_surplus_but_not_shortfall() {
        let mut pool = CustodyPool::new();
        pool.record_deposit(Amount(10)).unwrap();
        assert!(pool.verify(Amount(10), Amount(15)).is_ok());
        let err = pool.verify(Amount(10), Amount(9)).unwrap_err();
        assert!(matches!(err, CovenantError::CustodyInvariantViolation { .. }));
    }
}
