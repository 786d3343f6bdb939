//! Custody & release engine.
//!
//! Moves value into custody when an invoice is funded and out of custody
//! when it is released or refunded. A payout is planned up front from the
//! fee breakdown and then executed leg by leg through a
//! [`TransferJournal`]:
//!
//! 1. platform fee → treasury
//! 2. arbiter fee → arbiter (only if non-zero)
//! 3. net amount → payee (release) or payer (refund)
//!
//! The caller commits the invoice status only after [`PayoutPlan::execute`]
//! returns `Ok`; on `Err` it rolls the journal back.

use covenant_types::{
    Amount, CovenantError, FeeBreakdown, FeeSchedule, Invoice, InvoiceId, Principal, Result,
};
use serde::{Deserialize, Serialize};

use crate::{asset::AssetLedger, journal::TransferJournal};

/// Which party receives the net amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayoutKind {
    /// Net to the payee.
    Release,
    /// Net back to the payer.
    Refund,
}

/// What a leg pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LegPurpose {
    PlatformFee,
    ArbiterFee,
    Net,
}

/// One outgoing transfer from custody.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutLeg {
    pub purpose: LegPurpose,
    pub to: Principal,
    pub amount: Amount,
}

/// A fully computed payout for one invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutPlan {
    pub invoice_id: InvoiceId,
    pub kind: PayoutKind,
    /// The invoice amount; equals the sum of all legs.
    pub amount: Amount,
    pub fees: FeeBreakdown,
    pub legs: Vec<PayoutLeg>,
}

impl PayoutPlan {
    /// Plan the payout of `invoice`. `is_disputed` selects the arbiter-fee
    /// path and is `true` for every arbiter-driven resolution.
    #[must_use]
    pub fn for_invoice(
        invoice: &Invoice,
        kind: PayoutKind,
        treasury: Principal,
        schedule: &FeeSchedule,
        is_disputed: bool,
    ) -> Self {
        let fees = schedule.split(invoice.amount, is_disputed);
        let destination = match kind {
            PayoutKind::Release => invoice.payee,
            PayoutKind::Refund => invoice.payer,
        };

        let mut legs = Vec::with_capacity(3);
        legs.push(PayoutLeg {
            purpose: LegPurpose::PlatformFee,
            to: treasury,
            amount: fees.platform_fee,
        });
        if !fees.arbiter_fee.is_zero() {
            legs.push(PayoutLeg {
                purpose: LegPurpose::ArbiterFee,
                to: invoice.arbiter,
                amount: fees.arbiter_fee,
            });
        }
        legs.push(PayoutLeg {
            purpose: LegPurpose::Net,
            to: destination,
            amount: fees.net_amount,
        });

        Self {
            invoice_id: invoice.id,
            kind,
            amount: invoice.amount,
            fees,
            legs,
        }
    }

    /// The account receiving the net amount.
    #[must_use]
    pub fn destination(&self) -> Principal {
        self.legs
            .iter()
            .find(|leg| leg.purpose == LegPurpose::Net)
            .map_or(Principal::NULL, |leg| leg.to)
    }

    /// Execute every leg from `custody`, recording each in `journal`.
    ///
    /// Checks up front that custody can cover the whole plan, so an
    /// underfunded custody account fails before any value moves.
    ///
    /// # Errors
    /// - `CustodyInvariantViolation` if custody holds less than the plan amount
    /// - `TransferFailed` for the first leg the ledger refuses; earlier legs
    ///   stay in `journal` for the caller to roll back
    pub fn execute<L: AssetLedger + ?Sized>(
        &self,
        ledger: &mut L,
        journal: &mut TransferJournal,
        custody: Principal,
    ) -> Result<()> {
        let available = ledger.balance_of(custody);
        if available < self.amount {
            return Err(CovenantError::CustodyInvariantViolation {
                reason: format!(
                    "custody holds {available}, payout of {} needs {}",
                    self.invoice_id, self.amount
                ),
            });
        }
        for leg in &self.legs {
            journal.push(ledger, custody, leg.to, leg.amount)?;
        }
        Ok(())
    }
}

/// Pull an invoice's amount from the payer into custody.
///
/// # Errors
/// Returns `TransferFailed` if the ledger refuses the pull (missing
/// allowance, insufficient balance, ...).
pub fn deposit<L: AssetLedger + ?Sized>(
    ledger: &mut L,
    journal: &mut TransferJournal,
    payer: Principal,
    custody: Principal,
    amount: Amount,
) -> Result<()> {
    journal.pull(ledger, payer, custody, amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryLedger;

    struct Setup {
        ledger: MemoryLedger,
        invoice: Invoice,
        custody: Principal,
        treasury: Principal,
    }

    fn setup(units: u128) -> Setup {
        let invoice = Invoice::dummy_funded(InvoiceId(1), Amount(units));
        let (custody, treasury) = (Principal::random(), Principal::random());
        let mut ledger = MemoryLedger::new();
        ledger.mint(invoice.payer, Amount(units));
        ledger.approve(invoice.payer, custody, Amount(units));
        let mut journal = TransferJournal::new();
        deposit(&mut ledger, &mut journal, invoice.payer, custody, Amount(units)).unwrap();
        Setup {
            ledger,
            invoice,
            custody,
            treasury,
        }
    }

    #[test]
    fn mutual_release_has_two_legs() {
        let s = setup(100_000_000);
        let plan = PayoutPlan::for_invoice(
            &s.invoice,
            PayoutKind::Release,
            s.treasury,
            &FeeSchedule::default(),
            false,
        );
        assert_eq!(plan.legs.len(), 2);
        assert_eq!(plan.legs[0].purpose, LegPurpose::PlatformFee);
        assert_eq!(plan.destination(), s.invoice.payee);
        let sum = Amount::checked_sum(plan.legs.iter().map(|l| l.amount));
        assert_eq!(sum, Some(plan.amount));
    }

    #[test]
    fn disputed_refund_pays_arbiter() {
        let mut s = setup(100_000_000);
        let plan = PayoutPlan::for_invoice(
            &s.invoice,
            PayoutKind::Refund,
            s.treasury,
            &FeeSchedule::default(),
            true,
        );
        assert_eq!(plan.legs.len(), 3);
        assert_eq!(plan.destination(), s.invoice.payer);

        let mut journal = TransferJournal::new();
        plan.execute(&mut s.ledger, &mut journal, s.custody).unwrap();
        assert_eq!(journal.len(), 3);
        assert_eq!(s.ledger.balance_of(s.treasury), Amount(1_000_000));
        assert_eq!(s.ledger.balance_of(s.invoice.arbiter), Amount(2_000_000));
        assert_eq!(s.ledger.balance_of(s.invoice.payer), Amount(97_000_000));
        assert_eq!(s.ledger.balance_of(s.custody), Amount::ZERO);
    }

    #[test]
    fn tiny_amount_skips_zero_arbiter_leg() {
        let s = setup(10);
        let plan = PayoutPlan::for_invoice(
            &s.invoice,
            PayoutKind::Release,
            s.treasury,
            &FeeSchedule::default(),
            true,
        );
        // 1% and 2% of 10 units both floor to zero.
        assert_eq!(plan.fees.arbiter_fee, Amount::ZERO);
        assert_eq!(plan.legs.len(), 2);
        assert_eq!(plan.fees.net_amount, Amount(10));
    }

    #[test]
    fn failed_net_leg_leaves_fee_legs_in_journal() {
        let mut s = setup(100_000_000);
        s.ledger.block(s.invoice.payee);
        let plan = PayoutPlan::for_invoice(
            &s.invoice,
            PayoutKind::Release,
            s.treasury,
            &FeeSchedule::default(),
            false,
        );
        let mut journal = TransferJournal::new();
        let err = plan
            .execute(&mut s.ledger, &mut journal, s.custody)
            .unwrap_err();
        assert!(matches!(err, CovenantError::TransferFailed { to, .. } if to == s.invoice.payee));
        assert_eq!(journal.len(), 1);

        journal.rollback(&mut s.ledger).unwrap();
        assert_eq!(s.ledger.balance_of(s.custody), Amount(100_000_000));
        assert_eq!(s.ledger.balance_of(s.treasury), Amount::ZERO);
    }

    #[test]
    fn underfunded_custody_fails_before_any_leg() {
        let mut s = setup(100);
        // Drain custody out of band.
        assert!(s.ledger.transfer(s.custody, s.treasury, Amount(1)));
        let plan = PayoutPlan::for_invoice(
            &s.invoice,
            PayoutKind::Release,
            s.treasury,
            &FeeSchedule::default(),
            false,
        );
        let mut journal = TransferJournal::new();
        let err = plan
            .execute(&mut s.ledger, &mut journal, s.custody)
            .unwrap_err();
        assert!(matches!(err, CovenantError::CustodyInvariantViolation { .. }));
        assert!(journal.is_empty());
    }

    #[test]
    fn deposit_without_allowance_fails() {
        let mut ledger = MemoryLedger::new();
        let (payer, custody) = (Principal::random(), Principal::random());
        ledger.mint(payer, Amount(50));
        let mut journal = TransferJournal::new();
        let err = deposit(&mut ledger, &mut journal, payer, custody, Amount(50)).unwrap_err();
        assert!(matches!(err, CovenantError::TransferFailed { .. }));
        assert_eq!(ledger.balance_of(payer), Amount(50));
    }
}
