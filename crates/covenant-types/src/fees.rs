//! Fee engine.
//!
//! Pure functions splitting a payout into platform fee, arbiter fee and the
//! net amount owed to the payout destination. All divisions floor; the
//! truncation remainder always stays in the net amount, so
//! `platform_fee + arbiter_fee + net_amount == amount` holds exactly.

use serde::{Deserialize, Serialize};

use crate::{
    Amount, CovenantError, Result,
    constants::{BPS_DENOMINATOR, DEFAULT_ARBITER_FEE_BPS, DEFAULT_PLATFORM_FEE_BPS},
};

/// The three-way split of a payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// Paid to the treasury on every release or refund.
    pub platform_fee: Amount,
    /// Paid to the arbiter; zero on the mutual-consent path.
    pub arbiter_fee: Amount,
    /// Paid to the payee (release) or the payer (refund).
    pub net_amount: Amount,
}

impl FeeBreakdown {
    /// Sum of all three parts. Equals the amount the breakdown was computed from.
    #[must_use]
    pub fn total(&self) -> Amount {
        Amount(self.platform_fee.0 + self.arbiter_fee.0 + self.net_amount.0)
    }

    /// Tuple form `(platform_fee, arbiter_fee, net_amount)`.
    #[must_use]
    pub fn as_tuple(&self) -> (Amount, Amount, Amount) {
        (self.platform_fee, self.arbiter_fee, self.net_amount)
    }
}

/// Fee rates in basis points.
///
/// The rates together never exceed 10 000 bps; construction and
/// deserialization both enforce it, so [`FeeSchedule::split`] cannot
/// underflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FeeScheduleRepr", into = "FeeScheduleRepr")]
pub struct FeeSchedule {
    platform_fee_bps: u32,
    arbiter_fee_bps: u32,
}

#[derive(Serialize, Deserialize)]
struct FeeScheduleRepr {
    platform_fee_bps: u32,
    arbiter_fee_bps: u32,
}

impl FeeSchedule {
    /// Build a schedule from basis-point rates.
    ///
    /// # Errors
    /// Returns `Configuration` if the rates sum to more than 10 000 bps.
    pub fn new(platform_fee_bps: u32, arbiter_fee_bps: u32) -> Result<Self> {
        let total = platform_fee_bps.saturating_add(arbiter_fee_bps);
        if total > BPS_DENOMINATOR {
            return Err(CovenantError::Configuration(format!(
                "fee rates sum to {total} bps, maximum is {BPS_DENOMINATOR}"
            )));
        }
        Ok(Self {
            platform_fee_bps,
            arbiter_fee_bps,
        })
    }

    #[must_use]
    pub fn platform_fee_bps(&self) -> u32 {
        self.platform_fee_bps
    }

    #[must_use]
    pub fn arbiter_fee_bps(&self) -> u32 {
        self.arbiter_fee_bps
    }

    /// Split `amount` for a payout. `is_disputed` selects the arbiter path.
    #[must_use]
    pub fn split(&self, amount: Amount, is_disputed: bool) -> FeeBreakdown {
        let platform_fee = amount.mul_bps_floor(self.platform_fee_bps);
        let arbiter_fee = if is_disputed {
            amount.mul_bps_floor(self.arbiter_fee_bps)
        } else {
            Amount::ZERO
        };
        // floor(a*p/B) + floor(a*q/B) <= floor(a*(p+q)/B) <= a, since p+q <= B.
        let net_amount = Amount(amount.0 - platform_fee.0 - arbiter_fee.0);
        FeeBreakdown {
            platform_fee,
            arbiter_fee,
            net_amount,
        }
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            platform_fee_bps: DEFAULT_PLATFORM_FEE_BPS,
            arbiter_fee_bps: DEFAULT_ARBITER_FEE_BPS,
        }
    }
}

impl TryFrom<FeeScheduleRepr> for FeeSchedule {
    type Error = CovenantError;

    fn try_from(repr: FeeScheduleRepr) -> Result<Self> {
        Self::new(repr.platform_fee_bps, repr.arbiter_fee_bps)
    }
}

impl From<FeeSchedule> for FeeScheduleRepr {
    fn from(schedule: FeeSchedule) -> Self {
        Self {
            platform_fee_bps: schedule.platform_fee_bps,
            arbiter_fee_bps: schedule.arbiter_fee_bps,
        }
    }
}

/// Split `amount` under the default schedule (1% platform, 2% arbiter).
///
/// Callable on any amount without a live invoice.
#[must_use]
pub fn calculate_fees(amount: Amount, is_disputed: bool) -> FeeBreakdown {
    FeeSchedule::default().split(amount, is_disputed)
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    #[test]
    fn hundred_units_mutual_consent() {
        let fees = calculate_fees(Amount(100_000_000), false);
        assert_eq!(
            fees.as_tuple(),
            (Amount(1_000_000), Amount::ZERO, Amount(99_000_000))
        );
    }

    #[test]
    fn hundred_units_disputed() {
        let fees = calculate_fees(Amount(100_000_000), true);
        assert_eq!(
            fees.as_tuple(),
            (Amount(1_000_000), Amount(2_000_000), Amount(97_000_000))
        );
    }

    #[test]
    fn remainder_accrues_to_net() {
        // 1% of 199 units floors to 1; 2% floors to 3.
        let fees = calculate_fees(Amount(199), true);
        assert_eq!(fees.platform_fee, Amount(1));
        assert_eq!(fees.arbiter_fee, Amount(3));
        assert_eq!(fees.net_amount, Amount(195));

        // Below 100 units the platform fee floors to zero.
        let fees = calculate_fees(Amount(99), false);
        assert_eq!(fees.platform_fee, Amount::ZERO);
        assert_eq!(fees.net_amount, Amount(99));
    }

    #[test]
    fn conservation_for_random_amounts() {
        let mut rng = rand::thread_rng();
        for _ in 0..10_000 {
            let amount = Amount(rng.gen_range(1..=u128::MAX));
            for disputed in [false, true] {
                let fees = calculate_fees(amount, disputed);
                assert_eq!(fees.total(), amount, "amount={amount} disputed={disputed}");
            }
        }
    }

    #[test]
    fn conservation_at_extremes() {
        for amount in [Amount(1), Amount(u128::MAX)] {
            for disputed in [false, true] {
                assert_eq!(calculate_fees(amount, disputed).total(), amount);
            }
        }
    }

    #[test]
    fn schedule_rejects_rates_over_denominator() {
        assert!(FeeSchedule::new(5_000, 5_000).is_ok());
        let err = FeeSchedule::new(5_000, 5_001).unwrap_err();
        assert!(matches!(err, CovenantError::Configuration(_)));
    }

    #[test]
    fn custom_schedule_splits() {
        let schedule = FeeSchedule::new(250, 0).unwrap();
        let fees = schedule.split(Amount(1_000_000), true);
        assert_eq!(fees.platform_fee, Amount(25_000));
        assert_eq!(fees.arbiter_fee, Amount::ZERO);
        assert_eq!(fees.net_amount, Amount(975_000));
    }

    #[test]
    fn schedule_serde_validates() {
        let json = serde_json::to_string(&FeeSchedule::default()).unwrap();
        assert_eq!(json, r#"{"platform_fee_bps":100,"arbiter_fee_bps":200}"#);
        let back: FeeSchedule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FeeSchedule::default());

        let bad = r#"{"platform_fee_bps":9000,"arbiter_fee_bps":2000}"#;
        assert!(serde_json::from_str::<FeeSchedule>(bad).is_err());
    }
}
