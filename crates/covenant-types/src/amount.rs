//! Fixed-point asset amounts.
//!
//! Amounts are held as integers in the asset's smallest unit (6 decimal
//! places). Conversion to human-readable values goes through
//! [`rust_decimal::Decimal`].

use std::fmt;

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::{
    CovenantError, Result,
    constants::{AMOUNT_DECIMALS, BPS_DENOMINATOR, UNITS_PER_WHOLE},
};

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const WHOLE_SCALE: i64 = UNITS_PER_WHOLE as i64;

/// An unsigned amount of the accepted asset in smallest units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(pub u128);

impl Amount {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_units(units: u128) -> Self {
        Self(units)
    }

    /// Whole units of the asset (e.g. `from_whole(100)` is 100.000000).
    ///
    /// # Errors
    /// Returns `ArithmeticOverflow` if the scaled value exceeds `u128`.
    pub fn from_whole(whole: u128) -> Result<Self> {
        whole
            .checked_mul(UNITS_PER_WHOLE)
            .map(Self)
            .ok_or(CovenantError::ArithmeticOverflow)
    }

    /// Convert a human-readable decimal (e.g. `12.5`) into smallest units.
    ///
    /// # Errors
    /// - `InvalidAmount` if the value is negative or carries more than six
    ///   fractional digits
    /// - `ArithmeticOverflow` if it does not fit
    pub fn from_decimal(value: Decimal) -> Result<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(CovenantError::InvalidAmount(Self::ZERO));
        }
        let scaled = value
            .checked_mul(Decimal::new(WHOLE_SCALE, 0))
            .ok_or(CovenantError::ArithmeticOverflow)?;
        if !scaled.fract().is_zero() {
            return Err(CovenantError::InvalidAmount(Self::ZERO));
        }
        scaled
            .to_u128()
            .map(Self)
            .ok_or(CovenantError::ArithmeticOverflow)
    }

    /// Human-readable value with six fractional digits.
    ///
    /// `None` if the amount exceeds what `Decimal` can represent (96 bits).
    #[must_use]
    pub fn to_decimal(self) -> Option<Decimal> {
        let units = i128::try_from(self.0).ok()?;
        Decimal::try_from_i128_with_scale(units, AMOUNT_DECIMALS).ok()
    }

    #[must_use]
    pub const fn units(self) -> u128 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    #[must_use]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// `floor(self * bps / 10_000)`, computed without intermediate overflow.
    ///
    /// Splitting `self = q * 10_000 + r` gives
    /// `floor(self * bps / 10_000) = q * bps + floor(r * bps / 10_000)`;
    /// for `bps <= 10_000` neither term can overflow.
    #[must_use]
    pub fn mul_bps_floor(self, bps: u32) -> Self {
        debug_assert!(bps <= BPS_DENOMINATOR);
        let denom = u128::from(BPS_DENOMINATOR);
        let bps = u128::from(bps);
        let quotient = self.0 / denom;
        let remainder = self.0 % denom;
        Self(quotient * bps + remainder * bps / denom)
    }

    /// Exact sum of `amounts`, or `None` if it exceeds `u128`.
    pub fn checked_sum<I: IntoIterator<Item = Self>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.checked_add(amount))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / UNITS_PER_WHOLE;
        let frac = self.0 % UNITS_PER_WHOLE;
        write!(f, "{whole}.{frac:06}")
    }
}
