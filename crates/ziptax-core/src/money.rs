//! # Fixed-Point Rates and Amounts
//!
//! Tax rates and monetary amounts never touch binary floating point in this
//! workspace. A [`RateFraction`] is an integer count of millionths; a
//! [`Money`] value is an integer count of cents. Both parse from and render
//! to plain decimal strings, which is also their wire form.
//!
//! ## Why millionths
//!
//! US combined sales-tax rates routinely need four or more decimal places
//! (`0.07375` is a real combined rate). One-millionth resolution covers every
//! published rate exactly, and summing per-jurisdiction rates is plain integer
//! addition — the combined rate is identical no matter how many jurisdictions
//! contribute or in what order they are summed.
//!
//! ## Rounding
//!
//! Applying a rate to an amount truncates toward zero: the computed tax never
//! exceeds the exact product. Intermediate products are carried in `i128`, so
//! the only failure mode is a result that does not fit back into `i64` cents,
//! reported as [`ValidationError::Overflow`].

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Micro-units (millionths) per whole unit of a rate fraction.
const MICROS_PER_UNIT: i64 = 1_000_000;

/// Cents per whole currency unit.
const CENTS_PER_UNIT: i64 = 100;

/// A tax rate expressed as a fraction of one, held in millionths.
///
/// `RateFraction::parse("0.0725")` holds `72_500`. Rates are non-negative by
/// construction; addition is checked.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct RateFraction(i64);

impl RateFraction {
    /// The zero rate.
    pub const ZERO: RateFraction = RateFraction(0);

    /// Construct from a raw count of millionths.
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// The raw count of millionths.
    pub const fn as_micros(&self) -> i64 {
        self.0
    }

    /// Whether this is the zero rate.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parse a non-negative decimal string such as `"0.0725"` or `"0"`.
    ///
    /// At most six fractional digits are accepted; more would claim precision
    /// the representation cannot hold, so the input is rejected rather than
    /// silently rounded. Negative rates are rejected.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        let reject = || ValidationError::InvalidRate(s.to_string());

        if trimmed.is_empty() || trimmed.starts_with('-') || trimmed.starts_with('+') {
            return Err(reject());
        }

        let (int_str, frac_str) = match trimmed.split_once('.') {
            Some((i, f)) => (i, f),
            None => (trimmed, ""),
        };
        if int_str.is_empty() && frac_str.is_empty() {
            return Err(reject());
        }
        if !int_str.bytes().all(|b| b.is_ascii_digit())
            || !frac_str.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(reject());
        }
        if frac_str.len() > 6 {
            return Err(reject());
        }

        let int_part: i64 = if int_str.is_empty() {
            0
        } else {
            int_str.parse().map_err(|_| reject())?
        };
        let frac_micros: i64 = if frac_str.is_empty() {
            0
        } else {
            // Right-pad to six digits: "0725" -> 072500.
            format!("{frac_str:0<6}").parse().map_err(|_| reject())?
        };

        int_part
            .checked_mul(MICROS_PER_UNIT)
            .and_then(|v| v.checked_add(frac_micros))
            .map(Self)
            .ok_or_else(reject)
    }

    /// Saturating addition of two rates. Real-world rate sums sit far below
    /// the saturation point; aggregation uses this so a corrupt backing row
    /// cannot panic the engine.
    pub fn saturating_add(self, other: RateFraction) -> RateFraction {
        RateFraction(self.0.saturating_add(other.0))
    }

    /// Checked addition of two rates.
    pub fn checked_add(self, other: RateFraction) -> Result<RateFraction, ValidationError> {
        self.0
            .checked_add(other.0)
            .map(RateFraction)
            .ok_or_else(|| {
                ValidationError::Overflow(format!("rate sum {} + {}", self, other))
            })
    }
}

impl TryFrom<String> for RateFraction {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<RateFraction> for String {
    fn from(rate: RateFraction) -> Self {
        rate.to_string()
    }
}

impl std::fmt::Display for RateFraction {
    /// Render the shortest exact decimal: `72_500` -> `"0.0725"`, `0` -> `"0"`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let int = abs / MICROS_PER_UNIT as u64;
        let frac = abs % MICROS_PER_UNIT as u64;
        if frac == 0 {
            write!(f, "{sign}{int}")
        } else {
            let digits = format!("{frac:06}");
            write!(f, "{sign}{int}.{}", digits.trim_end_matches('0'))
        }
    }
}

/// A monetary amount in integer cents.
///
/// Parsing follows the fixed-precision convention used throughout this
/// workspace: a whole-number string is whole currency units, a decimal string
/// carries at most two significant fractional digits (extra digits are
/// truncated), and arithmetic is checked.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Money(i64);

impl Money {
    /// The zero amount.
    pub const ZERO: Money = Money(0);

    /// Construct from a raw count of cents.
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// The raw count of cents.
    pub const fn as_cents(&self) -> i64 {
        self.0
    }

    /// Whether this amount is strictly positive.
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Parse a decimal amount string.
    ///
    /// - `"100"` -> 10_000 cents (whole currency units)
    /// - `"100.50"` -> 10_050 cents
    /// - `"0.5"` -> 50 cents
    /// - `"1234.567"` -> 123_456 cents (third digit truncated)
    /// - `"-12.34"` -> -1_234 cents
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        let reject = || ValidationError::InvalidAmount(s.to_string());

        let (sign, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, trimmed),
        };
        if body.is_empty() {
            return Err(reject());
        }

        let (int_str, frac_str) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_str.is_empty() && frac_str.is_empty() {
            return Err(reject());
        }
        if !int_str.bytes().all(|b| b.is_ascii_digit())
            || !frac_str.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(reject());
        }

        let int_part: i64 = if int_str.is_empty() {
            0
        } else {
            int_str.parse().map_err(|_| reject())?
        };
        let frac_cents: i64 = match frac_str.len() {
            0 => 0,
            1 => frac_str.parse::<i64>().map_err(|_| reject())? * 10,
            2 => frac_str.parse().map_err(|_| reject())?,
            _ => frac_str[..2].parse().map_err(|_| reject())?,
        };

        int_part
            .checked_mul(CENTS_PER_UNIT)
            .and_then(|v| v.checked_add(frac_cents))
            .map(|v| Self(sign * v))
            .ok_or_else(reject)
    }

    /// Checked addition of two amounts.
    pub fn checked_add(self, other: Money) -> Result<Money, ValidationError> {
        self.0.checked_add(other.0).map(Money).ok_or_else(|| {
            ValidationError::Overflow(format!("amount sum {} + {}", self, other))
        })
    }

    /// Multiply this amount by a rate, truncating toward zero.
    ///
    /// `Money::parse("100.00")?.apply_rate(RateFraction::parse("0.08")?)`
    /// is exactly `8.00`. The intermediate product is carried in `i128`.
    pub fn apply_rate(self, rate: RateFraction) -> Result<Money, ValidationError> {
        let product = i128::from(self.0) * i128::from(rate.as_micros());
        let cents = product / i128::from(MICROS_PER_UNIT);
        i64::try_from(cents)
            .map(Money)
            .map_err(|_| ValidationError::Overflow(format!("{} x {}", self, rate)))
    }
}

impl TryFrom<String> for Money {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Money> for String {
    fn from(amount: Money) -> Self {
        amount.to_string()
    }
}

impl std::fmt::Display for Money {
    /// Always two decimal places: `800` -> `"8.00"`, `-50` -> `"-0.50"`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}
