//! Money Module
//!
//! Balances and transfer amounts are fixed-point integers in minor units
//! (cents). Nothing in the service stores or computes money as floating point.
//!
//! ## Internal Representation
//! - `Money(i64)` holds minor units; the scale factor is `10^MONEY_DECIMALS`
//! - Clients send decimals (`"12.34"` or `12.34`); more than
//!   `MONEY_DECIMALS` fractional digits is rejected, never truncated
//! - Clients receive fixed-scale strings (`"12.34"`)
//!
//! ## Usage
//! ```rust
//! use account_transfer::money::Money;
//!
//! let amount: Money = "1.5".parse().unwrap();
//! assert_eq!(amount.minor_units(), 150);
//! assert_eq!(amount.to_string(), "1.50");
//! ```

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of fractional digits carried by every amount.
pub const MONEY_DECIMALS: u32 = 2;

const SCALE: i64 = 10i64.pow(MONEY_DECIMALS);

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount too large, would overflow")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

// ============================================================================
// Money
// ============================================================================

/// Signed fixed-point amount in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    #[inline]
    pub const fn from_minor_units(units: i64) -> Self {
        Self(units)
    }

    #[inline]
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    /// Whole major units, e.g. `Money::from_major(1000)` is `1000.00`.
    ///
    /// # Panics
    /// Panics on overflow; intended for literals and tests.
    pub const fn from_major(units: i64) -> Self {
        Self(units * SCALE)
    }

    /// Convert a client decimal into minor units.
    ///
    /// # Errors
    /// * `PrecisionOverflow` - more than `MONEY_DECIMALS` significant fractional digits
    /// * `Overflow` - does not fit in `i64` minor units
    pub fn from_decimal(value: Decimal) -> Result<Self, MoneyError> {
        let normalized = value.normalize();
        if normalized.scale() > MONEY_DECIMALS {
            return Err(MoneyError::PrecisionOverflow {
                provided: normalized.scale(),
                max: MONEY_DECIMALS,
            });
        }

        normalized
            .checked_mul(Decimal::from(SCALE))
            .and_then(|scaled| scaled.to_i64())
            .map(Self)
            .ok_or(MoneyError::Overflow)
    }

    /// Decimal view with exactly `MONEY_DECIMALS` fractional digits.
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, MONEY_DECIMALS)
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MoneyError::InvalidFormat("empty string".into()));
        }
        let value = Decimal::from_str(s).map_err(|e| MoneyError::InvalidFormat(e.to_string()))?;
        Self::from_decimal(value)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Accepts JSON strings and numbers; the value goes through `Decimal` so a
/// number like `0.1` is read exactly, never via `f64` arithmetic.
impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Money::from_decimal(value).map_err(serde::de::Error::custom)
    }
}
