//! # Money Module
//!
//! Provides the `Money` type for prices and cart totals.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CART TOTALS WITHOUT FLOATS                                             │
//! │                                                                         │
//! │  Float prices drift when multiplied and summed:                         │
//! │    3 × ₹333.10 = 999.3000000000001                                      │
//! │                                                                         │
//! │  Integer paise never drift:                                             │
//! │    3 × 33310 paise = 99930 paise = ₹999.30                              │
//! │                                                                         │
//! │  All cart math saturates instead of overflowing, so a total can never   │
//! │  panic no matter what a persisted cart contains.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use animart_core::money::Money;
//!
//! let price = Money::from_paise(49_900); // ₹499.00
//! let line = price.multiply_quantity(2);
//! assert_eq!(line.paise(), 99_800);
//! ```

use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise (1/100 of a rupee).
///
/// On the wire a price is a JSON number of **rupees**, as the backend sends
/// it: `"price": 499` or `"price": 499.5`. Reading rounds to the nearest
/// paisa; writing emits an integer for whole rupees, a decimal otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, TS)]
#[ts(export)]
pub struct Money(#[ts(type = "number")] i64);

impl Money {
    /// Creates a Money value from paise.
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    ///
    /// ```rust
    /// use animart_core::money::Money;
    ///
    /// assert_eq!(Money::from_rupees(100).paise(), 10_000);
    /// ```
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees.saturating_mul(100))
    }

    /// Converts a fractional rupee amount, rounding to the nearest paisa.
    ///
    /// Returns `None` for NaN, infinities and amounts outside `i64` paise.
    ///
    /// ```rust
    /// use animart_core::money::Money;
    ///
    /// assert_eq!(Money::from_rupees_f64(499.99).unwrap().paise(), 49_999);
    /// assert!(Money::from_rupees_f64(f64::NAN).is_none());
    /// ```
    pub fn from_rupees_f64(rupees: f64) -> Option<Self> {
        if !rupees.is_finite() {
            return None;
        }
        let paise = (rupees * 100.0).round();
        if paise.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Money(paise as i64))
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero rupees.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a cart quantity, saturating at the bounds
    /// of `i64`.
    ///
    /// ```rust
    /// use animart_core::money::Money;
    ///
    /// let unit = Money::from_paise(29_900);
    /// assert_eq!(unit.multiply_quantity(3).paise(), 89_700);
    /// assert_eq!(Money::from_paise(i64::MAX).multiply_quantity(2).paise(), i64::MAX);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: u32) -> Self {
        Money(self.0.saturating_mul(qty as i64))
    }

    /// Returns the discount percentage between an original and a sale price,
    /// rounded to the nearest whole percent.
    ///
    /// Returns `None` when the original price is not above the sale price.
    pub fn discount_percent(original: Money, sale: Money) -> Option<u8> {
        if original.0 <= 0 || sale.0 >= original.0 {
            return None;
        }
        let off = (original.0 - sale.0) as i128 * 100;
        let pct = (off + original.0 as i128 / 2) / original.0 as i128;
        u8::try_from(pct).ok()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % 100 == 0 {
            serializer.serialize_i64(self.0 / 100)
        } else {
            serializer.serialize_f64(self.0 as f64 / 100.0)
        }
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RupeeVisitor)
    }
}

/// Accepts a rupee amount as an integer, a float or a numeric string.
struct RupeeVisitor;

impl<'de> Visitor<'de> for RupeeVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a price in rupees")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        Ok(Money::from_rupees(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        Ok(Money::from_rupees(i64::try_from(v).unwrap_or(i64::MAX)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Money::from_rupees_f64(v).ok_or_else(|| E::invalid_value(Unexpected::Float(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        v.trim()
            .parse::<f64>()
            .ok()
            .and_then(Money::from_rupees_f64)
            .ok_or_else(|| E::invalid_value(Unexpected::Str(v), &self))
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paise() {
        let money = Money::from_paise(49_999);
        assert_eq!(money.paise(), 49_999);
        assert_eq!(money.rupees(), 499);
        assert_eq!(money.paise_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_paise(49_900).to_string(), "₹499.00");
        assert_eq!(Money::from_paise(5).to_string(), "₹0.05");
        assert_eq!(Money::from_paise(-550).to_string(), "-₹5.50");
    }

    #[test]
    fn test_sum_saturates() {
        let total: Money = vec![Money::from_paise(i64::MAX), Money::from_paise(10)]
            .into_iter()
            .sum();
        assert_eq!(total.paise(), i64::MAX);
    }

    #[test]
    fn test_sum_of_nothing_is_zero() {
        let total: Money = std::iter::empty().sum();
        assert!(total.is_zero());
    }

    #[test]
    fn test_discount_percent() {
        let original = Money::from_rupees(1000);
        assert_eq!(
            Money::discount_percent(original, Money::from_rupees(750)),
            Some(25)
        );
        assert_eq!(Money::discount_percent(original, original), None);
        assert_eq!(Money::discount_percent(Money::zero(), Money::zero()), None);
    }

    #[test]
    fn test_wire_format_is_rupees() {
        assert_eq!(serde_json::to_string(&Money::from_rupees(499)).unwrap(), "499");
        assert_eq!(serde_json::to_string(&Money::from_paise(49_950)).unwrap(), "499.5");

        let whole: Money = serde_json::from_str("250").unwrap();
        assert_eq!(whole, Money::from_rupees(250));
    }

    #[test]
    fn test_fractional_price_rounds_to_paise() {
        let price: Money = serde_json::from_str("499.99").unwrap();
        assert_eq!(price.paise(), 49_999);

        let price: Money = serde_json::from_str("333.1").unwrap();
        assert_eq!(price.paise(), 33_310);
        assert_eq!(price.multiply_quantity(3).paise(), 99_930);

        let price: Money = serde_json::from_str("0.005").unwrap();
        assert_eq!(price.paise(), 1);

        let back: Money =
            serde_json::from_str(&serde_json::to_string(&Money::from_paise(12_345)).unwrap())
                .unwrap();
        assert_eq!(back.paise(), 12_345);
    }

    #[test]
    fn test_numeric_string_price() {
        let price: Money = serde_json::from_str(r#"" 120.50 ""#).unwrap();
        assert_eq!(price.paise(), 12_050);
        assert!(serde_json::from_str::<Money>(r#""free""#).is_err());
        assert!(serde_json::from_str::<Money>("1e30").is_err());
    }
}
