//! # Money Module
//!
//! Euro amounts held as integer cents.
//!
//! Prices arrive from form inputs and from older documents as JSON numbers
//! (floats). They are converted once with [`Money::from_euros`] and every
//! calculation after that is integer arithmetic.
//!
//! ## Usage
//! ```rust
//! use frota_core::money::Money;
//!
//! let daily = Money::from_euros(49.99);
//! let total = daily * 3 + Money::from_cents(500);
//! assert_eq!(total.cents(), 15_497);
//! assert_eq!(total.to_string(), "€154.97");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in euro cents.
///
/// ## Design Decisions
/// - **i64 (signed)**: a discount larger than the subtotal is representable
///   before it is clamped
/// - **Single field tuple struct**: zero-cost abstraction over i64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts a euro amount captured as a float.
    ///
    /// Non-finite input (NaN, ±∞) becomes zero instead of failing, since
    /// pricing must never reject a malformed number. Rounds half away from
    /// zero to the nearest cent.
    ///
    /// ```rust
    /// use frota_core::money::Money;
    ///
    /// assert_eq!(Money::from_euros(10.999).cents(), 1100);
    /// assert_eq!(Money::from_euros(f64::NAN).cents(), 0);
    /// ```
    pub fn from_euros(euros: f64) -> Self {
        if !euros.is_finite() {
            return Money::zero();
        }
        let cents = (euros * 100.0).round();
        // Saturate instead of wrapping on absurd inputs.
        Money(cents.clamp(i64::MIN as f64, i64::MAX as f64) as i64)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Whole euros, truncated toward zero.
    #[inline]
    pub const fn euros(&self) -> i64 {
        self.0 / 100
    }

    /// Cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// The amount as a float, for storing back into `precoTotal`.
    #[inline]
    pub fn as_euros_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative amounts to zero.
    ///
    /// ```rust
    /// use frota_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-300).non_negative(), Money::zero());
    /// assert_eq!(Money::from_cents(300).non_negative().cents(), 300);
    /// ```
    #[inline]
    pub const fn non_negative(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount as `€12.50`; localized formatting belongs to the UI.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}€{}.{:02}", sign, self.euros().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
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

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

/// Multiplication by a day count.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, days: i64) -> Self {
        Money(self.0.saturating_mul(days))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_euros_rounds_to_cents() {
        assert_eq!(Money::from_euros(50.0).cents(), 5000);
        assert_eq!(Money::from_euros(0.1 + 0.2).cents(), 30);
        assert_eq!(Money::from_euros(12.346).cents(), 1235);
        assert_eq!(Money::from_euros(-5.5).cents(), -550);
    }

    #[test]
    fn test_from_euros_non_finite_is_zero() {
        assert!(Money::from_euros(f64::NAN).is_zero());
        assert!(Money::from_euros(f64::INFINITY).is_zero());
        assert!(Money::from_euros(f64::NEG_INFINITY).is_zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "€10.99");
        assert_eq!(Money::from_cents(500).to_string(), "€5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-€5.50");
        assert_eq!(Money::zero().to_string(), "€0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((b - a).non_negative(), Money::zero());
    }

    #[test]
    fn test_saturates_instead_of_overflowing() {
        let huge = Money::from_cents(i64::MAX);
        assert_eq!((huge + Money::from_cents(1)).cents(), i64::MAX);
        assert_eq!((huge * 2).cents(), i64::MAX);
    }

    #[test]
    fn test_as_euros_f64() {
        assert_eq!(Money::from_cents(20_000).as_euros_f64(), 200.0);
        assert_eq!(Money::from_cents(1050).as_euros_f64(), 10.5);
    }
}
