//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  100 × 1.45 × 1.18 in f64 = 171.09999999999997                         │
//! │  ceil() of that is 172, but 171.10 computed another way may not be     │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Centavos + Basis Points                         │
//! │    10000 × 14500 × 11800 / 10^8 = 17110 centavos, exactly              │
//! │    Rounding happens once, where the business rule says it does         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use ipe_core::money::Money;
//!
//! let price = Money::from_cents(129990); // R$ 1.299,90
//! let total = price * 2i64 + Money::from_cents(5000);
//! assert_eq!(total.cents(), 264980);
//! assert_eq!(total.to_string(), "R$ 2.649,80");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::Percent;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in centavos (the smallest BRL unit).
///
/// ## Where Money is Used
/// ```text
/// Product.cost_cents ──► suggested_price() ──► Product.price_cents
///                                                   │
/// SaleItem.line_total_cents ──► Sale.total_cents ───┼──► commission snapshot
///                                                   │
///                               revenue_by_product ─┴──► Curva ABC
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from reais and centavos.
    ///
    /// ## Example
    /// ```rust
    /// use ipe_core::money::Money;
    ///
    /// assert_eq!(Money::from_reais(10, 99).cents(), 1099);
    /// assert_eq!(Money::from_reais(-5, 50).cents(), -550);
    /// ```
    ///
    /// ## Note
    /// For negative amounts only `reais` carries the sign:
    /// `from_reais(-5, 50)` is -R$ 5,50.
    #[inline]
    pub const fn from_reais(reais: i64, centavos: i64) -> Self {
        if reais < 0 {
            Money(reais * 100 - centavos)
        } else {
            Money(reais * 100 + centavos)
        }
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Whole reais, truncated toward zero.
    #[inline]
    pub const fn reais(&self) -> i64 {
        self.0 / 100
    }

    /// Centavos portion, always 0-99.
    #[inline]
    pub const fn centavos_part(&self) -> i64 {
        (self.0 % 100).abs()
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

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Negative amounts become zero. Used where form input is permissive.
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Computes `rate` of this amount, rounding half away from zero to the
    /// centavo.
    ///
    /// ## Example
    /// ```rust
    /// use ipe_core::money::Money;
    /// use ipe_core::Percent;
    ///
    /// // 2.5% of R$ 10,10 = 0.2525 → R$ 0,25
    /// let fee = Money::from_cents(1010).percentage(Percent::from_bps(250));
    /// assert_eq!(fee.cents(), 25);
    /// ```
    pub fn percentage(&self, rate: Percent) -> Money {
        // i128 keeps large totals × bps from overflowing
        let raw = self.0 as i128 * rate.bps() as i128;
        let rounded = if raw >= 0 {
            (raw + 5000) / 10000
        } else {
            (raw - 5000) / 10000
        };
        Money::from_cents(rounded as i64)
    }

    /// Rounds up to the next whole real (multiple of 100 centavos).
    ///
    /// ## Example
    /// ```rust
    /// use ipe_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(17110).ceil_to_real().cents(), 17200);
    /// assert_eq!(Money::from_cents(17200).ceil_to_real().cents(), 17200);
    /// ```
    pub fn ceil_to_real(&self) -> Money {
        let remainder = self.0.rem_euclid(100);
        if remainder == 0 {
            *self
        } else {
            Money(self.0 - remainder + 100)
        }
    }

    /// Multiplies by a quantity (line totals).
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Formats as Brazilian currency: `R$ 1.234,56`.
///
/// ## Note
/// For logs and CLI output. The screens format with the browser locale.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let reais = self.reais().unsigned_abs().to_string();

        let mut grouped = String::with_capacity(reais.len() + reais.len() / 3);
        for (i, digit) in reais.chars().enumerate() {
            if i > 0 && (reais.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(digit);
        }

        write!(f, "{}R$ {},{:02}", sign, grouped, self.centavos_part())
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
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.reais(), 10);
        assert_eq!(money.centavos_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "R$ 10,99");
        assert_eq!(Money::from_cents(500).to_string(), "R$ 5,00");
        assert_eq!(Money::from_cents(-550).to_string(), "-R$ 5,50");
        assert_eq!(Money::from_cents(0).to_string(), "R$ 0,00");
        assert_eq!(Money::from_cents(123456).to_string(), "R$ 1.234,56");
        assert_eq!(Money::from_cents(100000000).to_string(), "R$ 1.000.000,00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3i64).cents(), 3000);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // 10% of R$ 10,00
        assert_eq!(Money::from_cents(1000).percentage(Percent::from_bps(1000)).cents(), 100);
        // 8.25% of R$ 10,00 = 0.825 → 0.83
        assert_eq!(Money::from_cents(1000).percentage(Percent::from_bps(825)).cents(), 83);
        // Negative amounts round away from zero too
        assert_eq!(Money::from_cents(-1000).percentage(Percent::from_bps(825)).cents(), -83);
    }

    #[test]
    fn test_ceil_to_real() {
        assert_eq!(Money::from_cents(1).ceil_to_real().cents(), 100);
        assert_eq!(Money::from_cents(0).ceil_to_real().cents(), 0);
        assert_eq!(Money::from_cents(17110).ceil_to_real().cents(), 17200);
        assert_eq!(Money::from_cents(-150).ceil_to_real().cents(), -100);
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(Money::from_cents(-1).clamp_non_negative(), Money::zero());
        assert_eq!(Money::from_cents(42).clamp_non_negative().cents(), 42);
    }
}
