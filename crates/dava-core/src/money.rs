//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! In floating point:
//!   0.1 + 0.2 = 0.30000000000000004   WRONG for billing
//!
//! Our solution: integer paise
//!   ₹10.99 is stored as 1099 paise (i64)
//!   GST at 12% of ₹100.00 = (10000 × 1200 + 5000) / 10000 = 1200 paise, exact
//! ```
//!
//! Every monetary value in the system - MRP, cost price, line totals, GST,
//! discounts - flows through this type. Only display code converts to rupees.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise (the smallest INR unit).
///
/// - **i64 (signed)**: allows negative values for refunds and adjustments
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - Full serde support for JSON serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    ///
    /// ## Example
    /// ```rust
    /// use dava_core::money::Money;
    ///
    /// let mrp = Money::from_paise(10000); // ₹100.00
    /// assert_eq!(mrp.paise(), 10000);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * 100)
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

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Calculates GST on this amount.
    ///
    /// ## Implementation
    /// Integer math with rounding: `(amount × bps + 5000) / 10000`.
    /// i128 intermediates prevent overflow on large invoices.
    ///
    /// ## Example
    /// ```rust
    /// use dava_core::money::Money;
    /// use dava_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_paise(20000); // ₹200.00
    /// let gst = subtotal.calculate_gst(TaxRate::from_bps(1200)); // 12%
    /// assert_eq!(gst.paise(), 2400); // ₹24.00
    /// ```
    pub fn calculate_gst(&self, rate: TaxRate) -> Money {
        let gst = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_paise(gst as i64)
    }

    /// Returns the given percentage (in basis points) of this amount.
    ///
    /// Used for discount amounts: 10% of ₹200.00 is
    /// `Money::from_paise(20000).percentage_of(1000)` = ₹20.00.
    pub fn percentage_of(&self, bps: u32) -> Money {
        let part = (self.0 as i128 * bps as i128 + 5000) / 10000;
        Money::from_paise(part as i64)
    }

    /// Reduces this amount proportionally by a discount in basis points.
    ///
    /// `amount × (10000 − bps) / 10000`, rounded. This is how GST is scaled
    /// down when a whole-sale discount applies: the tax base shrank, so the
    /// tax shrinks by the same percentage.
    pub fn reduce_by(&self, bps: u32) -> Money {
        self.percentage_of(10_000u32.saturating_sub(bps))
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use dava_core::money::Money;
    ///
    /// let mrp = Money::from_paise(10000); // ₹100.00
    /// assert_eq!(mrp.multiply_quantity(2).paise(), 20000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// For debugging and log lines; UI display formatting happens elsewhere.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

/// Default money is zero.
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

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
