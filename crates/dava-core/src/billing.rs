//! # Sale Pricing
//!
//! Pure arithmetic for sale lines and invoice totals. The billing engine in
//! dava-engine feeds it batch MRPs and GST rates; nothing here touches the
//! database.
//!
//! ## Totals Model
//! ```text
//! per line:    subtotal = MRP × quantity
//!              gst      = subtotal × rate
//!              total    = subtotal + gst
//!
//! per sale:    gross_subtotal = Σ line subtotals
//!              discount       = gross_subtotal × discount%
//!              subtotal       = gross_subtotal − discount
//!              gst            = (Σ line gst) × (100 − discount%) / 100
//!              total          = subtotal + gst
//! ```
//! The discount scales GST proportionally: the tax base shrank by the
//! discount percentage, so the tax does too.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::TaxRate;
use crate::INVOICE_PREFIX;

// =============================================================================
// Priced Line
// =============================================================================

/// A sale line with its pricing resolved (MRP snapshot, GST applied).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricedLine {
    pub medicine_id: String,
    pub batch_id: String,
    pub quantity: i64,
    /// Batch MRP at time of sale.
    pub unit_price: Money,
    pub gst_rate: TaxRate,
    /// quantity × unit price, before tax.
    pub subtotal: Money,
    pub gst: Money,
    /// subtotal + gst.
    pub line_total: Money,
}

/// Prices one line: subtotal, GST and line total from the batch MRP.
pub fn price_line(
    medicine_id: &str,
    batch_id: &str,
    quantity: i64,
    unit_price: Money,
    gst_rate: TaxRate,
) -> PricedLine {
    let subtotal = unit_price.multiply_quantity(quantity);
    let gst = subtotal.calculate_gst(gst_rate);

    PricedLine {
        medicine_id: medicine_id.to_string(),
        batch_id: batch_id.to_string(),
        quantity,
        unit_price,
        gst_rate,
        subtotal,
        gst,
        line_total: subtotal + gst,
    }
}

// =============================================================================
// Sale Totals
// =============================================================================

/// Aggregated invoice amounts, net of discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTotals {
    /// Sum of line subtotals before discount.
    pub gross_subtotal: Money,
    pub discount_amount: Money,
    /// Subtotal after discount.
    pub subtotal: Money,
    /// GST after proportional discount reduction.
    pub gst: Money,
    /// subtotal + gst.
    pub total: Money,
}

/// Computes invoice totals across priced lines with a discount in basis
/// points (1000 = 10%).
pub fn compute_totals(lines: &[PricedLine], discount_bps: u32) -> SaleTotals {
    let mut gross_subtotal = Money::zero();
    let mut gross_gst = Money::zero();

    for line in lines {
        gross_subtotal += line.subtotal;
        gross_gst += line.gst;
    }

    let discount_amount = gross_subtotal.percentage_of(discount_bps);
    let subtotal = gross_subtotal - discount_amount;
    let gst = gross_gst.reduce_by(discount_bps);

    SaleTotals {
        gross_subtotal,
        discount_amount,
        subtotal,
        gst,
        total: subtotal + gst,
    }
}

// =============================================================================
// Invoice Numbers
// =============================================================================

/// Formats an invoice number: prefix, 2-digit year, 2-digit month, 4-digit
/// zero-padded daily sequence. `INV26080001` = first sale of Aug 2026.
///
/// The sequence itself comes from the per-day counter in dava-db; formatting
/// is pure.
pub fn format_invoice_number(date: NaiveDate, sequence: i64) -> String {
    format!("{}{}{:04}", INVOICE_PREFIX, date.format("%y%m"), sequence)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_line() {
        // MRP ₹100.00, quantity 2, GST 12%
        let line = price_line("m1", "b1", 2, Money::from_paise(10000), TaxRate::from_bps(1200));

        assert_eq!(line.subtotal.paise(), 20000);
        assert_eq!(line.gst.paise(), 2400);
        assert_eq!(line.line_total.paise(), 22400);
    }

    #[test]
    fn test_totals_with_discount() {
        // One item, MRP ₹100 × 2, 12% GST, 10% discount:
        // subtotal 200.00, discount 20.00, final subtotal 180.00,
        // gst before discount 24.00, final gst 21.60, total 201.60
        let lines = vec![price_line(
            "m1",
            "b1",
            2,
            Money::from_paise(10000),
            TaxRate::from_bps(1200),
        )];

        let totals = compute_totals(&lines, 1000);

        assert_eq!(totals.gross_subtotal.paise(), 20000);
        assert_eq!(totals.discount_amount.paise(), 2000);
        assert_eq!(totals.subtotal.paise(), 18000);
        assert_eq!(totals.gst.paise(), 2160);
        assert_eq!(totals.total.paise(), 20160);
    }

    #[test]
    fn test_totals_without_discount() {
        let lines = vec![
            price_line("m1", "b1", 1, Money::from_paise(5000), TaxRate::from_bps(1200)),
            price_line("m2", "b2", 3, Money::from_paise(2000), TaxRate::from_bps(1200)),
        ];

        let totals = compute_totals(&lines, 0);

        // 50.00 + 60.00 = 110.00; gst = 6.00 + 7.20 = 13.20
        assert_eq!(totals.gross_subtotal.paise(), 11000);
        assert_eq!(totals.discount_amount.paise(), 0);
        assert_eq!(totals.subtotal.paise(), 11000);
        assert_eq!(totals.gst.paise(), 1320);
        assert_eq!(totals.total.paise(), 12320);
    }

    #[test]
    fn test_totals_empty_lines() {
        let totals = compute_totals(&[], 1000);
        assert!(totals.total.is_zero());
        assert!(totals.discount_amount.is_zero());
    }

    #[test]
    fn test_invoice_number_format() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        assert_eq!(format_invoice_number(date, 1), "INV26080001");
        assert_eq!(format_invoice_number(date, 42), "INV26080042");

        let jan = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_eq!(format_invoice_number(jan, 9999), "INV25019999");
    }
}
