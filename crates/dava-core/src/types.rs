//! # Domain Types
//!
//! Core domain types for the pharmacy dispensing system.
//!
//! ## Type Hierarchy
//! ```text
//! Medicine ──owns──► Batch (per-lot expiry + stock)
//! Prescription (immutable after upload, carries the raw FHIR bundle)
//! Sale ──owns──► SaleItem (snapshot of price/batch at time of sale)
//! AuditLogEntry (append-only)
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists (batch_number, invoice_number)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%. 1200 bps = 12% (the general GST rate on medicines).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Drug Schedule
// =============================================================================

/// Regulatory drug-schedule classification under the Drugs and Cosmetics
/// Rules, 1945. Governs prescription and dispensing constraints.
///
/// This is a closed enum: an unrecognized value in stored data is a
/// programming error, not a runtime condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum Schedule {
    /// Over-the-counter, no prescription needed.
    Otc,
    /// Schedule H - prescription required.
    H,
    /// Schedule H1 - prescription plus mandatory warnings and register entry.
    H1,
    /// Schedule X - narcotic/psychotropic substances, strict quantity limits.
    X,
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Schedule::Otc => "OTC",
            Schedule::H => "H",
            Schedule::H1 => "H1",
            Schedule::X => "X",
        };
        f.write_str(s)
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::Otc
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    Insurance,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

// =============================================================================
// Medicine
// =============================================================================

/// Medicine master data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Medicine {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown on invoices and alerts.
    pub name: String,

    /// Generic (pharmacological) name.
    pub generic_name: String,

    pub manufacturer: String,

    /// Drug schedule classification. Treated as immutable once the medicine
    /// has dispensing history.
    pub schedule: Schedule,

    /// HSN tax classification code (4-8 digits); drives the GST rate lookup.
    pub hsn_code: String,

    /// List price in paise.
    pub unit_price_paise: i64,

    /// Stock level at or below which a low-stock alert fires.
    pub reorder_level: i64,

    pub description: Option<String>,

    /// Whether medicine is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Medicine {
    /// Returns the list price as a Money type.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_paise(self.unit_price_paise)
    }
}

// =============================================================================
// Batch
// =============================================================================

/// A manufactured lot of a medicine with its own expiry date and stock level.
///
/// Invariants: `expiry_date > manufacture_date`; `quantity >= 0` (also
/// enforced by a database CHECK constraint).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Batch {
    pub id: String,

    /// Owning medicine (cascade delete).
    pub medicine_id: String,

    /// Manufacturer's lot identifier.
    pub batch_number: String,

    pub manufacture_date: NaiveDate,
    pub expiry_date: NaiveDate,

    /// On-hand quantity. The only frequently-contended mutable field in the
    /// system; decremented under a guarded UPDATE inside sale transactions.
    pub quantity: i64,

    /// Maximum retail price per unit in paise (the price charged at sale).
    pub mrp_paise: i64,

    /// Purchase cost per unit in paise.
    pub cost_price_paise: i64,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Returns the MRP as Money.
    #[inline]
    pub fn mrp(&self) -> Money {
        Money::from_paise(self.mrp_paise)
    }

    /// A batch is expired on its expiry date, not just after it.
    #[inline]
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date <= today
    }

    /// Days until expiry (negative once expired).
    #[inline]
    pub fn days_until_expiry(&self, today: NaiveDate) -> i64 {
        self.expiry_date.signed_duration_since(today).num_days()
    }
}

// =============================================================================
// Prescription
// =============================================================================

/// An uploaded e-prescription: the raw FHIR bundle plus fields extracted at
/// upload time. Created once, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Prescription {
    pub id: String,

    /// Raw FHIR R4 bundle JSON as received.
    pub fhir_bundle: String,

    pub doctor_name: String,

    /// Medical council registration number as extracted from the bundle.
    pub doctor_registration: String,

    /// Whether the registration number matched a known council format.
    pub doctor_verified: bool,

    pub patient_name: String,

    /// Health ID or other patient identifier, when present in the bundle.
    pub patient_id: Option<String>,

    pub prescription_date: NaiveDate,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

/// A completed sale (invoice header). Immutable after creation; there is no
/// update or void operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,

    /// Human-readable invoice number: INV + yymm + 4-digit daily sequence.
    pub invoice_number: String,

    /// Prescription backing this sale, when schedule rules require one.
    pub prescription_id: Option<String>,

    pub customer_name: Option<String>,

    /// Subtotal in paise, net of discount.
    pub subtotal_paise: i64,

    /// GST in paise, reduced proportionally by the discount.
    pub gst_paise: i64,

    /// Discount in basis points (1000 = 10%).
    pub discount_bps: u32,

    /// Grand total in paise: subtotal + GST.
    pub total_paise: i64,

    pub payment_method: PaymentMethod,

    /// Actor who created the sale.
    pub created_by: String,

    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_paise(self.total_paise)
    }

    #[inline]
    pub fn gst(&self) -> Money {
        Money::from_paise(self.gst_paise)
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
///
/// References a specific batch, not just a medicine - batch selection is
/// explicit. Unit price and GST rate are snapshotted at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub medicine_id: String,
    pub batch_id: String,

    /// Quantity dispensed from the batch.
    pub quantity: i64,

    /// Unit price in paise at time of sale (batch MRP, frozen).
    pub unit_price_paise: i64,

    /// GST rate applied, in basis points (frozen).
    pub gst_rate_bps: u32,

    /// Line total in paise: unit price × quantity + GST.
    pub line_total_paise: i64,
}

impl SaleItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_paise(self.unit_price_paise)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_paise(self.line_total_paise)
    }
}

// =============================================================================
// Audit Log Entry
// =============================================================================

/// Append-only record of a state-changing operation. Never mutated or
/// deleted by the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditLogEntry {
    pub id: String,

    /// Acting user, when known.
    pub actor_id: Option<String>,

    /// Verb, e.g. "SALE_CREATED", "PRESCRIPTION_UPLOADED".
    pub action: String,

    /// Entity kind, e.g. "Sale", "Medicine".
    pub entity_type: String,

    pub entity_id: Option<String>,

    /// Free-form JSON detail payload.
    pub details: Option<String>,

    pub source_ip: Option<String>,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
