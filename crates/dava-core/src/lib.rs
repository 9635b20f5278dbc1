//! # dava-core: Pure Business Logic for Dava POS
//!
//! This crate is the heart of the pharmacy dispensing system. It contains
//! all business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  dava-engine (services)                         │
//! │    BillingEngine · InventoryService · PrescriptionService       │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────▼───────────────────────────────────┐
//! │               ★ dava-core (THIS CRATE) ★                        │
//! │                                                                 │
//! │   ┌──────────┐ ┌────────────┐ ┌──────────┐ ┌─────────────┐     │
//! │   │  types   │ │ compliance │ │   fhir   │ │ allocation  │     │
//! │   │ Medicine │ │ rule table │ │  bundle  │ │ FIFO planner│     │
//! │   │  Batch   │ │ registrat. │ │  parser  │ │             │     │
//! │   │   Sale   │ │ GST rates  │ │          │ │             │     │
//! │   └──────────┘ └────────────┘ └──────────┘ └─────────────┘     │
//! │   ┌──────────┐ ┌────────────┐ ┌──────────┐                     │
//! │   │  money   │ │  billing   │ │validation│                     │
//! │   │  paise   │ │ sale math  │ │  rules   │                     │
//! │   └──────────┘ └────────────┘ └──────────┘                     │
//! │                                                                 │
//! │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────▼───────────────────────────────────┐
//! │                  dava-db (Database Layer)                       │
//! │           SQLite queries, migrations, repositories              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Medicine, Batch, Prescription, Sale, ...)
//! - [`money`] - Money type with integer paise arithmetic (no floats!)
//! - [`compliance`] - Drug-schedule rules, GST rates, registration formats
//! - [`fhir`] - FHIR R4 e-prescription bundle parsing
//! - [`allocation`] - FIFO-by-expiry stock allocation planning
//! - [`billing`] - Sale line pricing and invoice totals
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: deterministic - same input, same output
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are in paise (i64)
//! 4. **Explicit Errors**: all errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use dava_core::compliance::validate_dispense;
//! use dava_core::types::Schedule;
//!
//! // Schedule H without a prescription is never dispensable
//! let check = validate_dispense(Schedule::H, false, false, 10);
//! assert!(!check.allowed);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod billing;
pub mod compliance;
pub mod error;
pub mod fhir;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use fhir::{FhirError, ParsedMedication, ParsedPrescription};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Invoice number prefix: `INV{yy}{mm}{seq:04}`.
pub const INVOICE_PREFIX: &str = "INV";

/// Maximum line items allowed on a single sale.
///
/// Keeps invoices printable and transactions bounded. Can become
/// per-store configuration later.
pub const MAX_SALE_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// Catches fat-finger entry (1000 instead of 10) before compliance or
/// stock checks run.
pub const MAX_LINE_QUANTITY: i64 = 999;
