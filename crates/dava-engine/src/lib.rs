//! # dava-engine: Dispensing Services for Dava POS
//!
//! Orchestrates dava-core (pure rules and arithmetic) and dava-db
//! (repositories and transactions) into the pharmacy's services.
//!
//! ## Control Flow of a Sale
//! ```text
//! sale request
//!      │
//!      ▼
//! BillingEngine ── validates the item list
//!      │           resolves medicines, batches, prescription
//!      │           runs the compliance check per line
//!      │           prices lines (batch MRP × qty, HSN → GST rate)
//!      ▼
//! SaleRepository ── one transaction: invoice number, header,
//!      │            item snapshots, guarded batch decrements
//!      │            (any failure rolls everything back)
//!      ▼
//! AuditRecorder ── notified after commit, fire-and-forget
//! ```
//!
//! ## Services
//!
//! - [`billing::BillingEngine`] - sale creation, dispensing validation,
//!   listing, reports
//! - [`inventory::InventoryService`] - medicines, batches, the FIFO stock
//!   ledger, low-stock and expiry alerts
//! - [`prescriptions::PrescriptionService`] - FHIR upload pipeline,
//!   doctor registration checks
//! - [`audit::AuditRecorder`] - append-only audit trail consumer
//!
//! ## Wiring
//!
//! ```rust,ignore
//! let db = Database::new(DbConfig::new("pharmacy.db")).await?;
//! let audit = AuditRecorder::spawn(db.clone());
//!
//! let billing = BillingEngine::new(db.clone(), audit.clone());
//! let inventory = InventoryService::new(db.clone(), audit.clone());
//! let prescriptions = PrescriptionService::new(db, audit);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod billing;
pub mod error;
pub mod inventory;
pub mod prescriptions;

// =============================================================================
// Re-exports
// =============================================================================

pub use audit::{AuditEvent, AuditHandle, AuditRecorder};
pub use billing::{BillingEngine, CompletedSale, CreateSale, DispensedLine, SaleItemInput};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use inventory::{
    AvailableStock, ExpiryAlert, InventoryService, LowStockAlert, MedicineUpdate, NewBatch,
    NewMedicine,
};
pub use prescriptions::PrescriptionService;

// =============================================================================
// Shared Test Fixtures
// =============================================================================
