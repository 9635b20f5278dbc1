//! # dava-db: Database Layer for Dava POS
//!
//! SQLite persistence for the pharmacy dispensing system, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! dava-engine (BillingEngine, InventoryService, ...)
//!      │
//!      ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     dava-db (THIS CRATE)                        │
//! │                                                                 │
//! │   ┌───────────────┐   ┌────────────────┐   ┌──────────────┐    │
//! │   │   Database    │   │  Repositories  │   │  Migrations  │    │
//! │   │   (pool.rs)   │◄──│ medicine batch │   │  (embedded)  │    │
//! │   │  SqlitePool   │   │ sale rx audit  │   │ 001_init.sql │    │
//! │   └───────────────┘   └────────────────┘   └──────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//!      │
//!      ▼
//! SQLite database file (WAL mode, foreign keys on)
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations per entity
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dava_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("pharmacy.db")).await?;
//! let stock = db.batches().list_available(&medicine_id, today).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::audit::{AuditFilter, AuditLogRepository};
pub use repository::batch::BatchRepository;
pub use repository::medicine::{MedicineFilter, MedicineRepository};
pub use repository::prescription::{PrescriptionFilter, PrescriptionRepository};
pub use repository::sale::{SaleDraft, SaleFilter, SaleRepository, SalesReport};
