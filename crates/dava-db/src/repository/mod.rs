//! # Repository Implementations
//!
//! One repository per entity, each a thin typed wrapper over the pool:
//!
//! - [`medicine`] - medicine master data (search, CRUD, soft delete)
//! - [`batch`] - lots, FIFO stock queries, guarded decrements
//! - [`prescription`] - insert-only e-prescription records
//! - [`sale`] - the atomic sale transaction, listing, reporting
//! - [`audit`] - append-only audit trail

pub mod audit;
pub mod batch;
pub mod medicine;
pub mod prescription;
pub mod sale;

// =============================================================================
// Shared Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use crate::pool::{Database, DbConfig};
    use dava_core::{Batch, Medicine, Schedule};

    /// Fresh in-memory database with migrations applied.
    pub(crate) async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// A minimal active medicine.
    pub(crate) fn medicine(name: &str, schedule: Schedule) -> Medicine {
        let now = Utc::now();
        Medicine {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            generic_name: format!("{name} generic"),
            manufacturer: "Cipla".to_string(),
            schedule,
            hsn_code: "30049099".to_string(),
            unit_price_paise: 10000,
            reorder_level: 10,
            description: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// A batch expiring `expires_in_days` from today with the given stock.
    pub(crate) fn batch(medicine_id: &str, expires_in_days: i64, quantity: i64) -> Batch {
        let now = Utc::now();
        let today = now.date_naive();
        Batch {
            id: Uuid::new_v4().to_string(),
            medicine_id: medicine_id.to_string(),
            batch_number: format!("BN-{}", &Uuid::new_v4().to_string()[..8]),
            manufacture_date: today - Duration::days(180),
            expiry_date: today + Duration::days(expires_in_days),
            quantity,
            mrp_paise: 10000,
            cost_price_paise: 7000,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
