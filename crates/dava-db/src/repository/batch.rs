//! # Batch Repository
//!
//! Database operations for medicine batches (lots).
//!
//! ## Stock Safety
//! `Batch.quantity` is the one frequently-contended mutable column in the
//! system. Every decrement goes through a guarded UPDATE
//! (`WHERE quantity >= ?`) inside a transaction, so two concurrent sales
//! against the same low-stock batch cannot both succeed: the second one's
//! guard matches zero rows and its whole transaction rolls back.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use dava_core::allocation::BatchAllocation;
use dava_core::Batch;

/// Columns selected for a full `Batch` row.
const BATCH_COLUMNS: &str = "id, medicine_id, batch_number, manufacture_date, expiry_date, \
     quantity, mrp_paise, cost_price_paise, is_active, created_at, updated_at";

/// Repository for batch database operations.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    /// Creates a new BatchRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    /// Inserts a new batch.
    pub async fn insert(&self, batch: &Batch) -> DbResult<()> {
        debug!(id = %batch.id, batch_number = %batch.batch_number, "Inserting batch");

        sqlx::query(
            r#"
            INSERT INTO batches (
                id, medicine_id, batch_number, manufacture_date, expiry_date,
                quantity, mrp_paise, cost_price_paise, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&batch.id)
        .bind(&batch.medicine_id)
        .bind(&batch.batch_number)
        .bind(batch.manufacture_date)
        .bind(batch.expiry_date)
        .bind(batch.quantity)
        .bind(batch.mrp_paise)
        .bind(batch.cost_price_paise)
        .bind(batch.is_active)
        .bind(batch.created_at)
        .bind(batch.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a batch by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Batch>> {
        let batch = sqlx::query_as::<_, Batch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(batch)
    }

    /// Lists all active batches of a medicine, soonest expiry first.
    pub async fn list_for_medicine(&self, medicine_id: &str) -> DbResult<Vec<Batch>> {
        let batches = sqlx::query_as::<_, Batch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches \
             WHERE medicine_id = ?1 AND is_active = 1 \
             ORDER BY expiry_date ASC"
        ))
        .bind(medicine_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }

    /// Lists the dispensable batches of a medicine: active and unexpired
    /// (expiry strictly after `today`), soonest expiry first.
    ///
    /// This is the FIFO allocation order. Expired batches are excluded
    /// entirely; they contribute nothing to available stock.
    pub async fn list_available(&self, medicine_id: &str, today: NaiveDate) -> DbResult<Vec<Batch>> {
        let batches = sqlx::query_as::<_, Batch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches \
             WHERE medicine_id = ?1 AND is_active = 1 AND expiry_date > ?2 \
             ORDER BY expiry_date ASC"
        ))
        .bind(medicine_id)
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }

    /// Lists active batches with remaining stock expiring in
    /// `(today, threshold]`, soonest first. Feeds the expiry alert report.
    pub async fn expiring_within(
        &self,
        today: NaiveDate,
        threshold: NaiveDate,
    ) -> DbResult<Vec<Batch>> {
        let batches = sqlx::query_as::<_, Batch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches \
             WHERE is_active = 1 AND quantity > 0 \
               AND expiry_date > ?1 AND expiry_date <= ?2 \
             ORDER BY expiry_date ASC"
        ))
        .bind(today)
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }

    /// Sets a batch's quantity outright (manual stock adjustment).
    pub async fn set_quantity(&self, batch_id: &str, quantity: i64) -> DbResult<()> {
        debug!(batch_id = %batch_id, quantity = %quantity, "Adjusting batch quantity");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE batches SET quantity = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(batch_id)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Batch", batch_id));
        }

        Ok(())
    }

    /// Applies a FIFO allocation plan: decrements every planned batch inside
    /// one transaction.
    ///
    /// All-or-nothing: if any guarded decrement falls short (stock moved
    /// between planning and execution), the whole transaction rolls back and
    /// no batch is mutated.
    pub async fn apply_allocations(&self, allocations: &[BatchAllocation]) -> DbResult<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for allocation in allocations {
            decrement_guarded(&mut tx, &allocation.batch_id, allocation.quantity, now).await?;
        }

        tx.commit().await?;

        debug!(batches = allocations.len(), "Allocation plan applied");
        Ok(())
    }

    /// Deactivates a batch (damaged/recalled stock).
    pub async fn deactivate(&self, batch_id: &str) -> DbResult<()> {
        debug!(batch_id = %batch_id, "Deactivating batch");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE batches SET is_active = 0, updated_at = ?2 WHERE id = ?1",
        )
        .bind(batch_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Batch", batch_id));
        }

        Ok(())
    }
}

/// Decrements one batch's quantity under a `quantity >= ?` guard.
///
/// Runs on an open transaction so a failed guard aborts the caller's whole
/// unit of work. On failure the batch is re-read to produce an error that
/// names the batch and its actual remaining stock.
pub(crate) async fn decrement_guarded(
    conn: &mut SqliteConnection,
    batch_id: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE batches SET quantity = quantity - ?2, updated_at = ?3 \
         WHERE id = ?1 AND quantity >= ?2",
    )
    .bind(batch_id)
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT batch_number, quantity FROM batches WHERE id = ?1")
                .bind(batch_id)
                .fetch_optional(&mut *conn)
                .await?;

        return Err(match row {
            Some((batch_number, available)) => DbError::InsufficientStock {
                reference: batch_number,
                available,
                requested: quantity,
            },
            None => DbError::not_found("Batch", batch_id),
        });
    }

    Ok(())
}

/// Helper to generate a new batch ID.
pub fn generate_batch_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
