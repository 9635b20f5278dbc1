//! # Medicine Repository
//!
//! Database operations for the medicine master data.
//!
//! ## Key Operations
//! - Name/generic-name search with schedule filtering and paging
//! - CRUD with soft delete (historical sales keep referencing the row)

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use dava_core::{Medicine, Schedule};

/// Columns selected for a full `Medicine` row.
const MEDICINE_COLUMNS: &str = "id, name, generic_name, manufacturer, schedule, hsn_code, \
     unit_price_paise, reorder_level, description, is_active, created_at, updated_at";

/// Filters for listing medicines.
#[derive(Debug, Clone, Default)]
pub struct MedicineFilter {
    /// Case-insensitive substring match on name or generic name.
    pub search: Option<String>,
    pub schedule: Option<Schedule>,
    pub limit: i64,
    pub offset: i64,
}

/// Repository for medicine database operations.
#[derive(Debug, Clone)]
pub struct MedicineRepository {
    pool: SqlitePool,
}

impl MedicineRepository {
    /// Creates a new MedicineRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MedicineRepository { pool }
    }

    /// Inserts a new medicine.
    pub async fn insert(&self, medicine: &Medicine) -> DbResult<()> {
        debug!(id = %medicine.id, name = %medicine.name, "Inserting medicine");

        sqlx::query(
            r#"
            INSERT INTO medicines (
                id, name, generic_name, manufacturer, schedule, hsn_code,
                unit_price_paise, reorder_level, description, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&medicine.id)
        .bind(&medicine.name)
        .bind(&medicine.generic_name)
        .bind(&medicine.manufacturer)
        .bind(medicine.schedule)
        .bind(&medicine.hsn_code)
        .bind(medicine.unit_price_paise)
        .bind(medicine.reorder_level)
        .bind(&medicine.description)
        .bind(medicine.is_active)
        .bind(medicine.created_at)
        .bind(medicine.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates an existing medicine.
    pub async fn update(&self, medicine: &Medicine) -> DbResult<()> {
        debug!(id = %medicine.id, "Updating medicine");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE medicines SET
                name = ?2,
                generic_name = ?3,
                manufacturer = ?4,
                schedule = ?5,
                hsn_code = ?6,
                unit_price_paise = ?7,
                reorder_level = ?8,
                description = ?9,
                is_active = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&medicine.id)
        .bind(&medicine.name)
        .bind(&medicine.generic_name)
        .bind(&medicine.manufacturer)
        .bind(medicine.schedule)
        .bind(&medicine.hsn_code)
        .bind(medicine.unit_price_paise)
        .bind(medicine.reorder_level)
        .bind(&medicine.description)
        .bind(medicine.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Medicine", &medicine.id));
        }

        Ok(())
    }

    /// Gets a medicine by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Medicine>> {
        let medicine = sqlx::query_as::<_, Medicine>(&format!(
            "SELECT {MEDICINE_COLUMNS} FROM medicines WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(medicine)
    }

    /// Lists active medicines with optional search and schedule filters.
    ///
    /// Returns the page plus the total match count for pagination.
    pub async fn list(&self, filter: &MedicineFilter) -> DbResult<(Vec<Medicine>, i64)> {
        debug!(?filter, "Listing medicines");

        let limit = if filter.limit > 0 { filter.limit } else { 20 };
        let offset = filter.offset.max(0);

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {MEDICINE_COLUMNS} FROM medicines WHERE is_active = 1"
        ));
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY name ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let medicines = qb
            .build_query_as::<Medicine>()
            .fetch_all(&self.pool)
            .await?;

        let mut count_qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM medicines WHERE is_active = 1");
        push_filters(&mut count_qb, filter);

        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok((medicines, total))
    }

    /// Lists every active medicine (for the low-stock scan).
    pub async fn list_active(&self) -> DbResult<Vec<Medicine>> {
        let medicines = sqlx::query_as::<_, Medicine>(&format!(
            "SELECT {MEDICINE_COLUMNS} FROM medicines WHERE is_active = 1 ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(medicines)
    }

    /// Soft-deletes a medicine by setting is_active = false.
    ///
    /// Historical sale items still reference the row, so rows are never
    /// physically removed.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting medicine");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE medicines SET is_active = 0, updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Medicine", id));
        }

        Ok(())
    }

    /// Counts active medicines (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM medicines WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Appends the shared search/schedule WHERE clauses.
fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &MedicineFilter) {
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        qb.push(" AND (name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR generic_name LIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(schedule) = filter.schedule {
        qb.push(" AND schedule = ").push_bind(schedule);
    }
}

/// Helper to generate a new medicine ID.
pub fn generate_medicine_id() -> String {
    Uuid::new_v4().to_string()
}
