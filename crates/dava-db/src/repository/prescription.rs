//! # Prescription Repository
//!
//! Database operations for uploaded e-prescriptions.
//!
//! Prescriptions are insert-only: the FHIR bundle and its extracted fields
//! are frozen at upload time and there is no UPDATE statement in this file.

use chrono::NaiveDate;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use dava_core::Prescription;

/// Columns selected for a full `Prescription` row.
const PRESCRIPTION_COLUMNS: &str = "id, fhir_bundle, doctor_name, doctor_registration, \
     doctor_verified, patient_name, patient_id, prescription_date, created_at";

/// Filters for listing prescriptions.
#[derive(Debug, Clone, Default)]
pub struct PrescriptionFilter {
    /// Case-insensitive substring match on the patient name.
    pub patient_name: Option<String>,
    /// Case-insensitive substring match on the doctor name.
    pub doctor_name: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub limit: i64,
    pub offset: i64,
}

/// Repository for prescription database operations.
#[derive(Debug, Clone)]
pub struct PrescriptionRepository {
    pool: SqlitePool,
}

impl PrescriptionRepository {
    /// Creates a new PrescriptionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PrescriptionRepository { pool }
    }

    /// Inserts a prescription record.
    pub async fn insert(&self, prescription: &Prescription) -> DbResult<()> {
        debug!(
            id = %prescription.id,
            doctor = %prescription.doctor_name,
            "Inserting prescription"
        );

        sqlx::query(
            r#"
            INSERT INTO prescriptions (
                id, fhir_bundle, doctor_name, doctor_registration,
                doctor_verified, patient_name, patient_id, prescription_date,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&prescription.id)
        .bind(&prescription.fhir_bundle)
        .bind(&prescription.doctor_name)
        .bind(&prescription.doctor_registration)
        .bind(prescription.doctor_verified)
        .bind(&prescription.patient_name)
        .bind(&prescription.patient_id)
        .bind(prescription.prescription_date)
        .bind(prescription.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a prescription by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Prescription>> {
        let prescription = sqlx::query_as::<_, Prescription>(&format!(
            "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(prescription)
    }

    /// Lists prescriptions with filters, newest upload first.
    pub async fn list(&self, filter: &PrescriptionFilter) -> DbResult<(Vec<Prescription>, i64)> {
        debug!(?filter, "Listing prescriptions");

        let limit = if filter.limit > 0 { filter.limit } else { 20 };
        let offset = filter.offset.max(0);

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE 1 = 1"
        ));
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let prescriptions = qb
            .build_query_as::<Prescription>()
            .fetch_all(&self.pool)
            .await?;

        let mut count_qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM prescriptions WHERE 1 = 1");
        push_filters(&mut count_qb, filter);

        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok((prescriptions, total))
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &PrescriptionFilter) {
    if let Some(patient) = filter.patient_name.as_deref().filter(|s| !s.trim().is_empty()) {
        qb.push(" AND patient_name LIKE ")
            .push_bind(format!("%{}%", patient.trim()));
    }

    if let Some(doctor) = filter.doctor_name.as_deref().filter(|s| !s.trim().is_empty()) {
        qb.push(" AND doctor_name LIKE ")
            .push_bind(format!("%{}%", doctor.trim()));
    }

    if let Some(from) = filter.from_date {
        qb.push(" AND prescription_date >= ").push_bind(from);
    }

    if let Some(to) = filter.to_date {
        qb.push(" AND prescription_date <= ").push_bind(to);
    }
}

/// Helper to generate a new prescription ID.
pub fn generate_prescription_id() -> String {
    Uuid::new_v4().to_string()
}
