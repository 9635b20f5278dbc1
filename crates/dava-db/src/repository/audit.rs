//! # Audit Log Repository
//!
//! Append-only audit trail. This repository exposes INSERT and SELECT only;
//! there is deliberately no update or delete statement in this file.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use dava_core::AuditLogEntry;

/// Columns selected for a full `AuditLogEntry` row.
const AUDIT_COLUMNS: &str =
    "id, actor_id, action, entity_type, entity_id, details, source_ip, created_at";

/// Filters for querying the audit trail.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub actor_id: Option<String>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

/// Repository for audit log database operations.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    pool: SqlitePool,
}

impl AuditLogRepository {
    /// Creates a new AuditLogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditLogRepository { pool }
    }

    /// Appends an audit log entry.
    pub async fn insert(&self, entry: &AuditLogEntry) -> DbResult<()> {
        debug!(action = %entry.action, entity = %entry.entity_type, "Appending audit entry");

        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id, actor_id, action, entity_type, entity_id,
                details, source_ip, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.details)
        .bind(&entry.source_ip)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Queries the audit trail with filters, newest first.
    pub async fn query(&self, filter: &AuditFilter) -> DbResult<(Vec<AuditLogEntry>, i64)> {
        let limit = if filter.limit > 0 { filter.limit } else { 50 };
        let offset = filter.offset.max(0);

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {AUDIT_COLUMNS} FROM audit_logs WHERE 1 = 1"));
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let entries = qb
            .build_query_as::<AuditLogEntry>()
            .fetch_all(&self.pool)
            .await?;

        let mut count_qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM audit_logs WHERE 1 = 1");
        push_filters(&mut count_qb, filter);

        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok((entries, total))
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &AuditFilter) {
    if let Some(actor) = &filter.actor_id {
        qb.push(" AND actor_id = ").push_bind(actor.clone());
    }
    if let Some(action) = &filter.action {
        qb.push(" AND action = ").push_bind(action.clone());
    }
    if let Some(entity_type) = &filter.entity_type {
        qb.push(" AND entity_type = ").push_bind(entity_type.clone());
    }
    if let Some(from) = filter.from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND created_at <= ").push_bind(to);
    }
}

/// Helper to generate a new audit entry ID.
pub fn generate_audit_id() -> String {
    Uuid::new_v4().to_string()
}
