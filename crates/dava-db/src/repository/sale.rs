//! # Sale Repository
//!
//! Database operations for sales and sale items, including the one write
//! path that matters: the atomic sale transaction.
//!
//! ## Sale Transaction
//! ```text
//! BEGIN
//!   1. Claim invoice sequence   (invoice_counters upsert, atomic per day)
//!   2. INSERT sales header
//!   3. For each line:
//!        INSERT sale_items snapshot
//!        UPDATE batches SET quantity = quantity - n
//!              WHERE id = ? AND quantity >= n   ← guarded decrement
//! COMMIT                (any failure above rolls the whole thing back)
//! ```
//!
//! The guarded decrement is what prevents two concurrent sales from
//! over-allocating the same low-stock batch: SQLite serializes writers, and
//! the guard re-checks stock at write time rather than trusting the earlier
//! read. The counter upsert is what keeps same-day invoice numbers distinct
//! under concurrency; a count-of-today's-sales scheme would race.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::batch::decrement_guarded;
use dava_core::billing::{format_invoice_number, PricedLine, SaleTotals};
use dava_core::{PaymentMethod, Sale, SaleItem};

/// Columns selected for a full `Sale` row.
const SALE_COLUMNS: &str = "id, invoice_number, prescription_id, customer_name, subtotal_paise, \
     gst_paise, discount_bps, total_paise, payment_method, created_by, created_at";

/// Everything the billing engine resolved about a sale, ready to persist.
///
/// Lines are already priced (MRP snapshot, GST applied) and totals already
/// computed; the repository only writes and decrements.
#[derive(Debug, Clone)]
pub struct SaleDraft {
    pub prescription_id: Option<String>,
    pub customer_name: Option<String>,
    pub discount_bps: u32,
    pub payment_method: PaymentMethod,
    pub created_by: String,
    pub lines: Vec<PricedLine>,
    pub totals: SaleTotals,
}

/// Filters for listing sales.
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

/// Aggregate figures for a reporting window.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SalesReport {
    pub total_sales: i64,
    pub total_revenue_paise: i64,
    pub total_gst_paise: i64,
    pub items_sold: i64,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Persists a sale atomically: invoice number, header, item snapshots
    /// and guarded batch decrements, in one transaction.
    ///
    /// ## Errors
    /// * `InsufficientStock` if any line's batch no longer covers its
    ///   quantity - nothing is persisted
    /// * any other `DbError` likewise rolls back everything
    pub async fn create(&self, draft: &SaleDraft) -> DbResult<Sale> {
        let now = Utc::now();
        let today = now.date_naive();
        let sale_id = Uuid::new_v4().to_string();

        let mut tx = self.pool.begin().await?;

        // Claim the next invoice sequence for today. The upsert is atomic
        // within the transaction, so concurrent sales get distinct numbers.
        let sequence: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO invoice_counters (day, last_seq) VALUES (?1, 1)
            ON CONFLICT(day) DO UPDATE SET last_seq = last_seq + 1
            RETURNING last_seq
            "#,
        )
        .bind(today)
        .fetch_one(&mut *tx)
        .await?;

        let invoice_number = format_invoice_number(today, sequence);

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, invoice_number, prescription_id, customer_name,
                subtotal_paise, gst_paise, discount_bps, total_paise,
                payment_method, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&sale_id)
        .bind(&invoice_number)
        .bind(&draft.prescription_id)
        .bind(&draft.customer_name)
        .bind(draft.totals.subtotal.paise())
        .bind(draft.totals.gst.paise())
        .bind(draft.discount_bps)
        .bind(draft.totals.total.paise())
        .bind(draft.payment_method)
        .bind(&draft.created_by)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for line in &draft.lines {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, medicine_id, batch_id,
                    quantity, unit_price_paise, gst_rate_bps, line_total_paise
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&sale_id)
            .bind(&line.medicine_id)
            .bind(&line.batch_id)
            .bind(line.quantity)
            .bind(line.unit_price.paise())
            .bind(line.gst_rate.bps())
            .bind(line.line_total.paise())
            .execute(&mut *tx)
            .await?;

            // Caller chose the batch explicitly, so this decrements that
            // batch directly rather than re-running the FIFO walk. A failed
            // guard aborts the transaction.
            decrement_guarded(&mut tx, &line.batch_id, line.quantity, now).await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            invoice_number = %invoice_number,
            total = %draft.totals.total,
            items = draft.lines.len(),
            "Sale committed"
        );

        let sale = Sale {
            id: sale_id,
            invoice_number,
            prescription_id: draft.prescription_id.clone(),
            customer_name: draft.customer_name.clone(),
            subtotal_paise: draft.totals.subtotal.paise(),
            gst_paise: draft.totals.gst.paise(),
            discount_bps: draft.discount_bps,
            total_paise: draft.totals.total.paise(),
            payment_method: draft.payment_method,
            created_by: draft.created_by.clone(),
            created_at: now,
        };

        Ok(sale)
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets all items for a sale.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, medicine_id, batch_id, quantity,
                   unit_price_paise, gst_rate_bps, line_total_paise
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists sales in a window, newest first.
    pub async fn list(&self, filter: &SaleFilter) -> DbResult<(Vec<Sale>, i64)> {
        debug!(?filter, "Listing sales");

        let limit = if filter.limit > 0 { filter.limit } else { 20 };
        let offset = filter.offset.max(0);

        let mut qb: sqlx::QueryBuilder<sqlx::Sqlite> =
            sqlx::QueryBuilder::new(format!("SELECT {SALE_COLUMNS} FROM sales WHERE 1 = 1"));
        push_window(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let sales = qb.build_query_as::<Sale>().fetch_all(&self.pool).await?;

        let mut count_qb: sqlx::QueryBuilder<sqlx::Sqlite> =
            sqlx::QueryBuilder::new("SELECT COUNT(*) FROM sales WHERE 1 = 1");
        push_window(&mut count_qb, filter);

        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok((sales, total))
    }

    /// Aggregates sales figures over a window.
    pub async fn report(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<SalesReport> {
        let (total_sales, total_revenue_paise, total_gst_paise): (i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT COUNT(id),
                       COALESCE(SUM(total_paise), 0),
                       COALESCE(SUM(gst_paise), 0)
                FROM sales
                WHERE created_at >= ?1 AND created_at <= ?2
                "#,
            )
            .bind(from)
            .bind(to)
            .fetch_one(&self.pool)
            .await?;

        let items_sold: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(si.quantity), 0)
            FROM sale_items si
            INNER JOIN sales s ON si.sale_id = s.id
            WHERE s.created_at >= ?1 AND s.created_at <= ?2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(SalesReport {
            total_sales,
            total_revenue_paise,
            total_gst_paise,
            items_sold,
        })
    }
}

fn push_window(qb: &mut sqlx::QueryBuilder<'_, sqlx::Sqlite>, filter: &SaleFilter) {
    if let Some(from) = filter.from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND created_at <= ").push_bind(to);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
