//! # Inventory Service
//!
//! Medicines, batches and the stock ledger.
//!
//! ## Stock Ledger
//! `available_stock` and `reduce_stock` implement FIFO-by-expiry: batches
//! are consumed soonest-to-expire first so stock doesn't die on the shelf.
//! Planning is pure (dava-core); execution decrements every planned batch
//! inside one transaction, so a reduction either lands completely or not at
//! all.
//!
//! The alert queries (`low_stock_alerts`, `expiry_alerts`) are read-only
//! reports outside the transactional core.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use dava_core::allocation::{plan_fifo, total_available, BatchAllocation};
use dava_core::validation::{
    validate_batch_dates, validate_batch_number, validate_hsn_code, validate_name,
    validate_price_paise, validate_quantity, validate_reorder_level,
};
use dava_core::{Batch, Medicine, Schedule};
use dava_db::{Database, MedicineFilter};

use crate::audit::{AuditEvent, AuditHandle};
use crate::error::{EngineError, EngineResult};

// =============================================================================
// Inputs
// =============================================================================

/// Fields for registering a medicine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMedicine {
    pub name: String,
    pub generic_name: String,
    pub manufacturer: String,
    pub schedule: Schedule,
    pub hsn_code: String,
    pub unit_price_paise: i64,
    pub reorder_level: i64,
    pub description: Option<String>,
}

/// Partial update for a medicine; absent fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicineUpdate {
    pub name: Option<String>,
    pub generic_name: Option<String>,
    pub manufacturer: Option<String>,
    pub schedule: Option<Schedule>,
    pub hsn_code: Option<String>,
    pub unit_price_paise: Option<i64>,
    pub reorder_level: Option<i64>,
    pub description: Option<String>,
}

/// Fields for receiving a batch into stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBatch {
    pub medicine_id: String,
    pub batch_number: String,
    pub manufacture_date: chrono::NaiveDate,
    pub expiry_date: chrono::NaiveDate,
    pub quantity: i64,
    pub mrp_paise: i64,
    pub cost_price_paise: i64,
}

// =============================================================================
// Reports
// =============================================================================

/// A medicine with its batches attached.
#[derive(Debug, Clone, Serialize)]
pub struct MedicineWithBatches {
    pub medicine: Medicine,
    pub batches: Vec<Batch>,
}

/// Dispensable stock for one medicine: unexpired active batches in FIFO
/// order plus their total.
#[derive(Debug, Clone, Serialize)]
pub struct AvailableStock {
    pub total_quantity: i64,
    pub batches: Vec<Batch>,
}

/// One row of the low-stock report.
#[derive(Debug, Clone, Serialize)]
pub struct LowStockAlert {
    pub medicine: Medicine,
    pub current_stock: i64,
    pub reorder_level: i64,
}

/// One row of the expiry report.
#[derive(Debug, Clone, Serialize)]
pub struct ExpiryAlert {
    pub batch: Batch,
    pub medicine: Medicine,
    pub days_until_expiry: i64,
}

// =============================================================================
// Service
// =============================================================================

/// Inventory service for medicines and stock.
#[derive(Debug, Clone)]
pub struct InventoryService {
    db: Database,
    audit: AuditHandle,
}

impl InventoryService {
    /// Creates a new InventoryService.
    pub fn new(db: Database, audit: AuditHandle) -> Self {
        InventoryService { db, audit }
    }

    // -------------------------------------------------------------------------
    // Medicines
    // -------------------------------------------------------------------------

    /// Registers a new medicine.
    pub async fn add_medicine(&self, input: NewMedicine, actor_id: &str) -> EngineResult<Medicine> {
        validate_name("name", &input.name)?;
        validate_name("generic_name", &input.generic_name)?;
        validate_name("manufacturer", &input.manufacturer)?;
        validate_hsn_code(&input.hsn_code)?;
        validate_price_paise("unit_price", input.unit_price_paise)?;
        validate_reorder_level(input.reorder_level)?;

        let now = Utc::now();
        let medicine = Medicine {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            generic_name: input.generic_name.trim().to_string(),
            manufacturer: input.manufacturer.trim().to_string(),
            schedule: input.schedule,
            hsn_code: input.hsn_code.trim().to_string(),
            unit_price_paise: input.unit_price_paise,
            reorder_level: input.reorder_level,
            description: input.description,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.db.medicines().insert(&medicine).await?;

        info!(id = %medicine.id, name = %medicine.name, schedule = %medicine.schedule, "Medicine added");
        self.audit.record(AuditEvent::new(
            actor_id,
            "MEDICINE_ADDED",
            "Medicine",
            &medicine.id,
        ));

        Ok(medicine)
    }

    /// Applies a partial update to a medicine.
    pub async fn update_medicine(
        &self,
        id: &str,
        update: MedicineUpdate,
        actor_id: &str,
    ) -> EngineResult<Medicine> {
        let mut medicine = self
            .db
            .medicines()
            .get_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("Medicine", id))?;

        if let Some(name) = update.name {
            validate_name("name", &name)?;
            medicine.name = name.trim().to_string();
        }
        if let Some(generic_name) = update.generic_name {
            validate_name("generic_name", &generic_name)?;
            medicine.generic_name = generic_name.trim().to_string();
        }
        if let Some(manufacturer) = update.manufacturer {
            validate_name("manufacturer", &manufacturer)?;
            medicine.manufacturer = manufacturer.trim().to_string();
        }
        if let Some(schedule) = update.schedule {
            medicine.schedule = schedule;
        }
        if let Some(hsn_code) = update.hsn_code {
            validate_hsn_code(&hsn_code)?;
            medicine.hsn_code = hsn_code.trim().to_string();
        }
        if let Some(unit_price_paise) = update.unit_price_paise {
            validate_price_paise("unit_price", unit_price_paise)?;
            medicine.unit_price_paise = unit_price_paise;
        }
        if let Some(reorder_level) = update.reorder_level {
            validate_reorder_level(reorder_level)?;
            medicine.reorder_level = reorder_level;
        }
        if update.description.is_some() {
            medicine.description = update.description;
        }

        self.db.medicines().update(&medicine).await?;

        info!(id = %medicine.id, "Medicine updated");
        self.audit.record(AuditEvent::new(
            actor_id,
            "MEDICINE_UPDATED",
            "Medicine",
            &medicine.id,
        ));

        Ok(medicine)
    }

    /// Gets a medicine with its batches (soonest expiry first).
    pub async fn get_medicine(&self, id: &str) -> EngineResult<MedicineWithBatches> {
        let medicine = self
            .db
            .medicines()
            .get_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("Medicine", id))?;

        let batches = self.db.batches().list_for_medicine(id).await?;

        Ok(MedicineWithBatches { medicine, batches })
    }

    /// Lists active medicines with search/schedule filters.
    pub async fn list_medicines(
        &self,
        filter: &MedicineFilter,
    ) -> EngineResult<(Vec<Medicine>, i64)> {
        Ok(self.db.medicines().list(filter).await?)
    }

    /// Soft-deletes a medicine.
    pub async fn remove_medicine(&self, id: &str, actor_id: &str) -> EngineResult<()> {
        self.db.medicines().soft_delete(id).await?;

        info!(id = %id, "Medicine removed");
        self.audit
            .record(AuditEvent::new(actor_id, "MEDICINE_REMOVED", "Medicine", id));

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Batches
    // -------------------------------------------------------------------------

    /// Receives a batch into stock.
    pub async fn add_batch(&self, input: NewBatch, actor_id: &str) -> EngineResult<Batch> {
        validate_batch_number(&input.batch_number)?;
        validate_batch_dates(input.manufacture_date, input.expiry_date)?;
        validate_quantity(input.quantity)?;
        validate_price_paise("mrp", input.mrp_paise)?;
        validate_price_paise("cost_price", input.cost_price_paise)?;

        // The owning medicine must exist and be active.
        let medicine = self
            .db
            .medicines()
            .get_by_id(&input.medicine_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Medicine", &input.medicine_id))?;

        let now = Utc::now();
        let batch = Batch {
            id: Uuid::new_v4().to_string(),
            medicine_id: medicine.id.clone(),
            batch_number: input.batch_number.trim().to_string(),
            manufacture_date: input.manufacture_date,
            expiry_date: input.expiry_date,
            quantity: input.quantity,
            mrp_paise: input.mrp_paise,
            cost_price_paise: input.cost_price_paise,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.db.batches().insert(&batch).await?;

        info!(
            id = %batch.id,
            batch_number = %batch.batch_number,
            medicine = %medicine.name,
            "Batch received"
        );
        self.audit
            .record(AuditEvent::new(actor_id, "BATCH_ADDED", "Batch", &batch.id));

        Ok(batch)
    }

    /// Sets a batch's quantity outright (manual stock adjustment).
    pub async fn adjust_batch_quantity(
        &self,
        batch_id: &str,
        quantity: i64,
        actor_id: &str,
    ) -> EngineResult<Batch> {
        if quantity < 0 {
            return Err(EngineError::Validation(
                "quantity must not be negative".to_string(),
            ));
        }

        self.db.batches().set_quantity(batch_id, quantity).await?;

        let batch = self
            .db
            .batches()
            .get_by_id(batch_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Batch", batch_id))?;

        info!(batch_id = %batch_id, quantity = %quantity, "Batch quantity adjusted");
        self.audit.record(
            AuditEvent::new(actor_id, "BATCH_ADJUSTED", "Batch", batch_id)
                .with_details(serde_json::json!({ "quantity": quantity })),
        );

        Ok(batch)
    }

    // -------------------------------------------------------------------------
    // Stock Ledger
    // -------------------------------------------------------------------------

    /// Returns the dispensable stock for a medicine: active, unexpired
    /// batches ordered soonest-to-expire first, plus their total. Expired
    /// batches are excluded from both the list and the total.
    pub async fn available_stock(&self, medicine_id: &str) -> EngineResult<AvailableStock> {
        let today = Utc::now().date_naive();
        let batches = self.db.batches().list_available(medicine_id, today).await?;

        Ok(AvailableStock {
            total_quantity: total_available(&batches),
            batches,
        })
    }

    /// Depletes stock FIFO-by-expiry.
    ///
    /// Plans against current stock, then applies every decrement in one
    /// transaction. If total available is short, fails with
    /// `InsufficientStock` before touching anything.
    pub async fn reduce_stock(
        &self,
        medicine_id: &str,
        quantity: i64,
        actor_id: &str,
    ) -> EngineResult<Vec<BatchAllocation>> {
        let medicine = self
            .db
            .medicines()
            .get_by_id(medicine_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Medicine", medicine_id))?;

        let today = Utc::now().date_naive();
        let batches = self.db.batches().list_available(medicine_id, today).await?;

        let plan = plan_fifo(&medicine.name, &batches, quantity)?;

        self.db.batches().apply_allocations(&plan).await?;

        info!(
            medicine = %medicine.name,
            quantity = %quantity,
            batches = plan.len(),
            "Stock reduced"
        );
        self.audit.record(
            AuditEvent::new(actor_id, "STOCK_REDUCED", "Medicine", medicine_id)
                .with_details(serde_json::json!({ "quantity": quantity, "allocations": &plan })),
        );

        Ok(plan)
    }

    // -------------------------------------------------------------------------
    // Alert Reports (read-only)
    // -------------------------------------------------------------------------

    /// Active medicines whose dispensable stock is at or below their reorder
    /// level.
    pub async fn low_stock_alerts(&self) -> EngineResult<Vec<LowStockAlert>> {
        let today = Utc::now().date_naive();
        let medicines = self.db.medicines().list_active().await?;

        let mut alerts = Vec::new();
        for medicine in medicines {
            let batches = self.db.batches().list_available(&medicine.id, today).await?;
            let current_stock = total_available(&batches);

            if current_stock <= medicine.reorder_level {
                let reorder_level = medicine.reorder_level;
                alerts.push(LowStockAlert {
                    medicine,
                    current_stock,
                    reorder_level,
                });
            }
        }

        Ok(alerts)
    }

    /// Active batches with remaining stock expiring within `days_threshold`
    /// days, soonest first.
    pub async fn expiry_alerts(&self, days_threshold: i64) -> EngineResult<Vec<ExpiryAlert>> {
        let today = Utc::now().date_naive();
        let threshold = today + Duration::days(days_threshold.max(0));

        let batches = self.db.batches().expiring_within(today, threshold).await?;

        // Resolve each batch's medicine once.
        let mut medicines: HashMap<String, Medicine> = HashMap::new();
        let mut alerts = Vec::new();

        for batch in batches {
            let medicine = match medicines.get(&batch.medicine_id) {
                Some(found) => found.clone(),
                None => {
                    let found = self
                        .db
                        .medicines()
                        .get_by_id(&batch.medicine_id)
                        .await?
                        .ok_or_else(|| EngineError::not_found("Medicine", &batch.medicine_id))?;
                    medicines.insert(batch.medicine_id.clone(), found.clone());
                    found
                }
            };

            let days_until_expiry = batch.days_until_expiry(today);
            alerts.push(ExpiryAlert {
                batch,
                medicine,
                days_until_expiry,
            });
        }

        Ok(alerts)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{engine_db, new_batch, new_medicine};

    #[tokio::test]
    async fn test_add_medicine_and_batch() {
        let (db, audit) = engine_db().await;
        let inventory = InventoryService::new(db, audit);

        let medicine = inventory
            .add_medicine(new_medicine("Amoxicillin 500mg", Schedule::H), "user-1")
            .await
            .unwrap();
        assert_eq!(medicine.schedule, Schedule::H);

        let batch = inventory
            .add_batch(new_batch(&medicine.id, 365, 50), "user-1")
            .await
            .unwrap();
        assert_eq!(batch.quantity, 50);

        let detail = inventory.get_medicine(&medicine.id).await.unwrap();
        assert_eq!(detail.batches.len(), 1);
    }

    #[tokio::test]
    async fn test_add_batch_requires_medicine() {
        let (db, audit) = engine_db().await;
        let inventory = InventoryService::new(db, audit);

        let err = inventory
            .add_batch(new_batch("missing-medicine", 365, 50), "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_add_batch_rejects_inverted_dates() {
        let (db, audit) = engine_db().await;
        let inventory = InventoryService::new(db, audit);

        let medicine = inventory
            .add_medicine(new_medicine("Paracetamol 500mg", Schedule::Otc), "user-1")
            .await
            .unwrap();

        let mut input = new_batch(&medicine.id, 365, 50);
        std::mem::swap(&mut input.manufacture_date, &mut input.expiry_date);

        let err = inventory.add_batch(input, "user-1").await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_available_stock_excludes_expired() {
        let (db, audit) = engine_db().await;
        let inventory = InventoryService::new(db, audit);

        let medicine = inventory
            .add_medicine(new_medicine("Paracetamol 500mg", Schedule::Otc), "user-1")
            .await
            .unwrap();
        inventory.add_batch(new_batch(&medicine.id, 30, 10), "user-1").await.unwrap();
        inventory.add_batch(new_batch(&medicine.id, 365, 20), "user-1").await.unwrap();

        // An expired lot, inserted straight through the repository because
        // add_batch would (rightly) reject stocking expired goods.
        let expired = crate::testing::raw_batch(&medicine.id, -10, 99);
        inventory.db.batches().insert(&expired).await.unwrap();

        let stock = inventory.available_stock(&medicine.id).await.unwrap();
        assert_eq!(stock.total_quantity, 30);
        assert_eq!(stock.batches.len(), 2);
        // FIFO order: soonest expiry first
        assert!(stock.batches[0].expiry_date < stock.batches[1].expiry_date);
    }

    #[tokio::test]
    async fn test_reduce_stock_fifo() {
        let (db, audit) = engine_db().await;
        let inventory = InventoryService::new(db, audit);

        let medicine = inventory
            .add_medicine(new_medicine("Paracetamol 500mg", Schedule::Otc), "user-1")
            .await
            .unwrap();
        let soon = inventory.add_batch(new_batch(&medicine.id, 30, 10), "user-1").await.unwrap();
        let late = inventory.add_batch(new_batch(&medicine.id, 365, 20), "user-1").await.unwrap();

        let plan = inventory.reduce_stock(&medicine.id, 15, "user-1").await.unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].batch_id, soon.id);
        assert_eq!(plan[0].quantity, 10);
        assert_eq!(plan[1].batch_id, late.id);
        assert_eq!(plan[1].quantity, 5);

        let stock = inventory.available_stock(&medicine.id).await.unwrap();
        assert_eq!(stock.total_quantity, 15);
    }

    #[tokio::test]
    async fn test_reduce_stock_all_or_nothing() {
        let (db, audit) = engine_db().await;
        let inventory = InventoryService::new(db, audit);

        let medicine = inventory
            .add_medicine(new_medicine("Paracetamol 500mg", Schedule::Otc), "user-1")
            .await
            .unwrap();
        inventory.add_batch(new_batch(&medicine.id, 30, 10), "user-1").await.unwrap();
        inventory.add_batch(new_batch(&medicine.id, 365, 20), "user-1").await.unwrap();

        let err = inventory.reduce_stock(&medicine.id, 31, "user-1").await.unwrap_err();
        match err {
            EngineError::InsufficientStock { available, requested, .. } => {
                assert_eq!(available, 30);
                assert_eq!(requested, 31);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // No batch was touched
        let stock = inventory.available_stock(&medicine.id).await.unwrap();
        assert_eq!(stock.total_quantity, 30);
    }

    #[tokio::test]
    async fn test_low_stock_alerts() {
        let (db, audit) = engine_db().await;
        let inventory = InventoryService::new(db, audit);

        // reorder level 10 (from the fixture); 5 on hand → alert
        let low = inventory
            .add_medicine(new_medicine("Tramadol 50mg", Schedule::H1), "user-1")
            .await
            .unwrap();
        inventory.add_batch(new_batch(&low.id, 180, 5), "user-1").await.unwrap();

        // plenty on hand → no alert
        let fine = inventory
            .add_medicine(new_medicine("Paracetamol 500mg", Schedule::Otc), "user-1")
            .await
            .unwrap();
        inventory.add_batch(new_batch(&fine.id, 180, 500), "user-1").await.unwrap();

        let alerts = inventory.low_stock_alerts().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].medicine.id, low.id);
        assert_eq!(alerts[0].current_stock, 5);
        assert_eq!(alerts[0].reorder_level, 10);
    }

    #[tokio::test]
    async fn test_expiry_alerts_window_and_order() {
        let (db, audit) = engine_db().await;
        let inventory = InventoryService::new(db, audit);

        let medicine = inventory
            .add_medicine(new_medicine("Amoxicillin 500mg", Schedule::H), "user-1")
            .await
            .unwrap();
        let b60 = inventory.add_batch(new_batch(&medicine.id, 60, 10), "user-1").await.unwrap();
        let b30 = inventory.add_batch(new_batch(&medicine.id, 30, 10), "user-1").await.unwrap();
        // Outside the window
        inventory.add_batch(new_batch(&medicine.id, 365, 10), "user-1").await.unwrap();

        let alerts = inventory.expiry_alerts(90).await.unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].batch.id, b30.id);
        assert_eq!(alerts[1].batch.id, b60.id);
        assert_eq!(alerts[0].days_until_expiry, 30);
        assert_eq!(alerts[0].medicine.id, medicine.id);
    }
}
