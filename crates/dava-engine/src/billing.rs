//! # Billing Engine
//!
//! Sale creation with compliance validation, GST pricing and atomic stock
//! decrement.
//!
//! ## Sale State Machine
//! ```text
//! Validating ──► Pricing ──► Allocating ──► Committed
//!     │             │             │
//!     └─────────────┴─────────────┴──► Aborted (nothing persisted)
//! ```
//! There is no partial-commit state. Validation, compliance and pricing all
//! run before the transaction opens; allocation failures inside the
//! transaction roll back the header and items that were written with them.
//!
//! ## Compliance
//! Every line is checked against its medicine's drug schedule. The check
//! reads the referenced prescription's stored `doctor_verified` flag - the
//! presence of a prescription id alone is not proof of verification - and
//! rejects prescriptions older than the schedule's validity window.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use dava_core::billing::{compute_totals, price_line};
use dava_core::compliance::{gst_rate_for_hsn, is_prescription_valid, validate_dispense, DispenseCheck};
use dava_core::validation::{validate_discount_bps, validate_quantity, validate_sale_size};
use dava_core::{Batch, Medicine, PaymentMethod, Prescription, Sale, SaleItem};
use dava_db::{Database, SaleDraft, SaleFilter, SalesReport};

use crate::audit::{AuditEvent, AuditHandle};
use crate::error::{EngineError, EngineResult};

// =============================================================================
// Inputs
// =============================================================================

/// One requested line: the batch is chosen explicitly by the caller
/// (usually from the FIFO-ordered stock view).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItemInput {
    pub medicine_id: String,
    pub batch_id: String,
    pub quantity: i64,
}

/// A sale request as it arrives from the counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSale {
    pub prescription_id: Option<String>,
    pub customer_name: Option<String>,
    pub items: Vec<SaleItemInput>,
    /// Discount in basis points (1000 = 10%).
    pub discount_bps: u32,
    pub payment_method: PaymentMethod,
    pub actor_id: String,
}

// =============================================================================
// Outputs
// =============================================================================

/// A persisted line with its medicine and batch resolved.
#[derive(Debug, Clone, Serialize)]
pub struct DispensedLine {
    pub item: SaleItem,
    pub medicine: Medicine,
    pub batch: Batch,
}

/// The committed sale with line items and references attached.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedSale {
    pub sale: Sale,
    pub lines: Vec<DispensedLine>,
    pub prescription: Option<Prescription>,
}

// =============================================================================
// Engine
// =============================================================================

/// Billing and dispensing engine.
#[derive(Debug, Clone)]
pub struct BillingEngine {
    db: Database,
    audit: AuditHandle,
}

impl BillingEngine {
    /// Creates a new BillingEngine.
    pub fn new(db: Database, audit: AuditHandle) -> Self {
        BillingEngine { db, audit }
    }

    /// Creates a sale.
    ///
    /// ## Steps
    /// 1. Reject an empty item list, oversized sales, bad discounts
    /// 2. Resolve the prescription (when referenced) and every
    ///    medicine/batch pair, rejecting mismatched batches
    /// 3. Run the compliance check per line against the medicine's schedule
    /// 4. Price lines from the batch MRP and the HSN-based GST rate
    /// 5. Compute totals with the discount applied
    /// 6. Persist atomically: invoice number, header, item snapshots,
    ///    guarded batch decrements - all in one transaction
    /// 7. Reload and return the sale with resolved references
    ///
    /// Any failure aborts the whole sale; nothing partial survives.
    pub async fn create_sale(&self, input: CreateSale) -> EngineResult<CompletedSale> {
        if input.items.is_empty() {
            return Err(EngineError::EmptySale);
        }
        validate_sale_size(input.items.len())?;
        validate_discount_bps(input.discount_bps)?;

        let prescription = match &input.prescription_id {
            Some(id) => Some(
                self.db
                    .prescriptions()
                    .get_by_id(id)
                    .await?
                    .ok_or_else(|| EngineError::not_found("Prescription", id))?,
            ),
            None => None,
        };

        let today = Utc::now().date_naive();
        let mut lines = Vec::with_capacity(input.items.len());

        for item in &input.items {
            validate_quantity(item.quantity)?;

            let medicine = self
                .db
                .medicines()
                .get_by_id(&item.medicine_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Medicine", &item.medicine_id))?;

            let batch = self
                .db
                .batches()
                .get_by_id(&item.batch_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Batch", &item.batch_id))?;

            if batch.medicine_id != medicine.id {
                return Err(EngineError::BatchMismatch {
                    batch_id: batch.id,
                    medicine_id: medicine.id,
                });
            }

            let check = compliance_check(&medicine, item.quantity, prescription.as_ref(), today);
            if !check.allowed {
                return Err(EngineError::Compliance {
                    errors: check.errors,
                });
            }
            for warning in &check.warnings {
                warn!(medicine = %medicine.name, "{warning}");
            }

            let gst_rate = gst_rate_for_hsn(&medicine.hsn_code);
            lines.push(price_line(
                &medicine.id,
                &batch.id,
                item.quantity,
                batch.mrp(),
                gst_rate,
            ));
        }

        let totals = compute_totals(&lines, input.discount_bps);

        let draft = SaleDraft {
            prescription_id: input.prescription_id.clone(),
            customer_name: input.customer_name.clone(),
            discount_bps: input.discount_bps,
            payment_method: input.payment_method,
            created_by: input.actor_id.clone(),
            lines,
            totals,
        };

        // The transactional part: invoice number, header, items, decrements.
        let sale = self.db.sales().create(&draft).await?;

        info!(
            invoice_number = %sale.invoice_number,
            total = %sale.total(),
            "Sale created"
        );
        self.audit.record(
            AuditEvent::new(&input.actor_id, "SALE_CREATED", "Sale", &sale.id).with_details(
                serde_json::json!({
                    "invoice_number": sale.invoice_number,
                    "total_paise": sale.total_paise,
                    "items": input.items.len(),
                }),
            ),
        );

        self.assemble(sale, prescription).await
    }

    /// Gets a sale with its line items and resolved references.
    pub async fn get_sale(&self, id: &str) -> EngineResult<CompletedSale> {
        let sale = self
            .db
            .sales()
            .get_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("Sale", id))?;

        let prescription = match &sale.prescription_id {
            Some(prescription_id) => self.db.prescriptions().get_by_id(prescription_id).await?,
            None => None,
        };

        self.assemble(sale, prescription).await
    }

    /// Lists sales in a window, newest first, with the total match count.
    pub async fn list_sales(&self, filter: &SaleFilter) -> EngineResult<(Vec<Sale>, i64)> {
        Ok(self.db.sales().list(filter).await?)
    }

    /// Aggregates sales figures over a reporting window.
    pub async fn sales_report(
        &self,
        from: chrono::DateTime<Utc>,
        to: chrono::DateTime<Utc>,
    ) -> EngineResult<SalesReport> {
        Ok(self.db.sales().report(from, to).await?)
    }

    /// Runs the dispensing compliance check for one medicine without
    /// creating a sale (the counter calls this while building the cart).
    ///
    /// When a prescription is referenced, its stored `doctor_verified` flag
    /// and its validity window are what count - not the mere presence of an
    /// id.
    pub async fn validate_dispensing(
        &self,
        medicine_id: &str,
        quantity: i64,
        prescription_id: Option<&str>,
    ) -> EngineResult<DispenseCheck> {
        let medicine = self
            .db
            .medicines()
            .get_by_id(medicine_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Medicine", medicine_id))?;

        let prescription = match prescription_id {
            Some(id) => Some(
                self.db
                    .prescriptions()
                    .get_by_id(id)
                    .await?
                    .ok_or_else(|| EngineError::not_found("Prescription", id))?,
            ),
            None => None,
        };

        let today = Utc::now().date_naive();
        Ok(compliance_check(
            &medicine,
            quantity,
            prescription.as_ref(),
            today,
        ))
    }

    /// Attaches items, medicines, batches and the prescription to a sale
    /// header.
    async fn assemble(
        &self,
        sale: Sale,
        prescription: Option<Prescription>,
    ) -> EngineResult<CompletedSale> {
        let items = self.db.sales().get_items(&sale.id).await?;

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let medicine = self
                .db
                .medicines()
                .get_by_id(&item.medicine_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Medicine", &item.medicine_id))?;
            let batch = self
                .db
                .batches()
                .get_by_id(&item.batch_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Batch", &item.batch_id))?;

            lines.push(DispensedLine {
                item,
                medicine,
                batch,
            });
        }

        Ok(CompletedSale {
            sale,
            lines,
            prescription,
        })
    }
}

/// The full per-line compliance check: schedule rules via the rule table,
/// doctor verification from the prescription's stored flag, and the
/// schedule's prescription validity window.
fn compliance_check(
    medicine: &Medicine,
    quantity: i64,
    prescription: Option<&Prescription>,
    today: NaiveDate,
) -> DispenseCheck {
    let has_prescription = prescription.is_some();
    let doctor_verified = prescription.map(|p| p.doctor_verified).unwrap_or(false);

    let mut check = validate_dispense(medicine.schedule, has_prescription, doctor_verified, quantity);

    if let Some(prescription) = prescription {
        if !is_prescription_valid(prescription.prescription_date, medicine.schedule, today) {
            check.errors.push(format!(
                "Prescription dated {} is no longer valid for {} medicines",
                prescription.prescription_date, medicine.schedule
            ));
            check.allowed = false;
        }
    }

    check
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::InventoryService;
    use crate::testing::{engine_db, new_batch, new_medicine, stored_prescription};
    use dava_core::Schedule;

    async fn setup() -> (Database, AuditHandle, BillingEngine, InventoryService) {
        let (db, audit) = engine_db().await;
        let billing = BillingEngine::new(db.clone(), audit.clone());
        let inventory = InventoryService::new(db.clone(), audit.clone());
        (db, audit, billing, inventory)
    }

    fn sale_input(medicine_id: &str, batch_id: &str, quantity: i64) -> CreateSale {
        CreateSale {
            prescription_id: None,
            customer_name: Some("Walk-in".to_string()),
            items: vec![SaleItemInput {
                medicine_id: medicine_id.to_string(),
                batch_id: batch_id.to_string(),
                quantity,
            }],
            discount_bps: 0,
            payment_method: PaymentMethod::Cash,
            actor_id: "user-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_sale_otc_happy_path() {
        let (_db, _audit, billing, inventory) = setup().await;

        let medicine = inventory
            .add_medicine(new_medicine("Paracetamol 500mg", Schedule::Otc), "user-1")
            .await
            .unwrap();
        let batch = inventory
            .add_batch(new_batch(&medicine.id, 365, 30), "user-1")
            .await
            .unwrap();

        let mut input = sale_input(&medicine.id, &batch.id, 2);
        input.discount_bps = 1000;

        let completed = billing.create_sale(input).await.unwrap();

        // MRP ₹100 × 2, 12% GST, 10% discount → ₹201.60
        assert_eq!(completed.sale.subtotal_paise, 18000);
        assert_eq!(completed.sale.gst_paise, 2160);
        assert_eq!(completed.sale.total_paise, 20160);
        assert!(completed.sale.invoice_number.starts_with("INV"));

        assert_eq!(completed.lines.len(), 1);
        assert_eq!(completed.lines[0].item.quantity, 2);
        assert_eq!(completed.lines[0].item.gst_rate_bps, 1200);
        assert_eq!(completed.lines[0].medicine.id, medicine.id);
        // Batch reference reflects the post-sale stock level
        assert_eq!(completed.lines[0].batch.quantity, 28);
        assert!(completed.prescription.is_none());
    }

    #[tokio::test]
    async fn test_create_sale_rejects_empty_item_list() {
        let (_db, _audit, billing, _inventory) = setup().await;

        let input = CreateSale {
            prescription_id: None,
            customer_name: None,
            items: vec![],
            discount_bps: 0,
            payment_method: PaymentMethod::Cash,
            actor_id: "user-1".to_string(),
        };

        let err = billing.create_sale(input).await.unwrap_err();
        assert!(matches!(err, EngineError::EmptySale));
    }

    #[tokio::test]
    async fn test_scheduled_sale_without_prescription_is_rejected() {
        let (db, _audit, billing, inventory) = setup().await;

        let medicine = inventory
            .add_medicine(new_medicine("Amoxicillin 500mg", Schedule::H), "user-1")
            .await
            .unwrap();
        let batch = inventory
            .add_batch(new_batch(&medicine.id, 365, 30), "user-1")
            .await
            .unwrap();

        let err = billing
            .create_sale(sale_input(&medicine.id, &batch.id, 5))
            .await
            .unwrap_err();

        match err {
            EngineError::Compliance { errors } => {
                assert!(errors.iter().any(|e| e.contains("prescription")));
            }
            other => panic!("expected Compliance, got {other:?}"),
        }

        // The sale must not be created and stock must be untouched
        let (sales, _) = db.sales().list(&SaleFilter::default()).await.unwrap();
        assert!(sales.is_empty());
        assert_eq!(db.batches().get_by_id(&batch.id).await.unwrap().unwrap().quantity, 30);
    }

    #[tokio::test]
    async fn test_scheduled_sale_with_verified_prescription() {
        let (db, _audit, billing, inventory) = setup().await;

        let medicine = inventory
            .add_medicine(new_medicine("Amoxicillin 500mg", Schedule::H), "user-1")
            .await
            .unwrap();
        let batch = inventory
            .add_batch(new_batch(&medicine.id, 365, 30), "user-1")
            .await
            .unwrap();
        let prescription = stored_prescription(&db, true, 0).await;

        let mut input = sale_input(&medicine.id, &batch.id, 5);
        input.prescription_id = Some(prescription.id.clone());

        let completed = billing.create_sale(input).await.unwrap();
        assert_eq!(
            completed.prescription.as_ref().map(|p| p.id.as_str()),
            Some(prescription.id.as_str())
        );
        assert_eq!(completed.sale.prescription_id, Some(prescription.id));
    }

    #[tokio::test]
    async fn test_unverified_doctor_blocks_scheduled_sale() {
        let (db, _audit, billing, inventory) = setup().await;

        let medicine = inventory
            .add_medicine(new_medicine("Amoxicillin 500mg", Schedule::H), "user-1")
            .await
            .unwrap();
        let batch = inventory
            .add_batch(new_batch(&medicine.id, 365, 30), "user-1")
            .await
            .unwrap();
        // Prescription exists, but the registration never validated.
        let prescription = stored_prescription(&db, false, 0).await;

        let mut input = sale_input(&medicine.id, &batch.id, 5);
        input.prescription_id = Some(prescription.id);

        let err = billing.create_sale(input).await.unwrap_err();
        match err {
            EngineError::Compliance { errors } => {
                assert!(errors.iter().any(|e| e.contains("Doctor verification")));
            }
            other => panic!("expected Compliance, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stale_prescription_blocks_schedule_x() {
        let (db, _audit, billing, inventory) = setup().await;

        let medicine = inventory
            .add_medicine(new_medicine("Alprazolam 0.5mg", Schedule::X), "user-1")
            .await
            .unwrap();
        let batch = inventory
            .add_batch(new_batch(&medicine.id, 365, 30), "user-1")
            .await
            .unwrap();
        // Schedule X prescriptions are valid for 7 days; this one is 10 old.
        let prescription = stored_prescription(&db, true, 10).await;

        let mut input = sale_input(&medicine.id, &batch.id, 5);
        input.prescription_id = Some(prescription.id);

        let err = billing.create_sale(input).await.unwrap_err();
        match err {
            EngineError::Compliance { errors } => {
                assert!(errors.iter().any(|e| e.contains("no longer valid")));
            }
            other => panic!("expected Compliance, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_batch_mismatch_rejected() {
        let (_db, _audit, billing, inventory) = setup().await;

        let medicine_a = inventory
            .add_medicine(new_medicine("Paracetamol 500mg", Schedule::Otc), "user-1")
            .await
            .unwrap();
        let medicine_b = inventory
            .add_medicine(new_medicine("Cetirizine 10mg", Schedule::Otc), "user-1")
            .await
            .unwrap();
        let batch_b = inventory
            .add_batch(new_batch(&medicine_b.id, 365, 30), "user-1")
            .await
            .unwrap();

        // Medicine A with medicine B's batch
        let err = billing
            .create_sale(sale_input(&medicine_a.id, &batch_b.id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::BatchMismatch { .. }));
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let (_db, _audit, billing, inventory) = setup().await;

        let err = billing
            .create_sale(sale_input("missing-med", "missing-batch", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));

        let medicine = inventory
            .add_medicine(new_medicine("Paracetamol 500mg", Schedule::Otc), "user-1")
            .await
            .unwrap();
        let err = billing
            .create_sale(sale_input(&medicine.id, "missing-batch", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity, .. } if entity == "Batch"));
    }

    #[tokio::test]
    async fn test_validate_dispensing_cross_checks_verification_flag() {
        let (db, _audit, billing, inventory) = setup().await;

        let medicine = inventory
            .add_medicine(new_medicine("Amoxicillin 500mg", Schedule::H), "user-1")
            .await
            .unwrap();

        // Unverified prescription: id presence is not enough
        let unverified = stored_prescription(&db, false, 0).await;
        let check = billing
            .validate_dispensing(&medicine.id, 5, Some(&unverified.id))
            .await
            .unwrap();
        assert!(!check.allowed);

        let verified = stored_prescription(&db, true, 0).await;
        let check = billing
            .validate_dispensing(&medicine.id, 5, Some(&verified.id))
            .await
            .unwrap();
        assert!(check.allowed);
    }

    #[tokio::test]
    async fn test_validate_dispensing_schedule_x_cap() {
        let (db, _audit, billing, inventory) = setup().await;

        let medicine = inventory
            .add_medicine(new_medicine("Alprazolam 0.5mg", Schedule::X), "user-1")
            .await
            .unwrap();
        let prescription = stored_prescription(&db, true, 0).await;

        let check = billing
            .validate_dispensing(&medicine.id, 30, Some(&prescription.id))
            .await
            .unwrap();
        assert!(check.allowed);
        assert!(!check.warnings.is_empty());

        let check = billing
            .validate_dispensing(&medicine.id, 31, Some(&prescription.id))
            .await
            .unwrap();
        assert!(!check.allowed);
        assert!(check.errors.iter().any(|e| e.contains("30 units")));
    }

    #[tokio::test]
    async fn test_get_sale_round_trip() {
        let (_db, _audit, billing, inventory) = setup().await;

        let medicine = inventory
            .add_medicine(new_medicine("Paracetamol 500mg", Schedule::Otc), "user-1")
            .await
            .unwrap();
        let batch = inventory
            .add_batch(new_batch(&medicine.id, 365, 30), "user-1")
            .await
            .unwrap();

        let created = billing
            .create_sale(sale_input(&medicine.id, &batch.id, 3))
            .await
            .unwrap();

        let fetched = billing.get_sale(&created.sale.id).await.unwrap();
        assert_eq!(fetched.sale.invoice_number, created.sale.invoice_number);
        assert_eq!(fetched.lines.len(), 1);
        assert_eq!(fetched.lines[0].item.quantity, 3);

        let err = billing.get_sale("no-such-sale").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }
}
