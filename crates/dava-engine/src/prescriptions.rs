//! # Prescription Service
//!
//! The e-prescription upload pipeline:
//!
//! ```text
//! FHIR R4 bundle (JSON)
//!      │  parse (dava-core::fhir)        → MalformedBundle on failure
//!      ▼
//! doctor registration format check       → sets doctor_verified
//!      ▼
//! Prescription row (raw bundle + extracted fields), insert-only
//! ```
//!
//! A failed parse persists nothing. The registration check is format-only
//! against the council patterns; it does not call an external registry.

use chrono::Utc;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use dava_core::compliance::{validate_doctor_registration, RegistrationCheck};
use dava_core::fhir::{parse_bundle, ParsedPrescription};
use dava_core::Prescription;
use dava_db::{Database, PrescriptionFilter};

use crate::audit::{AuditEvent, AuditHandle};
use crate::error::{EngineError, EngineResult};

/// Prescription service for uploads and lookups.
#[derive(Debug, Clone)]
pub struct PrescriptionService {
    db: Database,
    audit: AuditHandle,
}

impl PrescriptionService {
    /// Creates a new PrescriptionService.
    pub fn new(db: Database, audit: AuditHandle) -> Self {
        PrescriptionService { db, audit }
    }

    /// Uploads a FHIR bundle: parses it, validates the doctor registration
    /// format and persists the prescription record.
    ///
    /// `doctor_verified` records whether the registration matched a council
    /// format; the billing engine later refuses scheduled medicines when it
    /// is false.
    pub async fn upload(&self, bundle: &Value, actor_id: &str) -> EngineResult<Prescription> {
        let parsed = parse_bundle(bundle)?;

        let registration = validate_doctor_registration(&parsed.doctor_registration);

        let now = Utc::now();
        let prescription = Prescription {
            id: Uuid::new_v4().to_string(),
            fhir_bundle: bundle.to_string(),
            doctor_name: parsed.doctor_name,
            doctor_registration: parsed.doctor_registration,
            doctor_verified: registration.is_valid(),
            patient_name: parsed.patient_name,
            patient_id: parsed.patient_id,
            prescription_date: parsed.prescription_date.date_naive(),
            created_at: now,
        };

        self.db.prescriptions().insert(&prescription).await?;

        info!(
            id = %prescription.id,
            doctor = %prescription.doctor_name,
            verified = prescription.doctor_verified,
            "Prescription uploaded"
        );
        self.audit.record(AuditEvent::new(
            actor_id,
            "PRESCRIPTION_UPLOADED",
            "Prescription",
            &prescription.id,
        ));

        Ok(prescription)
    }

    /// Gets a prescription by ID.
    pub async fn get(&self, id: &str) -> EngineResult<Prescription> {
        self.db
            .prescriptions()
            .get_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("Prescription", id))
    }

    /// Re-parses the stored bundle of a prescription into flat facts
    /// (medication list, dosages and so on for display).
    pub async fn parsed(&self, id: &str) -> EngineResult<ParsedPrescription> {
        let prescription = self.get(id).await?;

        let bundle: Value = serde_json::from_str(&prescription.fhir_bundle)
            .map_err(|e| EngineError::Validation(format!("Stored bundle is not JSON: {e}")))?;

        Ok(parse_bundle(&bundle)?)
    }

    /// Lists prescriptions with patient/doctor/date filters.
    pub async fn list(
        &self,
        filter: &PrescriptionFilter,
    ) -> EngineResult<(Vec<Prescription>, i64)> {
        Ok(self.db.prescriptions().list(filter).await?)
    }

    /// Checks a doctor registration number against the council formats.
    /// Format-only; no external registry call.
    pub fn verify_doctor(&self, registration: &str) -> RegistrationCheck {
        validate_doctor_registration(registration)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{engine_db, sample_fhir_bundle};
    use dava_core::FhirError;

    #[tokio::test]
    async fn test_upload_round_trip() {
        let (db, audit) = engine_db().await;
        let service = PrescriptionService::new(db, audit);

        let bundle = sample_fhir_bundle();
        let prescription = service.upload(&bundle, "user-1").await.unwrap();

        assert_eq!(prescription.patient_name, "Rajesh Kumar");
        assert_eq!(prescription.doctor_registration, "MH/12345");
        // MH/12345 matches the national council format
        assert!(prescription.doctor_verified);

        let fetched = service.get(&prescription.id).await.unwrap();
        assert_eq!(fetched.patient_name, "Rajesh Kumar");

        let parsed = service.parsed(&prescription.id).await.unwrap();
        assert_eq!(parsed.medications.len(), 1);
        assert_eq!(parsed.medications[0].name, "Amoxicillin 500mg");
        assert_eq!(parsed.medications[0].quantity, Some(21));
    }

    #[tokio::test]
    async fn test_unrecognized_registration_leaves_doctor_unverified() {
        let (db, audit) = engine_db().await;
        let service = PrescriptionService::new(db, audit);

        let mut bundle = sample_fhir_bundle();
        bundle["entry"][1]["resource"]["identifier"][0]["value"] =
            serde_json::json!("XX-YY-1234");

        let prescription = service.upload(&bundle, "user-1").await.unwrap();
        assert!(!prescription.doctor_verified);
    }

    #[tokio::test]
    async fn test_malformed_bundle_persists_nothing() {
        let (db, audit) = engine_db().await;
        let service = PrescriptionService::new(db.clone(), audit);

        // Strip the medication request: the bundle must be rejected
        let mut bundle = sample_fhir_bundle();
        bundle["entry"].as_array_mut().unwrap().remove(2);

        let err = service.upload(&bundle, "user-1").await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::MalformedBundle(FhirError::NoMedicationRequests)
        ));

        let (stored, total) = db
            .prescriptions()
            .list(&PrescriptionFilter::default())
            .await
            .unwrap();
        assert!(stored.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_list_filters_by_patient() {
        let (db, audit) = engine_db().await;
        let service = PrescriptionService::new(db, audit);

        service.upload(&sample_fhir_bundle(), "user-1").await.unwrap();

        let filter = PrescriptionFilter {
            patient_name: Some("rajesh".to_string()),
            ..Default::default()
        };
        let (found, total) = service.list(&filter).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].patient_name, "Rajesh Kumar");

        let filter = PrescriptionFilter {
            patient_name: Some("nobody".to_string()),
            ..Default::default()
        };
        let (found, _) = service.list(&filter).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_verify_doctor_formats() {
        let (db, audit) = engine_db().await;
        let service = PrescriptionService::new(db, audit);

        assert!(service.verify_doctor("MH/12345").is_valid());
        assert!(!service.verify_doctor("XX-YY-1234").is_valid());
    }
}
