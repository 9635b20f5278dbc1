//! # FHIR Bundle Parser
//!
//! Parses ABDM/NDHM-style FHIR R4 e-prescription bundles into flat
//! prescription facts.
//!
//! ## Parse Pipeline
//! ```text
//! serde_json::Value (untyped bundle)
//!      │
//!      ▼
//! structural preconditions, checked in order:
//!   1. resourceType == "Bundle", non-empty entry list
//!   2. exactly-one Patient resource present
//!   3. exactly-one Practitioner resource present
//!   4. at least one MedicationRequest
//!      │
//!      ▼
//! field extraction (names, identifiers, medications, date)
//!      │
//!      ▼
//! ParsedPrescription  - or -  FhirError (a distinct variant per failure)
//! ```
//!
//! The bundle is traversed as a `serde_json::Value` tree with safe-navigation
//! helpers; every failure surfaces as a typed [`FhirError`] rather than a
//! panic mid-traversal. Callers map the whole taxonomy to a 400-equivalent.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// =============================================================================
// Errors
// =============================================================================

/// Reasons a FHIR bundle fails to parse. Each precondition in the pipeline
/// above has its own variant so clients get an actionable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FhirError {
    #[error("Invalid FHIR bundle: resourceType must be Bundle")]
    NotABundle,

    #[error("Invalid FHIR bundle: missing or empty entry list")]
    NoEntries,

    #[error("Patient resource not found in FHIR bundle")]
    PatientMissing,

    #[error("Practitioner resource not found in FHIR bundle")]
    PractitionerMissing,

    #[error("No medication requests found in FHIR bundle")]
    NoMedicationRequests,

    #[error("Patient name not found in FHIR bundle")]
    PatientNameMissing,

    #[error("Practitioner name not found in FHIR bundle")]
    PractitionerNameMissing,

    #[error("Doctor registration number not found in FHIR bundle")]
    RegistrationMissing,
}

// =============================================================================
// Parsed Output
// =============================================================================

/// Flat prescription facts extracted from a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedPrescription {
    pub patient_name: String,
    pub patient_id: Option<String>,
    pub doctor_name: String,
    pub doctor_registration: String,
    pub prescription_date: DateTime<Utc>,
    pub medications: Vec<ParsedMedication>,
}

/// One MedicationRequest, flattened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedMedication {
    pub name: String,
    pub code: Option<String>,
    /// Dose quantity rendered as "value unit", e.g. "500 mg".
    pub dosage: Option<String>,
    /// Units to dispense.
    pub quantity: Option<i64>,
    /// Expected supply duration in days.
    pub duration: Option<i64>,
    pub instructions: Option<String>,
}

// =============================================================================
// Parser
// =============================================================================

/// Parses a FHIR R4 bundle into prescription facts.
pub fn parse_bundle(bundle: &Value) -> Result<ParsedPrescription, FhirError> {
    if bundle.get("resourceType").and_then(Value::as_str) != Some("Bundle") {
        return Err(FhirError::NotABundle);
    }

    let resources = bundle_resources(bundle)?;

    let patient = find_resource(&resources, "Patient").ok_or(FhirError::PatientMissing)?;
    let practitioner =
        find_resource(&resources, "Practitioner").ok_or(FhirError::PractitionerMissing)?;

    let medication_requests: Vec<&Value> = resources
        .iter()
        .copied()
        .filter(|r| resource_type(r) == Some("MedicationRequest"))
        .collect();
    if medication_requests.is_empty() {
        return Err(FhirError::NoMedicationRequests);
    }

    let patient_name = extract_human_name(patient).ok_or(FhirError::PatientNameMissing)?;
    let patient_id = extract_patient_id(patient);

    let doctor_name =
        extract_human_name(practitioner).ok_or(FhirError::PractitionerNameMissing)?;
    let doctor_registration = extract_doctor_registration(practitioner)?;

    let medications = medication_requests
        .iter()
        .map(|mr| parse_medication_request(mr))
        .collect();

    // Prescription date comes from the first medication request; absent an
    // authored timestamp we fall back to the current time.
    let prescription_date = medication_requests[0]
        .get("authoredOn")
        .and_then(Value::as_str)
        .and_then(parse_fhir_datetime)
        .unwrap_or_else(Utc::now);

    Ok(ParsedPrescription {
        patient_name,
        patient_id,
        doctor_name,
        doctor_registration,
        prescription_date,
        medications,
    })
}

// =============================================================================
// Navigation Helpers
// =============================================================================

/// Collects `entry[*].resource` objects; errors on a missing or empty list.
fn bundle_resources(bundle: &Value) -> Result<Vec<&Value>, FhirError> {
    let entries = bundle
        .get("entry")
        .and_then(Value::as_array)
        .ok_or(FhirError::NoEntries)?;
    if entries.is_empty() {
        return Err(FhirError::NoEntries);
    }
    Ok(entries.iter().filter_map(|e| e.get("resource")).collect())
}

fn resource_type(resource: &Value) -> Option<&str> {
    resource.get("resourceType").and_then(Value::as_str)
}

fn find_resource<'a>(resources: &[&'a Value], ty: &str) -> Option<&'a Value> {
    resources.iter().copied().find(|r| resource_type(r) == Some(ty))
}

/// Extracts a human name from a Patient or Practitioner resource.
///
/// Prefers the free-text `name[0].text`; otherwise joins the given-name
/// parts with spaces and appends the family name. Returns None when neither
/// form is present.
fn extract_human_name(resource: &Value) -> Option<String> {
    let name = resource.get("name").and_then(Value::as_array)?.first()?;

    if let Some(text) = name.get("text").and_then(Value::as_str) {
        return Some(text.to_string());
    }

    let given = name
        .get("given")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();
    let family = name.get("family").and_then(Value::as_str).unwrap_or_default();

    let combined = format!("{given} {family}").trim().to_string();
    if combined.is_empty() {
        None
    } else {
        Some(combined)
    }
}

/// Extracts the patient identifier.
///
/// Prefers an identifier whose system URI carries a national health-id
/// marker (ABDM health id); falls back to the first identifier, then to the
/// resource's own id. Absence is not an error - walk-in patients exist.
fn extract_patient_id(patient: &Value) -> Option<String> {
    if let Some(identifiers) = patient.get("identifier").and_then(Value::as_array) {
        let health_id = identifiers.iter().find(|id| {
            id.get("system")
                .and_then(Value::as_str)
                .map(|s| s.contains("healthid") || s.contains("abdm"))
                .unwrap_or(false)
        });

        if let Some(value) = health_id
            .or_else(|| identifiers.first())
            .and_then(|id| id.get("value"))
            .and_then(Value::as_str)
        {
            return Some(value.to_string());
        }
    }

    patient.get("id").and_then(Value::as_str).map(str::to_string)
}

/// Extracts the doctor registration number.
///
/// Prefers an identifier whose system URI carries a medical-council marker;
/// falls back to the first identifier's value. No identifiers at all is a
/// hard failure - a prescription without a registration is not dispensable.
fn extract_doctor_registration(practitioner: &Value) -> Result<String, FhirError> {
    let identifiers = practitioner
        .get("identifier")
        .and_then(Value::as_array)
        .ok_or(FhirError::RegistrationMissing)?;

    let council = identifiers.iter().find(|id| {
        id.get("system")
            .and_then(Value::as_str)
            .map(|s| s.contains("medical-council") || s.contains("mci") || s.contains("doctor"))
            .unwrap_or(false)
    });

    council
        .or_else(|| identifiers.first())
        .and_then(|id| id.get("value"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(FhirError::RegistrationMissing)
}

/// Flattens one MedicationRequest resource.
fn parse_medication_request(request: &Value) -> ParsedMedication {
    let concept = request.get("medicationCodeableConcept");

    let name = concept
        .and_then(|c| c.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            concept
                .and_then(|c| c.get("coding"))
                .and_then(Value::as_array)
                .and_then(|codings| codings.first())
                .and_then(|coding| coding.get("display"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| "Unknown Medication".to_string());

    let code = concept
        .and_then(|c| c.get("coding"))
        .and_then(Value::as_array)
        .and_then(|codings| codings.first())
        .and_then(|coding| coding.get("code"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let dosage_instruction = request
        .get("dosageInstruction")
        .and_then(Value::as_array)
        .and_then(|list| list.first());

    let instructions = dosage_instruction
        .and_then(|d| d.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let dosage = dosage_instruction
        .and_then(|d| d.get("doseAndRate"))
        .and_then(Value::as_array)
        .and_then(|list| list.first())
        .and_then(|dr| dr.get("doseQuantity"))
        .and_then(|dose| {
            let value = dose.get("value").map(render_number)?;
            let unit = dose.get("unit").and_then(Value::as_str).unwrap_or("");
            Some(format!("{value} {unit}").trim().to_string())
        });

    let dispense = request.get("dispenseRequest");

    let quantity = dispense
        .and_then(|d| d.get("quantity"))
        .and_then(|q| q.get("value"))
        .and_then(value_as_i64);

    let duration = dispense
        .and_then(|d| d.get("expectedSupplyDuration"))
        .and_then(|q| q.get("value"))
        .and_then(value_as_i64);

    ParsedMedication {
        name,
        code,
        dosage,
        quantity,
        duration,
        instructions,
    }
}

/// Accepts integers and JSON floats (FHIR quantities are often `21.0`).
fn value_as_i64(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.round() as i64))
}

/// Renders a JSON number without a trailing `.0` for whole values.
fn render_number(value: &Value) -> String {
    if let Some(i) = value.as_i64() {
        return i.to_string();
    }
    if let Some(f) = value.as_f64() {
        if f.fract() == 0.0 {
            return format!("{}", f as i64);
        }
        return f.to_string();
    }
    value.to_string()
}

/// Parses `authoredOn`: full RFC 3339 timestamps and bare dates both occur
/// in the wild.
fn parse_fhir_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// =============================================================================
// Unit Tests
// =============================================================================
