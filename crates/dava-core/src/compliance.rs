//! # Compliance Rules
//!
//! Drug-schedule dispensing constraints under the Drugs and Cosmetics Act,
//! 1940 and Rules, 1945, plus the GST rate lookup and doctor registration
//! format validation.
//!
//! ## Rule Table
//! ```text
//! Schedule │ Rx required │ Dr. verification │ Max qty/dispense │ Retention
//! ─────────┼─────────────┼──────────────────┼──────────────────┼──────────
//! OTC      │ no          │ no               │ -                │ 0 years
//! H        │ yes         │ yes              │ -                │ 1 year
//! H1       │ yes         │ yes              │ -                │ 2 years
//! X        │ yes         │ yes              │ 30 units         │ 2 years
//! ```
//!
//! `rule_for` is a pure lookup with no error path: `Schedule` is a closed
//! enum, so an unknown schedule cannot reach this module.

use chrono::{Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{Schedule, TaxRate};

// =============================================================================
// Rule Table
// =============================================================================

/// Dispensing constraints for one drug schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceRule {
    pub schedule: Schedule,
    pub requires_prescription: bool,
    pub requires_doctor_verification: bool,
    /// Hard cap per dispense, when the schedule imposes one (Schedule X:
    /// 30 units, one month's supply).
    pub max_quantity_per_dispense: Option<i64>,
    /// How long prescription records must be retained.
    pub retention_years: u8,
    /// Whether dispenses must land in the special register (audit trail).
    pub special_logging: bool,
}

/// Returns the compliance rule for a schedule. Pure lookup, no side effects.
pub const fn rule_for(schedule: Schedule) -> ComplianceRule {
    match schedule {
        Schedule::Otc => ComplianceRule {
            schedule: Schedule::Otc,
            requires_prescription: false,
            requires_doctor_verification: false,
            max_quantity_per_dispense: None,
            retention_years: 0,
            special_logging: false,
        },
        Schedule::H => ComplianceRule {
            schedule: Schedule::H,
            requires_prescription: true,
            requires_doctor_verification: true,
            max_quantity_per_dispense: None,
            retention_years: 1,
            special_logging: true,
        },
        Schedule::H1 => ComplianceRule {
            schedule: Schedule::H1,
            requires_prescription: true,
            requires_doctor_verification: true,
            max_quantity_per_dispense: None,
            retention_years: 2,
            special_logging: true,
        },
        Schedule::X => ComplianceRule {
            schedule: Schedule::X,
            requires_prescription: true,
            requires_doctor_verification: true,
            max_quantity_per_dispense: Some(30),
            retention_years: 2,
            special_logging: true,
        },
    }
}

// =============================================================================
// Dispense Validation
// =============================================================================

/// Outcome of a dispense compliance check.
///
/// `allowed` is true exactly when `errors` is empty. Warnings are
/// informational (documentation/warning-label reminders) and never block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispenseCheck {
    pub allowed: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Checks whether a medicine can be dispensed.
///
/// ## Arguments
/// * `schedule` - the medicine's drug schedule
/// * `has_prescription` - a prescription accompanies the sale
/// * `doctor_verified` - the prescription's doctor registration checked out
/// * `quantity` - units being dispensed
pub fn validate_dispense(
    schedule: Schedule,
    has_prescription: bool,
    doctor_verified: bool,
    quantity: i64,
) -> DispenseCheck {
    let rule = rule_for(schedule);
    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    if rule.requires_prescription && !has_prescription {
        errors.push(format!("{schedule} medicines require a valid prescription"));
    }

    if rule.requires_doctor_verification && !doctor_verified {
        errors.push("Doctor verification is required for this medicine".to_string());
    }

    if let Some(max) = rule.max_quantity_per_dispense {
        if quantity > max {
            errors.push(format!(
                "Maximum quantity per dispense is {max} units for {schedule} medicines"
            ));
        }
    }

    // Informational reminders for the stricter schedules, emitted regardless
    // of whether the dispense is allowed.
    if schedule == Schedule::X {
        warnings.push("Schedule X medicine - Ensure proper documentation and retention".to_string());
    }
    if schedule == Schedule::H1 {
        warnings
            .push("Schedule H1 medicine - Additional warnings must be provided to patient".to_string());
    }

    DispenseCheck {
        allowed: errors.is_empty(),
        warnings,
        errors,
    }
}

// =============================================================================
// Doctor Registration Formats
// =============================================================================

/// Indian medical council whose registration format matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Council {
    /// National Medical Commission (formerly MCI): `XX/12345`
    NationalMedical,
    /// State Medical Council: `XX-XXX-12345`
    StateMedical,
    /// AYUSH practitioners: `AYUSH-XX-12345`
    Ayush,
    /// Dental Council: `XX-DC-12345`
    Dental,
}

impl Council {
    pub fn name(&self) -> &'static str {
        match self {
            Council::NationalMedical => "Medical Council of India",
            Council::StateMedical => "State Medical Council",
            Council::Ayush => "AYUSH Council",
            Council::Dental => "Dental Council",
        }
    }
}

static MCI_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2}/\d{4,6}$").unwrap());
static STATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}-[A-Z]{3}-\d{4,6}$").unwrap());
static AYUSH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^AYUSH-[A-Z]{2}-\d{4,6}$").unwrap());
static DENTAL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}-DC-\d{4,6}$").unwrap());

/// Result of a doctor registration format check.
///
/// Format-only: this does not call any external registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationCheck {
    pub council: Option<Council>,
    pub error: Option<String>,
}

impl RegistrationCheck {
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.council.is_some()
    }
}

/// Validates a doctor registration number against the four council formats.
///
/// The patterns are mutually exclusive; first match wins. No match yields an
/// error listing every expected format.
pub fn validate_doctor_registration(registration: &str) -> RegistrationCheck {
    let trimmed = registration.trim().to_uppercase();

    if trimmed.is_empty() {
        return RegistrationCheck {
            council: None,
            error: Some("Registration number is required".to_string()),
        };
    }

    let council = if MCI_PATTERN.is_match(&trimmed) {
        Some(Council::NationalMedical)
    } else if STATE_PATTERN.is_match(&trimmed) {
        Some(Council::StateMedical)
    } else if AYUSH_PATTERN.is_match(&trimmed) {
        Some(Council::Ayush)
    } else if DENTAL_PATTERN.is_match(&trimmed) {
        Some(Council::Dental)
    } else {
        None
    };

    match council {
        Some(c) => RegistrationCheck {
            council: Some(c),
            error: None,
        },
        None => RegistrationCheck {
            council: None,
            error: Some(
                "Invalid registration number format. Expected formats: \
                 MCI (XX/12345), State (XX-XXX-12345), AYUSH (AYUSH-XX-12345), \
                 Dental (XX-DC-12345)"
                    .to_string(),
            ),
        },
    }
}

// =============================================================================
// GST Rates
// =============================================================================

/// General GST rate on medicines (most of the formulary).
pub const GST_MEDICINES_GENERAL: TaxRate = TaxRate::from_bps(1200);

/// Reduced rate for specified life-saving medicines.
pub const GST_MEDICINES_LIFESAVING: TaxRate = TaxRate::from_bps(500);

/// Exempt medicines (very few).
pub const GST_MEDICINES_EXEMPT: TaxRate = TaxRate::from_bps(0);

/// Returns the GST rate for an HSN code.
///
/// HSN chapters 3003 and 3004 are medicaments; both carry the general rate,
/// as does everything else stocked today. The lookup stays prefix-based so
/// differentiated rates (life-saving list, exemptions) can slot in without
/// touching callers.
pub fn gst_rate_for_hsn(hsn_code: &str) -> TaxRate {
    if hsn_code.starts_with("3003") || hsn_code.starts_with("3004") {
        return GST_MEDICINES_GENERAL;
    }
    GST_MEDICINES_GENERAL
}

// =============================================================================
// Prescription Validity
// =============================================================================

/// How long a prescription stays dispensable, per schedule. OTC needs none.
pub const fn prescription_validity_days(schedule: Schedule) -> Option<u64> {
    match schedule {
        Schedule::Otc => None,
        Schedule::H | Schedule::H1 => Some(30),
        // Narcotics: one week only.
        Schedule::X => Some(7),
    }
}

/// Checks whether a prescription issued on `prescription_date` is still
/// valid for dispensing `schedule` medicines on `today`.
pub fn is_prescription_valid(
    prescription_date: NaiveDate,
    schedule: Schedule,
    today: NaiveDate,
) -> bool {
    match prescription_validity_days(schedule) {
        None => true,
        Some(days) => match prescription_date.checked_add_days(Days::new(days)) {
            Some(last_valid) => today <= last_valid,
            None => false,
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_table() {
        assert!(!rule_for(Schedule::Otc).requires_prescription);
        assert!(rule_for(Schedule::H).requires_prescription);
        assert!(rule_for(Schedule::H1).special_logging);
        assert_eq!(rule_for(Schedule::X).max_quantity_per_dispense, Some(30));
        assert_eq!(rule_for(Schedule::H1).retention_years, 2);
    }

    #[test]
    fn test_otc_always_allowed() {
        // No prescription, no verification - still fine for OTC
        let check = validate_dispense(Schedule::Otc, false, false, 100);
        assert!(check.allowed);
        assert!(check.errors.is_empty());
        assert!(check.warnings.is_empty());
    }

    #[test]
    fn test_scheduled_medicines_need_prescription() {
        for schedule in [Schedule::H, Schedule::H1, Schedule::X] {
            let check = validate_dispense(schedule, false, false, 1);
            assert!(!check.allowed, "{schedule} without prescription must fail");
            assert!(check
                .errors
                .iter()
                .any(|e| e.contains("require a valid prescription")));
        }
    }

    #[test]
    fn test_doctor_verification_required() {
        let check = validate_dispense(Schedule::H, true, false, 1);
        assert!(!check.allowed);
        assert_eq!(check.errors.len(), 1);
        assert!(check.errors[0].contains("Doctor verification"));
    }

    #[test]
    fn test_schedule_x_quantity_cap() {
        // 30 units with a verified prescription: allowed
        let check = validate_dispense(Schedule::X, true, true, 30);
        assert!(check.allowed);

        // 31 units: rejected, citing the limit
        let check = validate_dispense(Schedule::X, true, true, 31);
        assert!(!check.allowed);
        assert!(check.errors.iter().any(|e| e.contains("30 units")));
    }

    #[test]
    fn test_warnings_emitted_even_when_allowed() {
        let check = validate_dispense(Schedule::X, true, true, 10);
        assert!(check.allowed);
        assert_eq!(check.warnings.len(), 1);
        assert!(check.warnings[0].contains("Schedule X"));

        let check = validate_dispense(Schedule::H1, true, true, 10);
        assert!(check.allowed);
        assert!(check.warnings[0].contains("Schedule H1"));

        // ...and also when rejected
        let check = validate_dispense(Schedule::X, false, false, 50);
        assert!(!check.allowed);
        assert!(!check.warnings.is_empty());
    }

    #[test]
    fn test_registration_formats() {
        let check = validate_doctor_registration("MH/12345");
        assert!(check.is_valid());
        assert_eq!(check.council, Some(Council::NationalMedical));

        let check = validate_doctor_registration("MH-MMC-12345");
        assert_eq!(check.council, Some(Council::StateMedical));

        let check = validate_doctor_registration("AYUSH-KA-4567");
        assert_eq!(check.council, Some(Council::Ayush));

        let check = validate_doctor_registration("TN-DC-99999");
        assert_eq!(check.council, Some(Council::Dental));
    }

    #[test]
    fn test_registration_is_case_insensitive_and_trimmed() {
        let check = validate_doctor_registration("  mh/12345 ");
        assert!(check.is_valid());
    }

    #[test]
    fn test_invalid_registration_lists_formats() {
        let check = validate_doctor_registration("XX-YY-1234");
        assert!(!check.is_valid());
        let err = check.error.unwrap();
        assert!(err.contains("XX/12345"));
        assert!(err.contains("AYUSH-XX-12345"));
        assert!(err.contains("XX-DC-12345"));
    }

    #[test]
    fn test_empty_registration() {
        let check = validate_doctor_registration("   ");
        assert!(!check.is_valid());
        assert_eq!(check.error.unwrap(), "Registration number is required");
    }

    #[test]
    fn test_gst_rate_for_hsn() {
        assert_eq!(gst_rate_for_hsn("30049099").bps(), 1200);
        assert_eq!(gst_rate_for_hsn("30039011").bps(), 1200);
        // Unrecognized prefixes fall back to the general rate
        assert_eq!(gst_rate_for_hsn("90189099").bps(), 1200);
    }

    #[test]
    fn test_prescription_validity() {
        let issued = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();

        // OTC never needs a prescription
        let far_future = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        assert!(is_prescription_valid(issued, Schedule::Otc, far_future));

        // Schedule H: 30 days
        let day_30 = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let day_31 = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        assert!(is_prescription_valid(issued, Schedule::H, day_30));
        assert!(!is_prescription_valid(issued, Schedule::H, day_31));

        // Schedule X: 7 days
        let day_7 = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
        let day_8 = NaiveDate::from_ymd_opt(2025, 1, 9).unwrap();
        assert!(is_prescription_valid(issued, Schedule::X, day_7));
        assert!(!is_prescription_valid(issued, Schedule::X, day_8));
    }
}
