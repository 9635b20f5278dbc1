//! # Error Types
//!
//! Domain-specific error types for dava-core.
//!
//! ## Error Hierarchy
//! ```text
//! dava-core errors (this file)
//! ├── CoreError        - Business rule violations
//! ├── ValidationError  - Input validation failures
//! └── FhirError        - FHIR bundle parse failures (fhir module)
//!
//! dava-db errors (separate crate)
//! └── DbError          - Database operation failures
//!
//! dava-engine errors (separate crate)
//! └── EngineError      - What callers of the services see
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (batch number, id, limits)
//! 3. Errors are enum variants, never String
//! 4. Every business failure is detected before any persistent mutation

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent business rule violations; the engine maps them onto the
/// client-facing taxonomy (400-equivalents).
#[derive(Debug, Error)]
pub enum CoreError {
    /// A sale was submitted with no line items.
    #[error("Sale must have at least one item")]
    EmptySale,

    /// The requested batch does not belong to the requested medicine.
    #[error("Batch {batch_id} does not belong to medicine {medicine_id}")]
    BatchMismatch {
        batch_id: String,
        medicine_id: String,
    },

    /// Requested quantity exceeds what the stock ledger can supply.
    ///
    /// `reference` names the batch or medicine being allocated from, so the
    /// message is actionable at the counter.
    #[error("Insufficient stock for {reference}: available {available}, requested {requested}")]
    InsufficientStock {
        reference: String,
        available: i64,
        requested: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements. Used for early
/// validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, HSN code, date ordering).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            reference: "batch AMX-2025-01".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for batch AMX-2025-01: available 3, requested 5"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "hsn_code".to_string(),
        };
        assert_eq!(err.to_string(), "hsn_code is required");

        let err = ValidationError::InvalidFormat {
            field: "expiry_date".to_string(),
            reason: "must be after manufacture date".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "expiry_date has invalid format: must be after manufacture date"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
