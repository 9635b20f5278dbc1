//! # Engine Error Types
//!
//! The client-facing error taxonomy. Core and database errors funnel into
//! [`EngineError`]; an HTTP adapter only needs [`EngineError::kind`] to pick
//! a status code.
//!
//! ## Taxonomy
//! ```text
//! Validation         → 400  malformed input, caller can correct and retry
//! EmptySale          → 400
//! BatchMismatch      → 400
//! Compliance         → 400  rule violated; the sale must not be created
//! InsufficientStock  → 400  names the batch or medicine that fell short
//! MalformedBundle    → 400  FHIR parse precondition failed
//! NotFound           → 404
//! Internal           → 500  details logged, message kept generic
//! ```

use thiserror::Error;

use dava_core::{CoreError, FhirError, ValidationError};
use dava_db::DbError;

// =============================================================================
// Engine Error
// =============================================================================

/// Errors surfaced by the dispensing services.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input; recoverable by resubmitting corrected input.
    #[error("{0}")]
    Validation(String),

    /// Referenced Medicine, Batch, Prescription or Sale does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A compliance rule failed; the sale must not be created.
    #[error("Compliance violation: {}", .errors.join("; "))]
    Compliance { errors: Vec<String> },

    /// Requested quantity exceeds available stock.
    #[error("Insufficient stock for {reference}: available {available}, requested {requested}")]
    InsufficientStock {
        reference: String,
        available: i64,
        requested: i64,
    },

    /// FHIR bundle failed a parse precondition.
    #[error("Malformed FHIR bundle: {0}")]
    MalformedBundle(#[from] FhirError),

    /// A sale was submitted with no line items.
    #[error("Sale must have at least one item")]
    EmptySale,

    /// The requested batch does not belong to the requested medicine.
    #[error("Batch {batch_id} does not belong to medicine {medicine_id}")]
    BatchMismatch {
        batch_id: String,
        medicine_id: String,
    },

    /// Unexpected persistence or configuration fault. The display message
    /// stays generic; the source carries the detail for logs.
    #[error("Internal failure")]
    Internal(#[source] DbError),
}

/// Coarse classification for transport adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 400-equivalent.
    BadRequest,
    /// 404-equivalent.
    NotFound,
    /// 500-equivalent.
    Internal,
}

impl EngineError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Maps this error onto the transport-level classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_)
            | EngineError::Compliance { .. }
            | EngineError::InsufficientStock { .. }
            | EngineError::MalformedBundle(_)
            | EngineError::EmptySale
            | EngineError::BatchMismatch { .. } => ErrorKind::BadRequest,
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::Internal(_) => ErrorKind::Internal,
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Validation(err.to_string())
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EmptySale => EngineError::EmptySale,
            CoreError::BatchMismatch {
                batch_id,
                medicine_id,
            } => EngineError::BatchMismatch {
                batch_id,
                medicine_id,
            },
            CoreError::InsufficientStock {
                reference,
                available,
                requested,
            } => EngineError::InsufficientStock {
                reference,
                available,
                requested,
            },
            CoreError::Validation(v) => EngineError::Validation(v.to_string()),
        }
    }
}

/// Business-relevant database failures keep their meaning; everything else
/// becomes a generic internal failure.
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            DbError::InsufficientStock {
                reference,
                available,
                requested,
            } => EngineError::InsufficientStock {
                reference,
                available,
                requested,
            },
            other => EngineError::Internal(other),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(EngineError::EmptySale.kind(), ErrorKind::BadRequest);
        assert_eq!(
            EngineError::not_found("Medicine", "m-1").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            EngineError::Internal(DbError::PoolExhausted).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_compliance_message_joins_errors() {
        let err = EngineError::Compliance {
            errors: vec!["first rule".to_string(), "second rule".to_string()],
        };
        assert_eq!(err.to_string(), "Compliance violation: first rule; second rule");
    }

    #[test]
    fn test_internal_display_is_generic() {
        let err = EngineError::Internal(DbError::QueryFailed("secret table detail".into()));
        assert_eq!(err.to_string(), "Internal failure");
    }

    #[test]
    fn test_db_error_mapping() {
        let err: EngineError = DbError::not_found("Batch", "b-1").into();
        assert!(matches!(err, EngineError::NotFound { .. }));

        let err: EngineError = DbError::PoolExhausted.into();
        assert!(matches!(err, EngineError::Internal(_)));
    }
}
