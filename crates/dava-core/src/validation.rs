//! # Validation Module
//!
//! Input validation for the dispensing services.
//!
//! ## Validation Strategy
//! ```text
//! Layer 1: Caller (HTTP adapter, out of scope)
//! ├── Shape validation (deserialization)
//! Layer 2: THIS MODULE
//! ├── Business-format validation (HSN codes, date ordering, ranges)
//! Layer 3: Database (SQLite)
//! ├── NOT NULL / UNIQUE / CHECK(quantity >= 0) / foreign keys
//! ```
//! Defense in depth: each layer catches different mistakes.

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::{MAX_LINE_QUANTITY, MAX_SALE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a medicine, generic or manufacturer name: 2-200 characters.
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() < 2 {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min: 2,
        });
    }

    if value.len() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates an HSN tax classification code: 4-8 digits.
pub fn validate_hsn_code(hsn_code: &str) -> ValidationResult<()> {
    let hsn_code = hsn_code.trim();

    if hsn_code.is_empty() {
        return Err(ValidationError::Required {
            field: "hsn_code".to_string(),
        });
    }

    let digits_only = hsn_code.chars().all(|c| c.is_ascii_digit());
    if !digits_only || hsn_code.len() < 4 || hsn_code.len() > 8 {
        return Err(ValidationError::InvalidFormat {
            field: "hsn_code".to_string(),
            reason: "must be 4 to 8 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a batch number: non-empty, at most 50 characters, restricted to
/// alphanumerics, hyphens, underscores and slashes.
pub fn validate_batch_number(batch_number: &str) -> ValidationResult<()> {
    let batch_number = batch_number.trim();

    if batch_number.is_empty() {
        return Err(ValidationError::Required {
            field: "batch_number".to_string(),
        });
    }

    if batch_number.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "batch_number".to_string(),
            max: 50,
        });
    }

    if !batch_number
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '/')
    {
        return Err(ValidationError::InvalidFormat {
            field: "batch_number".to_string(),
            reason: "must contain only letters, numbers, hyphens, underscores and slashes"
                .to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a dispense quantity: positive and within the sanity cap.
///
/// Schedule-specific caps (Schedule X: 30) are the compliance module's job;
/// this is the absolute line-item ceiling.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in paise. Zero is not a sellable price.
pub fn validate_price_paise(field: &str, paise: i64) -> ValidationResult<()> {
    if paise <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a reorder level (zero disables the alert).
pub fn validate_reorder_level(level: i64) -> ValidationResult<()> {
    if level < 0 {
        return Err(ValidationError::OutOfRange {
            field: "reorder_level".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a discount in basis points: 0% to 100%.
pub fn validate_discount_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

/// Validates the number of line items on a sale.
pub fn validate_sale_size(item_count: usize) -> ValidationResult<()> {
    if item_count > MAX_SALE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_SALE_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Date Validators
// =============================================================================

/// Validates batch date ordering: a lot must expire after it was made.
pub fn validate_batch_dates(
    manufacture_date: NaiveDate,
    expiry_date: NaiveDate,
) -> ValidationResult<()> {
    if expiry_date <= manufacture_date {
        return Err(ValidationError::InvalidFormat {
            field: "expiry_date".to_string(),
            reason: "must be after manufacture date".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Paracetamol 500mg").is_ok());
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", "A").is_err());
        assert!(validate_name("name", &"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_hsn_code() {
        assert!(validate_hsn_code("3004").is_ok());
        assert!(validate_hsn_code("30049099").is_ok());

        assert!(validate_hsn_code("").is_err());
        assert!(validate_hsn_code("300").is_err());
        assert!(validate_hsn_code("300490991").is_err());
        assert!(validate_hsn_code("30A4").is_err());
    }

    #[test]
    fn test_validate_batch_number() {
        assert!(validate_batch_number("AMX-2025/001").is_ok());
        assert!(validate_batch_number("B123").is_ok());

        assert!(validate_batch_number("").is_err());
        assert!(validate_batch_number("has space").is_err());
        assert!(validate_batch_number(&"B".repeat(60)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_paise() {
        assert!(validate_price_paise("mrp", 10000).is_ok());
        assert!(validate_price_paise("mrp", 0).is_err());
        assert!(validate_price_paise("mrp", -100).is_err());
    }

    #[test]
    fn test_validate_discount_bps() {
        assert!(validate_discount_bps(0).is_ok());
        assert!(validate_discount_bps(1000).is_ok());
        assert!(validate_discount_bps(10_000).is_ok());
        assert!(validate_discount_bps(10_001).is_err());
    }

    #[test]
    fn test_validate_batch_dates() {
        let mfg = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let exp = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

        assert!(validate_batch_dates(mfg, exp).is_ok());
        assert!(validate_batch_dates(exp, mfg).is_err());
        // Same day is invalid too
        assert!(validate_batch_dates(mfg, mfg).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("id", "").is_err());
        assert!(validate_uuid("id", "not-a-uuid").is_err());
    }
}
