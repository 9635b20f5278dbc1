//! # FIFO Stock Allocation
//!
//! Pure planning for FIFO-by-expiry stock depletion: given batches already
//! ordered soonest-to-expire first, decide how much to take from each.
//!
//! ## Why FIFO-by-expiry?
//! Consuming soonest-to-expire stock first minimizes wastage from expired
//! lots. Ordering and expiry filtering happen at the query layer; this
//! module only walks the ordered list.
//!
//! ## All-or-nothing
//! If total available stock is less than requested, planning fails up front
//! with `InsufficientStock` - there is no partial-allocation result. The
//! executor in dava-db applies a plan inside a single transaction, so a plan
//! either lands completely or not at all.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::Batch;

// =============================================================================
// Allocation Plan
// =============================================================================

/// One slice of an allocation plan: take `quantity` units from `batch_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchAllocation {
    pub batch_id: String,
    pub quantity: i64,
}

/// Sums the on-hand quantity across batches.
pub fn total_available(batches: &[Batch]) -> i64 {
    batches.iter().map(|b| b.quantity).sum()
}

/// Plans a FIFO allocation of `requested` units across `batches`.
///
/// ## Preconditions
/// * `batches` is ordered ascending by expiry date and contains only active,
///   unexpired batches (the stock query guarantees this)
/// * `reference` names the medicine for error messages
///
/// ## Algorithm
/// Walk the list; from each batch take `min(batch.quantity, still_needed)`
/// until nothing is needed. Empty batches are skipped, not recorded.
///
/// ## Errors
/// * `Validation` if `requested` is not positive
/// * `InsufficientStock` if the total on hand is less than `requested`;
///   checked before planning so callers never see a partial plan
pub fn plan_fifo(
    reference: &str,
    batches: &[Batch],
    requested: i64,
) -> CoreResult<Vec<BatchAllocation>> {
    if requested <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into());
    }

    let available = total_available(batches);
    if available < requested {
        return Err(CoreError::InsufficientStock {
            reference: reference.to_string(),
            available,
            requested,
        });
    }

    let mut allocations = Vec::new();
    let mut still_needed = requested;

    for batch in batches {
        if still_needed == 0 {
            break;
        }
        let take = batch.quantity.min(still_needed);
        if take == 0 {
            continue;
        }
        allocations.push(BatchAllocation {
            batch_id: batch.id.clone(),
            quantity: take,
        });
        still_needed -= take;
    }

    Ok(allocations)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn batch(id: &str, expiry: (i32, u32, u32), quantity: i64) -> Batch {
        Batch {
            id: id.to_string(),
            medicine_id: "med-1".to_string(),
            batch_number: format!("BN-{id}"),
            manufacture_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            expiry_date: NaiveDate::from_ymd_opt(expiry.0, expiry.1, expiry.2).unwrap(),
            quantity,
            mrp_paise: 10000,
            cost_price_paise: 7000,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_fifo_spans_batches() {
        // Soonest-to-expire first: 10 units then 20 units
        let batches = vec![batch("b1", (2025, 1, 1), 10), batch("b2", (2025, 6, 1), 20)];

        let plan = plan_fifo("Paracetamol", &batches, 15).unwrap();

        assert_eq!(
            plan,
            vec![
                BatchAllocation { batch_id: "b1".into(), quantity: 10 },
                BatchAllocation { batch_id: "b2".into(), quantity: 5 },
            ]
        );
    }

    #[test]
    fn test_single_batch_satisfies() {
        let batches = vec![batch("b1", (2025, 1, 1), 10), batch("b2", (2025, 6, 1), 20)];
        let plan = plan_fifo("Paracetamol", &batches, 7).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].batch_id, "b1");
        assert_eq!(plan[0].quantity, 7);
    }

    #[test]
    fn test_exact_exhaustion() {
        let batches = vec![batch("b1", (2025, 1, 1), 10), batch("b2", (2025, 6, 1), 20)];
        let plan = plan_fifo("Paracetamol", &batches, 30).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[1].quantity, 20);
    }

    #[test]
    fn test_insufficient_stock_fails_without_plan() {
        let batches = vec![batch("b1", (2025, 1, 1), 10), batch("b2", (2025, 6, 1), 20)];
        let err = plan_fifo("Paracetamol", &batches, 31).unwrap_err();
        match err {
            CoreError::InsufficientStock { reference, available, requested } => {
                assert_eq!(reference, "Paracetamol");
                assert_eq!(available, 30);
                assert_eq!(requested, 31);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_batches_skipped() {
        let batches = vec![
            batch("b1", (2025, 1, 1), 0),
            batch("b2", (2025, 2, 1), 5),
            batch("b3", (2025, 6, 1), 5),
        ];
        let plan = plan_fifo("Paracetamol", &batches, 8).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].batch_id, "b2");
        assert_eq!(plan[1].batch_id, "b3");
        assert_eq!(plan[1].quantity, 3);
    }

    #[test]
    fn test_non_positive_request_rejected() {
        let batches = vec![batch("b1", (2025, 1, 1), 10)];
        assert!(plan_fifo("Paracetamol", &batches, 0).is_err());
        assert!(plan_fifo("Paracetamol", &batches, -5).is_err());
    }
}
