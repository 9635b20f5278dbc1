//! # Audit Recorder
//!
//! Fire-and-forget audit trail for state-changing operations.
//!
//! ## Flow
//! ```text
//! BillingEngine / InventoryService / PrescriptionService
//!      │  AuditHandle::record(event)        (never blocks, never fails
//!      ▼                                     the triggering operation)
//! unbounded mpsc channel
//!      │
//!      ▼
//! background task ── AuditLogRepository::insert
//!                    (failures logged and swallowed)
//! ```
//!
//! The contract: a failure anywhere on the audit path must never fail or
//! roll back the business operation that emitted the event, and must never
//! block the response to the caller. Hence the channel hop and the
//! swallow-and-warn on the consumer side.

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use dava_core::AuditLogEntry;
use dava_db::repository::audit::generate_audit_id;
use dava_db::Database;

// =============================================================================
// Events
// =============================================================================

/// A state-changing operation worth recording.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub actor_id: Option<String>,
    /// Verb, e.g. "SALE_CREATED".
    pub action: String,
    /// Entity kind, e.g. "Sale".
    pub entity_type: String,
    pub entity_id: Option<String>,
    /// Free-form JSON detail payload.
    pub details: Option<serde_json::Value>,
    pub source_ip: Option<String>,
}

impl AuditEvent {
    /// Builds an event with the common fields; details and source address
    /// can be attached afterwards.
    pub fn new(
        actor_id: impl Into<String>,
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        AuditEvent {
            actor_id: Some(actor_id.into()),
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: Some(entity_id.into()),
            details: None,
            source_ip: None,
        }
    }

    /// Attaches a JSON detail payload.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

// =============================================================================
// Recorder
// =============================================================================

/// Spawns the background consumer; services talk to it through
/// [`AuditHandle`].
pub struct AuditRecorder;

/// Cheap-to-clone sender for audit events.
#[derive(Debug, Clone)]
pub struct AuditHandle {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

impl AuditRecorder {
    /// Spawns the consumer task and returns the handle services emit on.
    ///
    /// The task runs until every handle is dropped, then drains and exits.
    pub fn spawn(db: Database) -> AuditHandle {
        let (tx, mut rx) = mpsc::unbounded_channel::<AuditEvent>();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let entry = AuditLogEntry {
                    id: generate_audit_id(),
                    actor_id: event.actor_id,
                    action: event.action,
                    entity_type: event.entity_type,
                    entity_id: event.entity_id,
                    details: event.details.map(|d| d.to_string()),
                    source_ip: event.source_ip,
                    created_at: Utc::now(),
                };

                // Swallow failures: the triggering operation already
                // committed and responded.
                if let Err(err) = db.audit_logs().insert(&entry).await {
                    warn!(error = %err, action = %entry.action, "Audit write failed; entry dropped");
                }
            }
            debug!("Audit recorder stopped (all handles dropped)");
        });

        AuditHandle { tx }
    }
}

impl AuditHandle {
    /// Emits an event. Never blocks; if the recorder is gone the event is
    /// dropped with a warning.
    pub fn record(&self, event: AuditEvent) {
        if self.tx.send(event).is_err() {
            warn!("Audit recorder is gone; event dropped");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dava_db::{AuditFilter, DbConfig};
    use std::time::Duration;

    #[tokio::test]
    async fn test_events_reach_the_audit_trail() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let audit = AuditRecorder::spawn(db.clone());

        audit.record(
            AuditEvent::new("user-1", "SALE_CREATED", "Sale", "sale-1")
                .with_details(serde_json::json!({ "total_paise": 20160 })),
        );

        // Fire-and-forget: poll until the background task has written it.
        let mut entries = Vec::new();
        for _ in 0..100 {
            let (found, _) = db.audit_logs().query(&AuditFilter::default()).await.unwrap();
            if !found.is_empty() {
                entries = found;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "SALE_CREATED");
        assert_eq!(entries[0].entity_id.as_deref(), Some("sale-1"));
        assert!(entries[0].details.as_deref().unwrap().contains("20160"));
    }

    #[tokio::test]
    async fn test_record_never_fails_the_caller() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let audit = AuditRecorder::spawn(db);

        // record() has no Result to propagate; this is the whole contract.
        audit.record(AuditEvent::new("user-1", "NOOP", "Sale", "sale-1"));
    }
}
