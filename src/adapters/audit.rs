//! Audit sinks that do not need a database.

use std::sync::Mutex;

use crate::ports::{AuditEntry, AuditLog};

/// Emits each entry as a structured `audit` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditLog;

impl AuditLog for TracingAuditLog {
    fn record(&self, entry: AuditEntry) {
        tracing::info!(
            target: "audit",
            action = %entry.action,
            entity_type = entry.entity_type,
            entity_id = %entry.entity_id,
            actor = entry.actor.as_ref().map(|a| a.as_str()).unwrap_or("system"),
            payload = %entry.payload,
            "audit"
        );
    }
}

/// Keeps entries in memory for assertions.
#[derive(Debug, Default)]
pub struct RecordingAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl RecordingAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl AuditLog for RecordingAuditLog {
    fn record(&self, entry: AuditEntry) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(_) => tracing::warn!("audit recorder lock poisoned, entry dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use crate::ports::AuditAction;

    #[test]
    fn recorder_keeps_entries_in_order() {
        let log = RecordingAuditLog::new();
        let admin = UserId::new("admin-1").unwrap();
        log.record(AuditEntry::new(AuditAction::Create, "Package", "p1", serde_json::json!({})).by(&admin));
        log.record(AuditEntry::new(AuditAction::Refund, "Payment", "pay1", serde_json::json!({})));
        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].actor.as_ref(), Some(&admin));
        assert_eq!(entries[1].action, AuditAction::Refund);
    }

    #[test]
    fn tracing_sink_never_panics() {
        TracingAuditLog.record(AuditEntry::new(
            AuditAction::Delete,
            "Feature",
            "f1",
            serde_json::json!({"reason": "retired"}),
        ));
    }
}
