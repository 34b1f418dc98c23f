//! Audit sink port.
//!
//! Write-only and fire-and-forget: recording must never block or fail the
//! operation being audited.

use serde::Serialize;
use std::fmt;

use crate::domain::foundation::{Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Refund,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Refund => "REFUND",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub entity_type: &'static str,
    pub entity_id: String,
    pub actor: Option<UserId>,
    pub payload: serde_json::Value,
    pub recorded_at: Timestamp,
}

impl AuditEntry {
    pub fn new(
        action: AuditAction,
        entity_type: &'static str,
        entity_id: impl ToString,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            action,
            entity_type,
            entity_id: entity_id.to_string(),
            actor: None,
            payload,
            recorded_at: Timestamp::now(),
        }
    }

    pub fn by(mut self, actor: &UserId) -> Self {
        self.actor = Some(actor.clone());
        self
    }
}

pub trait AuditLog: Send + Sync {
    /// Records an entry. Implementations swallow and log their own errors.
    fn record(&self, entry: AuditEntry);
}
