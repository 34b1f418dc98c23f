//! Audit sink writing to the `audit_logs` table.

use sqlx::PgPool;

use crate::ports::{AuditEntry, AuditLog};

/// Writes each entry on a background task.
///
/// Failures are logged and dropped; the audited operation never waits on
/// or observes the insert.
#[derive(Clone)]
pub struct PostgresAuditLog {
    pool: PgPool,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert(pool: &PgPool, entry: &AuditEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (action, entity_type, entity_id, actor, payload, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(entry.action.as_str())
    .bind(entry.entity_type)
    .bind(&entry.entity_id)
    .bind(entry.actor.as_ref().map(|a| a.as_str()))
    .bind(&entry.payload)
    .bind(entry.recorded_at.as_datetime())
    .execute(pool)
    .await?;
    Ok(())
}

impl AuditLog for PostgresAuditLog {
    fn record(&self, entry: AuditEntry) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(
                    entity_type = entry.entity_type,
                    entity_id = %entry.entity_id,
                    "No async runtime, audit entry dropped"
                );
                return;
            }
        };

        let pool = self.pool.clone();
        handle.spawn(async move {
            if let Err(e) = insert(&pool, &entry).await {
                tracing::warn!(
                    error = %e,
                    action = %entry.action,
                    entity_type = entry.entity_type,
                    entity_id = %entry.entity_id,
                    "Failed to write audit entry"
                );
            }
        });
    }
}
