//! Order and invoice numbering backed by `document_sequences`.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{format_invoice_number, format_order_number, NumberGenerator};

use super::db_error;

const ORDER_SEQUENCE: &str = "order";
const INVOICE_SEQUENCE: &str = "invoice";

/// Issues numbers from one counter row per kind and period.
///
/// The upsert is atomic, so numbers stay unique across processes sharing
/// the database. A skipped number is possible when the surrounding write
/// fails; a duplicate is not.
pub struct PostgresNumberGenerator {
    pool: PgPool,
}

impl PostgresNumberGenerator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn next(&self, kind: &str, period: String) -> Result<u64, DomainError> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO document_sequences (kind, period, last_value)
            VALUES ($1, $2, 1)
            ON CONFLICT (kind, period)
            DO UPDATE SET last_value = document_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(kind)
        .bind(period)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("advance document sequence", e))?;

        u64::try_from(value)
            .map_err(|_| DomainError::database(format!("{} sequence went negative", kind)))
    }
}

#[async_trait]
impl NumberGenerator for PostgresNumberGenerator {
    async fn next_order_number(&self, at: Timestamp) -> Result<String, DomainError> {
        let seq = self.next(ORDER_SEQUENCE, at.day_stamp()).await?;
        Ok(format_order_number(at, seq))
    }

    async fn next_invoice_number(&self, at: Timestamp) -> Result<String, DomainError> {
        let seq = self.next(INVOICE_SEQUENCE, at.month_stamp()).await?;
        Ok(format_invoice_number(at, seq))
    }
}
