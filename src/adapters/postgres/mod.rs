//! PostgreSQL adapters - persistent implementations of the storage ports.
//!
//! - `PostgresSalesStore` - every repository port over one connection pool
//! - `PostgresNumberGenerator` - order and invoice numbers from counter rows
//! - `PostgresAuditLog` - background writes into `audit_logs`
//!
//! Writes that touch more than one table run in a single transaction.
//! Quota rows are locked with `SELECT ... FOR UPDATE` under a bounded
//! `lock_timeout`, so contended checkouts fail fast instead of queueing.

mod audit_log;
mod catalog;
mod ledger;
mod numbering;
mod payments;

pub use audit_log::PostgresAuditLog;
pub use numbering::PostgresNumberGenerator;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use std::fmt::Display;
use std::str::FromStr;

use crate::domain::foundation::{DomainError, ErrorCode, Money, Timestamp, UserId};

const UNIQUE_VIOLATION: &str = "23505";
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Lock wait applied when none is configured.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

/// PostgreSQL implementation of all storage ports.
///
/// Uses sqlx for database operations with connection pooling.
#[derive(Clone)]
pub struct PostgresSalesStore {
    pool: PgPool,
    lock_timeout_ms: u64,
}

impl PostgresSalesStore {
    /// Creates a store over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    /// Bounds how long a transaction waits for a locked quota row.
    pub fn with_lock_timeout(mut self, lock_timeout_ms: u64) -> Self {
        self.lock_timeout_ms = lock_timeout_ms.max(1);
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;
        // SET LOCAL takes no bind parameters; the value is a plain integer.
        sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout_ms))
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("set lock timeout", e))?;
        Ok(tx)
    }
}

async fn commit(tx: Transaction<'static, Postgres>) -> Result<(), DomainError> {
    tx.commit().await.map_err(|e| db_error("commit transaction", e))
}

/// Maps a driver error to a database error, calling out lock timeouts.
fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some(LOCK_NOT_AVAILABLE) {
            return DomainError::database(format!("Failed to {}: row is busy, retry", context))
                .with_detail("retryable", "true");
        }
    }
    DomainError::database(format!("Failed to {}: {}", context, e))
}

/// Like [`db_error`], but turns unique violations on known constraints
/// into conflicts. `conflict` receives the violated constraint name.
fn write_error(
    context: &str,
    e: sqlx::Error,
    conflict: impl FnOnce(&str) -> Option<String>,
) -> DomainError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            if let Some(message) = db_err.constraint().and_then(conflict) {
                return DomainError::conflict(message);
            }
        }
    }
    db_error(context, e)
}

fn not_found(code: ErrorCode, id: impl ToString) -> DomainError {
    let id = id.to_string();
    DomainError::new(code, format!("{} not found", id)).with_detail("id", id)
}

fn corrupt(column: &str, e: impl Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid {} value: {}", column, e),
    )
}

fn parse_column<T>(column: &str, raw: &str) -> Result<T, DomainError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse().map_err(|e| corrupt(column, e))
}

fn money(column: &str, amount: Decimal) -> Result<Money, DomainError> {
    Money::from_decimal(amount).map_err(|e| corrupt(column, e))
}

fn user_id(raw: String) -> Result<UserId, DomainError> {
    UserId::new(raw).map_err(|e| corrupt("user_id", e))
}

fn timestamp(dt: DateTime<Utc>) -> Timestamp {
    Timestamp::from_datetime(dt)
}

fn count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ordering::OrderStatus;

    #[test]
    fn parse_column_reads_stored_names() {
        let status: OrderStatus = parse_column("status", "completed").unwrap();
        assert_eq!(status, OrderStatus::Completed);
    }

    #[test]
    fn parse_column_reports_the_column() {
        let err = parse_column::<OrderStatus>("status", "shipped").unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(err.message.contains("status"));
    }

    #[test]
    fn money_keeps_two_places() {
        assert_eq!(money("amount", Decimal::new(11960, 2)).unwrap(), Money::from_cents(11960));
    }

    #[test]
    fn blank_user_id_is_corrupt() {
        assert!(user_id("  ".to_string()).is_err());
    }

    #[test]
    fn negative_counts_clamp_to_zero() {
        assert_eq!(count(-1), 0);
        assert_eq!(count(7), 7);
    }
}
