//! Process-local order and invoice numbering.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{format_invoice_number, format_order_number, NumberGenerator};

/// Per-day and per-month counters kept in memory.
///
/// Unique within one process. Pair with storage-level unique constraints
/// and the checkout retry when several processes issue numbers.
#[derive(Default)]
pub struct SequentialNumberGenerator {
    counters: Mutex<HashMap<String, u64>>,
}

impl SequentialNumberGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self, period: String) -> Result<u64, DomainError> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "number counter lock poisoned"))?;
        let counter = counters.entry(period).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}

#[async_trait]
impl NumberGenerator for SequentialNumberGenerator {
    async fn next_order_number(&self, at: Timestamp) -> Result<String, DomainError> {
        let seq = self.next(format!("order-{}", at.day_stamp()))?;
        Ok(format_order_number(at, seq))
    }

    async fn next_invoice_number(&self, at: Timestamp) -> Result<String, DomainError> {
        let seq = self.next(format!("invoice-{}", at.month_stamp()))?;
        Ok(format_invoice_number(at, seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn order_numbers_increase_within_a_day() {
        let gen = SequentialNumberGenerator::new();
        let now = Timestamp::now();
        let a = gen.next_order_number(now).await.unwrap();
        let b = gen.next_order_number(now).await.unwrap();
        assert!(a.ends_with("00001"));
        assert!(b.ends_with("00002"));
        assert_eq!(a.len(), 13);
    }

    #[tokio::test]
    async fn invoice_and_order_sequences_are_independent() {
        let gen = SequentialNumberGenerator::new();
        let now = Timestamp::now();
        gen.next_order_number(now).await.unwrap();
        let inv = gen.next_invoice_number(now).await.unwrap();
        assert!(inv.starts_with("INV-"));
        assert!(inv.ends_with("000001"));
    }
}
