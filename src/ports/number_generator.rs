//! Human-facing document number generation.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};

/// Issues order and invoice numbers.
///
/// Numbers need only be unique with high probability; storage enforces
/// uniqueness and callers retry on `Conflict`.
#[async_trait]
pub trait NumberGenerator: Send + Sync {
    /// `YYYYMMDD` followed by a five digit daily sequence.
    async fn next_order_number(&self, at: Timestamp) -> Result<String, DomainError>;

    /// `INV-YYYYMM` followed by a six digit monthly sequence.
    async fn next_invoice_number(&self, at: Timestamp) -> Result<String, DomainError>;
}

/// Formats an order number from its day and sequence.
pub fn format_order_number(at: Timestamp, sequence: u64) -> String {
    format!("{}{:05}", at.day_stamp(), sequence)
}

/// Formats an invoice number from its month and sequence.
pub fn format_invoice_number(at: Timestamp, sequence: u64) -> String {
    format!("INV-{}{:06}", at.month_stamp(), sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn at() -> Timestamp {
        Timestamp::from_datetime(
            DateTime::parse_from_rfc3339("2024-07-04T18:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        )
    }

    #[test]
    fn order_numbers_pad_to_five_digits() {
        assert_eq!(format_order_number(at(), 7), "2024070400007");
    }

    #[test]
    fn invoice_numbers_pad_to_six_digits() {
        assert_eq!(format_invoice_number(at(), 42), "INV-202407000042");
    }
}
