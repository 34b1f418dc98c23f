//! Payment repository port.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::foundation::{DomainError, Money, OrderId, PaymentId, Timestamp};
use crate::domain::ordering::{Gateway, Order, Payment, PaymentStatus};

/// Listing filter for admin views.
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    pub gateway: Option<Gateway>,
    pub limit: Option<u32>,
}

/// Captured volume for one gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayTotals {
    pub gateway: Gateway,
    pub count: u64,
    pub total: Money,
}

/// Revenue and attempt counts for the payment dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaymentStats {
    pub today_revenue: Money,
    pub month_revenue: Money,
    pub total_revenue: Money,
    pub refunded_amount: Money,
    pub pending_count: u64,
    pub failed_count: u64,
    pub by_gateway: Vec<GatewayTotals>,
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Inserts or updates a payment. When `order` is given its status is
    /// written in the same atomic unit.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the transaction id belongs to another payment
    async fn save(&self, payment: &Payment, order: Option<&Order>) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError>;

    /// Finds a payment by gateway and either its transaction id or its
    /// reference id.
    async fn find_by_gateway_reference(
        &self,
        gateway: Gateway,
        reference: &str,
    ) -> Result<Option<Payment>, DomainError>;

    /// Oldest first.
    async fn list_for_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, DomainError>;

    /// Newest first.
    async fn list(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, DomainError>;

    /// Aggregates captured revenue relative to `now`.
    async fn stats(&self, now: Timestamp) -> Result<PaymentStats, DomainError>;
}
