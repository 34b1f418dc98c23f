//! Order repository port.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::foundation::{DomainError, FeatureId, OrderId, UserId};
use crate::domain::ordering::{Order, OrderStatus};

/// Quota to consume alongside an order insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaConsumption {
    pub feature_id: FeatureId,
    pub amount: Decimal,
}

/// Listing filter for admin views.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub user_id: Option<UserId>,
    pub limit: Option<u32>,
}

/// Order counts for dashboards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrderStats {
    pub total: u64,
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl OrderStats {
    pub fn count(&mut self, status: OrderStatus) {
        self.add(status, 1);
    }

    /// Adds `n` orders in `status`, as returned by a grouped count.
    pub fn add(&mut self, status: OrderStatus, n: u64) {
        self.total += n;
        let bucket = match status {
            OrderStatus::Pending => &mut self.pending,
            OrderStatus::Processing => &mut self.processing,
            OrderStatus::Completed => &mut self.completed,
            OrderStatus::Failed => &mut self.failed,
            OrderStatus::Cancelled => &mut self.cancelled,
        };
        *bucket += n;
    }
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts the order and consumes quota for the order's user in one
    /// atomic unit.
    ///
    /// Each consumption is re-checked under a per-`(user, feature)` lock;
    /// features without a quota row are skipped.
    ///
    /// # Errors
    ///
    /// - `LimitExceeded` if any enforced row would overflow; nothing is
    ///   written
    /// - `Conflict` if the order number is taken; nothing is written
    async fn create_with_consumption(
        &self,
        order: &Order,
        consumption: &[QuotaConsumption],
    ) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError>;

    /// Persists a status change.
    async fn update_status(&self, order: &Order) -> Result<(), DomainError>;

    /// Newest first.
    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, DomainError>;

    async fn stats(&self) -> Result<OrderStats, DomainError>;
}
