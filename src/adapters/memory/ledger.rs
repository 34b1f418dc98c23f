//! Quota ledger and order ports over the in-memory tables.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::customization::CustomizationLimit;
use crate::domain::foundation::{DomainError, ErrorCode, FeatureId, LimitId, OrderId, UserId};
use crate::domain::ordering::Order;
use crate::ports::{LimitRepository, OrderFilter, OrderRepository, OrderStats, QuotaConsumption};

use super::{not_found, InMemorySalesStore, Tables};

impl Tables {
    /// Overwrites a stored order's status unless it moved on meanwhile.
    pub(super) fn write_order_status(&mut self, order: &Order) -> Result<(), DomainError> {
        let existing = self
            .orders
            .get_mut(&order.id)
            .filter(|o| o.deleted_at.is_none())
            .ok_or_else(|| not_found(ErrorCode::OrderNotFound, order.id))?;
        order.ensure_replaces(existing.status)?;
        existing.status = order.status;
        existing.updated_at = order.updated_at;
        Ok(())
    }

    fn limit_for_mut(&mut self, user_id: &UserId, feature_id: &FeatureId) -> Option<&mut CustomizationLimit> {
        self.limits
            .values_mut()
            .find(|l| &l.user_id == user_id && &l.feature_id == feature_id)
    }
}

#[async_trait]
impl LimitRepository for InMemorySalesStore {
    async fn get_limit(
        &self,
        user_id: &UserId,
        feature_id: &FeatureId,
    ) -> Result<Option<CustomizationLimit>, DomainError> {
        let tables = self.tables()?;
        Ok(tables
            .limits
            .values()
            .find(|l| &l.user_id == user_id && &l.feature_id == feature_id)
            .cloned())
    }

    async fn find_by_id(&self, id: &LimitId) -> Result<Option<CustomizationLimit>, DomainError> {
        Ok(self.tables()?.limits.get(id).cloned())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<CustomizationLimit>, DomainError> {
        let tables = self.tables()?;
        let mut limits: Vec<_> = tables
            .limits
            .values()
            .filter(|l| &l.user_id == user_id)
            .cloned()
            .collect();
        limits.sort_by_key(|l| l.created_at);
        Ok(limits)
    }

    async fn upsert_limit(&self, limit: &CustomizationLimit) -> Result<CustomizationLimit, DomainError> {
        let mut tables = self.tables()?;
        if let Some(existing) = tables.limit_for_mut(&limit.user_id, &limit.feature_id) {
            existing.reconfigure(limit.max_value, limit.is_enforced)?;
            return Ok(existing.clone());
        }
        tables.limits.insert(limit.id, limit.clone());
        Ok(limit.clone())
    }

    async fn delete_limit(&self, id: &LimitId) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        tables
            .limits
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(ErrorCode::LimitNotFound, id))
    }

    async fn increment_usage(
        &self,
        user_id: &UserId,
        feature_id: &FeatureId,
        amount: Decimal,
    ) -> Result<Option<CustomizationLimit>, DomainError> {
        let mut tables = self.tables()?;
        match tables.limit_for_mut(user_id, feature_id) {
            Some(limit) => {
                limit.consume(amount)?;
                Ok(Some(limit.clone()))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl OrderRepository for InMemorySalesStore {
    async fn create_with_consumption(
        &self,
        order: &Order,
        consumption: &[QuotaConsumption],
    ) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        if tables.orders.values().any(|o| o.order_number == order.order_number) {
            return Err(DomainError::conflict(format!(
                "order number '{}' is taken",
                order.order_number
            )));
        }

        // Check everything first so a late violation leaves no partial writes.
        for item in consumption {
            if let Some(limit) = tables
                .limits
                .values()
                .find(|l| l.user_id == order.user_id && l.feature_id == item.feature_id)
            {
                if !limit.can_add_more(item.amount) {
                    return Err(limit.violation(item.amount).into());
                }
            }
        }
        for item in consumption {
            if let Some(limit) = tables.limit_for_mut(&order.user_id, &item.feature_id) {
                limit.consume(item.amount)?;
            }
        }
        tables.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        let tables = self.tables()?;
        Ok(tables.orders.get(id).filter(|o| o.deleted_at.is_none()).cloned())
    }

    async fn update_status(&self, order: &Order) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        tables.write_order_status(order)
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, DomainError> {
        let tables = self.tables()?;
        let mut orders: Vec<_> = tables
            .orders
            .values()
            .filter(|o| o.deleted_at.is_none())
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .filter(|o| filter.user_id.as_ref().map_or(true, |u| &o.user_id == u))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            orders.truncate(limit as usize);
        }
        Ok(orders)
    }

    async fn stats(&self) -> Result<OrderStats, DomainError> {
        let tables = self.tables()?;
        let mut stats = OrderStats::default();
        for order in tables.orders.values().filter(|o| o.deleted_at.is_none()) {
            stats.count(order.status);
        }
        Ok(stats)
    }
}
