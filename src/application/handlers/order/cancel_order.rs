//! CancelOrderHandler - admin cancel of an open order.

use std::sync::Arc;

use serde_json::json;

use crate::application::OrderLocks;
use crate::domain::foundation::{OrderId, UserId};
use crate::domain::ordering::Order;
use crate::domain::SalesError;
use crate::ports::{AuditAction, AuditEntry, AuditLog, OrderRepository};

#[derive(Debug, Clone)]
pub struct CancelOrderCommand {
    pub actor: UserId,
    pub order_id: OrderId,
}

pub struct CancelOrderHandler {
    orders: Arc<dyn OrderRepository>,
    locks: Arc<OrderLocks>,
    audit: Arc<dyn AuditLog>,
}

impl CancelOrderHandler {
    pub fn new(orders: Arc<dyn OrderRepository>, locks: Arc<OrderLocks>, audit: Arc<dyn AuditLog>) -> Self {
        Self { orders, locks, audit }
    }

    /// Completed and already cancelled orders are rejected unchanged.
    /// Consumed quota is not released.
    pub async fn handle(&self, cmd: CancelOrderCommand) -> Result<Order, SalesError> {
        let _guard = self.locks.acquire(cmd.order_id).await;

        let mut order = self
            .orders
            .find_by_id(&cmd.order_id)
            .await?
            .ok_or_else(|| SalesError::not_found("order", cmd.order_id))?;
        let previous = order.status;
        order.cancel()?;
        self.orders.update_status(&order).await?;

        tracing::info!(order_id = %order.id, from = %previous, actor = %cmd.actor, "Order cancelled");
        self.audit.record(
            AuditEntry::new(
                AuditAction::Update,
                "Order",
                order.id,
                json!({ "from": previous, "to": order.status }),
            )
            .by(&cmd.actor),
        );
        Ok(order)
    }
}
