//! RecordManualPaymentHandler - admin records a payment taken offline.

use std::sync::Arc;

use serde_json::json;

use crate::application::OrderLocks;
use crate::domain::foundation::{OrderId, UserId};
use crate::domain::ordering::{Gateway, Payment, PaymentStatus};
use crate::domain::SalesError;
use crate::ports::{AuditAction, AuditEntry, AuditLog, OrderRepository, PaymentRepository};

use super::settle::settle;

#[derive(Debug, Clone)]
pub struct RecordManualPaymentCommand {
    pub actor: UserId,
    pub order_id: OrderId,
    pub gateway: Gateway,
    pub transaction_id: Option<String>,
    pub reference_id: Option<String>,
    pub status: PaymentStatus,
    pub currency: String,
}

pub struct RecordManualPaymentHandler {
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentRepository>,
    locks: Arc<OrderLocks>,
    audit: Arc<dyn AuditLog>,
}

impl RecordManualPaymentHandler {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        payments: Arc<dyn PaymentRepository>,
        locks: Arc<OrderLocks>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            orders,
            payments,
            locks,
            audit,
        }
    }

    /// Amount is always the order total; the usual transition rules apply.
    pub async fn handle(&self, cmd: RecordManualPaymentCommand) -> Result<Payment, SalesError> {
        let _guard = self.locks.acquire(cmd.order_id).await;

        let mut order = self
            .orders
            .find_by_id(&cmd.order_id)
            .await?
            .ok_or_else(|| SalesError::not_found("order", cmd.order_id))?;
        if !order.status.accepts_payment() {
            return Err(SalesError::invalid_state(order.status.as_str(), "accept payment"));
        }

        let mut payment = Payment::attempt(&order, cmd.gateway, cmd.currency);
        payment.reference_id = cmd.reference_id;
        payment.metadata = json!({ "recorded_by": cmd.actor });
        match cmd.status {
            PaymentStatus::Pending => payment.transaction_id = cmd.transaction_id,
            status => settle(
                &mut payment,
                &mut order,
                status,
                cmd.transaction_id,
                Some("recorded manually".to_string()),
            )?,
        }

        let order_changed = matches!(payment.status, PaymentStatus::Captured | PaymentStatus::Authorized);
        self.payments.save(&payment, order_changed.then_some(&order)).await?;

        tracing::info!(
            payment_id = %payment.id,
            order_id = %order.id,
            status = %payment.status,
            actor = %cmd.actor,
            "Manual payment recorded"
        );
        self.audit.record(
            AuditEntry::new(AuditAction::Create, "Payment", payment.id, json!(payment)).by(&cmd.actor),
        );
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_fixtures::{user, Fixture};
    use crate::domain::ordering::test_support::pending_order;
    use crate::domain::ordering::{Order, OrderStatus};
    use crate::ports::QuotaConsumption;

    async fn seeded() -> (Fixture, Order, RecordManualPaymentHandler) {
        let fx = Fixture::new().await;
        let order = pending_order("u1");
        let none: [QuotaConsumption; 0] = [];
        fx.store.create_with_consumption(&order, &none).await.unwrap();
        let handler = RecordManualPaymentHandler::new(
            fx.store.clone(),
            fx.store.clone(),
            Arc::new(OrderLocks::new()),
            fx.audit.clone(),
        );
        (fx, order, handler)
    }

    fn command(order: &Order, status: PaymentStatus, txn: Option<&str>) -> RecordManualPaymentCommand {
        RecordManualPaymentCommand {
            actor: user("admin"),
            order_id: order.id,
            gateway: Gateway::BankTransfer,
            transaction_id: txn.map(str::to_string),
            reference_id: Some("DEP-123".into()),
            status,
            currency: "BDT".into(),
        }
    }

    #[tokio::test]
    async fn captured_manual_payment_completes_order() {
        let (fx, order, handler) = seeded().await;

        let payment = handler
            .handle(command(&order, PaymentStatus::Captured, Some("BT-1")))
            .await
            .unwrap();

        assert_eq!(payment.amount, order.total_amount);
        assert!(payment.completed_at.is_some());
        let stored = OrderRepository::find_by_id(fx.store.as_ref(), &order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn pending_manual_payment_leaves_order_pending() {
        let (fx, order, handler) = seeded().await;

        handler.handle(command(&order, PaymentStatus::Pending, None)).await.unwrap();

        let stored = OrderRepository::find_by_id(fx.store.as_ref(), &order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn refunded_is_not_a_valid_starting_status() {
        let (_fx, order, handler) = seeded().await;
        let result = handler.handle(command(&order, PaymentStatus::Refunded, None)).await;
        assert!(matches!(result, Err(SalesError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn duplicate_transaction_id_is_a_conflict() {
        let (_fx, order, handler) = seeded().await;
        handler
            .handle(command(&order, PaymentStatus::Pending, Some("BT-1")))
            .await
            .unwrap();

        let result = handler.handle(command(&order, PaymentStatus::Pending, Some("BT-1"))).await;

        assert!(matches!(result, Err(SalesError::Conflict(_))));
    }
}
