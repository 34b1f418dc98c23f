//! RefundPaymentHandler - admin refund of an authorized or captured payment.
//!
//! Refunds are recorded, not executed: money goes back through the
//! gateway's own dashboard. The payment becomes refunded and the order is
//! reversed to cancelled in one write.

use std::sync::Arc;

use serde_json::json;

use crate::application::OrderLocks;
use crate::domain::foundation::{PaymentId, UserId};
use crate::domain::ordering::{Order, Payment, PaymentStatus};
use crate::domain::SalesError;
use crate::ports::{AuditAction, AuditEntry, AuditLog, OrderRepository, PaymentRepository};

use super::settle::settle;

#[derive(Debug, Clone)]
pub struct RefundPaymentCommand {
    pub actor: UserId,
    pub payment_id: PaymentId,
}

#[derive(Debug, Clone)]
pub struct RefundPaymentResult {
    pub payment: Payment,
    pub order: Order,
}

pub struct RefundPaymentHandler {
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentRepository>,
    locks: Arc<OrderLocks>,
    audit: Arc<dyn AuditLog>,
}

impl RefundPaymentHandler {
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

    pub async fn handle(&self, cmd: RefundPaymentCommand) -> Result<RefundPaymentResult, SalesError> {
        let order_id = self
            .payments
            .find_by_id(&cmd.payment_id)
            .await?
            .ok_or_else(|| SalesError::not_found("payment", cmd.payment_id))?
            .order_id;

        let _guard = self.locks.acquire(order_id).await;

        // Re-read under the lock; a webhook may have moved it meanwhile.
        let mut payment = self
            .payments
            .find_by_id(&cmd.payment_id)
            .await?
            .ok_or_else(|| SalesError::not_found("payment", cmd.payment_id))?;
        if !matches!(payment.status, PaymentStatus::Authorized | PaymentStatus::Captured) {
            return Err(SalesError::invalid_state(payment.status.as_str(), "refund"));
        }
        let mut order = self
            .orders
            .find_by_id(&order_id)
            .await?
            .ok_or_else(|| SalesError::not_found("order", order_id))?;

        settle(&mut payment, &mut order, PaymentStatus::Refunded, None, None)?;
        self.payments.save(&payment, Some(&order)).await?;

        tracing::info!(
            payment_id = %payment.id,
            order_id = %order.id,
            amount = %payment.amount,
            "Payment refunded"
        );
        self.audit.record(
            AuditEntry::new(
                AuditAction::Refund,
                "Payment",
                payment.id,
                json!({ "order_id": order.id, "amount": payment.amount }),
            )
            .by(&cmd.actor),
        );

        Ok(RefundPaymentResult { payment, order })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_fixtures::{user, Fixture};
    use crate::domain::ordering::test_support::pending_order;
    use crate::domain::ordering::{Gateway, OrderStatus};
    use crate::ports::QuotaConsumption;

    async fn seeded(status: PaymentStatus) -> (Fixture, Order, Payment) {
        let fx = Fixture::new().await;
        let mut order = pending_order("u1");
        let none: [QuotaConsumption; 0] = [];
        fx.store.create_with_consumption(&order, &none).await.unwrap();

        let mut payment = Payment::attempt(&order, Gateway::Stripe, "BDT");
        if status != PaymentStatus::Pending {
            settle(&mut payment, &mut order, status, Some("pi_9".into()), None).unwrap();
        }
        fx.store.save(&payment, Some(&order)).await.unwrap();
        (fx, order, payment)
    }

    fn handler(fx: &Fixture) -> RefundPaymentHandler {
        RefundPaymentHandler::new(
            fx.store.clone(),
            fx.store.clone(),
            Arc::new(OrderLocks::new()),
            fx.audit.clone(),
        )
    }

    #[tokio::test]
    async fn captured_payment_refund_cancels_order() {
        let (fx, order, payment) = seeded(PaymentStatus::Captured).await;

        let result = handler(&fx)
            .handle(RefundPaymentCommand {
                actor: user("admin"),
                payment_id: payment.id,
            })
            .await
            .unwrap();

        assert_eq!(result.payment.status, PaymentStatus::Refunded);
        assert_eq!(result.order.status, OrderStatus::Cancelled);
        let stored = OrderRepository::find_by_id(fx.store.as_ref(), &order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);
        assert_eq!(fx.audit.entries()[0].action, AuditAction::Refund);
    }

    #[tokio::test]
    async fn pending_payment_refund_is_rejected_without_mutation() {
        let (fx, order, payment) = seeded(PaymentStatus::Pending).await;

        let result = handler(&fx)
            .handle(RefundPaymentCommand {
                actor: user("admin"),
                payment_id: payment.id,
            })
            .await;

        assert!(matches!(result, Err(SalesError::InvalidState { .. })));
        let stored = OrderRepository::find_by_id(fx.store.as_ref(), &order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
        let stored_payment = PaymentRepository::find_by_id(fx.store.as_ref(), &payment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored_payment.status, PaymentStatus::Pending);
        assert!(fx.audit.entries().is_empty());
    }

    #[tokio::test]
    async fn refund_twice_is_rejected() {
        let (fx, _order, payment) = seeded(PaymentStatus::Authorized).await;
        let h = handler(&fx);
        let cmd = RefundPaymentCommand {
            actor: user("admin"),
            payment_id: payment.id,
        };

        h.handle(cmd.clone()).await.unwrap();
        let second = h.handle(cmd).await;

        assert!(matches!(second, Err(SalesError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn unknown_payment_is_not_found() {
        let fx = Fixture::new().await;
        let result = handler(&fx)
            .handle(RefundPaymentCommand {
                actor: user("admin"),
                payment_id: PaymentId::new(),
            })
            .await;
        assert!(matches!(result, Err(SalesError::NotFound { resource: "payment", .. })));
    }
}
