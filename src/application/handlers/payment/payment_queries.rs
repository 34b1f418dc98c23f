//! Read-side payment queries for customers and admins.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{OrderId, PaymentId, Timestamp, UserId};
use crate::domain::ordering::{Order, Payment};
use crate::domain::SalesError;
use crate::ports::{OrderRepository, OrderStats, PaymentFilter, PaymentRepository, PaymentStats};

/// Customer view of an order and its payment attempts.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPaymentView {
    pub order: Order,
    pub payments: Vec<Payment>,
}

pub struct GetOrderPaymentHandler {
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentRepository>,
}

impl GetOrderPaymentHandler {
    pub fn new(orders: Arc<dyn OrderRepository>, payments: Arc<dyn PaymentRepository>) -> Self {
        Self { orders, payments }
    }

    pub async fn handle(&self, user_id: &UserId, order_id: &OrderId) -> Result<OrderPaymentView, SalesError> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| SalesError::not_found("order", order_id))?;
        if !order.is_owned_by(user_id) {
            return Err(SalesError::forbidden("Unauthorized access to order"));
        }
        let payments = self.payments.list_for_order(order_id).await?;
        Ok(OrderPaymentView { order, payments })
    }
}

pub struct ListPaymentsHandler {
    payments: Arc<dyn PaymentRepository>,
}

impl ListPaymentsHandler {
    pub fn new(payments: Arc<dyn PaymentRepository>) -> Self {
        Self { payments }
    }

    pub async fn handle(&self, filter: PaymentFilter) -> Result<Vec<Payment>, SalesError> {
        Ok(self.payments.list(&filter).await?)
    }
}

pub struct GetPaymentHandler {
    payments: Arc<dyn PaymentRepository>,
}

impl GetPaymentHandler {
    pub fn new(payments: Arc<dyn PaymentRepository>) -> Self {
        Self { payments }
    }

    pub async fn handle(&self, payment_id: &PaymentId) -> Result<Payment, SalesError> {
        self.payments
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| SalesError::not_found("payment", payment_id))
    }
}

/// Admin payment dashboard figures.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentDashboard {
    pub payments: PaymentStats,
    pub orders: OrderStats,
}

pub struct PaymentStatsHandler {
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentRepository>,
}

impl PaymentStatsHandler {
    pub fn new(orders: Arc<dyn OrderRepository>, payments: Arc<dyn PaymentRepository>) -> Self {
        Self { orders, payments }
    }

    pub async fn handle(&self) -> Result<PaymentDashboard, SalesError> {
        let (payments, orders) =
            futures::try_join!(self.payments.stats(Timestamp::now()), self.orders.stats())?;
        Ok(PaymentDashboard { payments, orders })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_fixtures::{user, Fixture};
    use crate::domain::foundation::Money;
    use crate::domain::ordering::test_support::pending_order;
    use crate::domain::ordering::{Gateway, PaymentStatus};
    use crate::ports::QuotaConsumption;

    async fn seeded() -> (Fixture, Order) {
        let fx = Fixture::new().await;
        let mut order = pending_order("u1");
        let none: [QuotaConsumption; 0] = [];
        fx.store.create_with_consumption(&order, &none).await.unwrap();

        let mut failed = Payment::attempt(&order, Gateway::Stripe, "BDT");
        failed.fail("card declined").unwrap();
        fx.store.save(&failed, None).await.unwrap();

        let mut captured = Payment::attempt(&order, Gateway::Stripe, "BDT");
        captured.capture(Some("pi_1".into())).unwrap();
        order.complete().unwrap();
        fx.store.save(&captured, Some(&order)).await.unwrap();
        (fx, order)
    }

    #[tokio::test]
    async fn owner_sees_all_attempts() {
        let (fx, order) = seeded().await;
        let handler = GetOrderPaymentHandler::new(fx.store.clone(), fx.store.clone());

        let view = handler.handle(&user("u1"), &order.id).await.unwrap();

        assert_eq!(view.payments.len(), 2);
        assert_eq!(view.order.id, order.id);
    }

    #[tokio::test]
    async fn other_user_is_forbidden() {
        let (fx, order) = seeded().await;
        let handler = GetOrderPaymentHandler::new(fx.store.clone(), fx.store.clone());

        let result = handler.handle(&user("intruder"), &order.id).await;

        assert!(matches!(result, Err(SalesError::Forbidden(_))));
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let (fx, _order) = seeded().await;
        let handler = ListPaymentsHandler::new(fx.store.clone());

        let failed = handler
            .handle(PaymentFilter {
                status: Some(PaymentStatus::Failed),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].failed_reason.as_deref(), Some("card declined"));
    }

    #[tokio::test]
    async fn dashboard_counts_captured_revenue_only() {
        let (fx, order) = seeded().await;
        let handler = PaymentStatsHandler::new(fx.store.clone(), fx.store.clone());

        let dashboard = handler.handle().await.unwrap();

        assert_eq!(dashboard.payments.total_revenue, order.total_amount);
        assert_eq!(dashboard.payments.today_revenue, order.total_amount);
        assert_eq!(dashboard.payments.failed_count, 1);
        assert_eq!(dashboard.payments.refunded_amount, Money::ZERO);
        assert_eq!(dashboard.orders.completed, 1);
    }

    #[tokio::test]
    async fn missing_payment_is_not_found() {
        let fx = Fixture::new().await;
        let result = GetPaymentHandler::new(fx.store.clone())
            .handle(&PaymentId::new())
            .await;
        assert!(matches!(result, Err(SalesError::NotFound { resource: "payment", .. })));
    }
}
