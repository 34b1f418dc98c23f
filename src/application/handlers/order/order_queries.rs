//! Admin order listing and detail.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::OrderId;
use crate::domain::ordering::{Invoice, Order, Payment};
use crate::domain::SalesError;
use crate::ports::{InvoiceRepository, OrderFilter, OrderRepository, OrderStats, PaymentRepository};

#[derive(Debug, Clone, Serialize)]
pub struct OrderListing {
    pub orders: Vec<Order>,
    pub stats: OrderStats,
}

pub struct ListOrdersHandler {
    orders: Arc<dyn OrderRepository>,
}

impl ListOrdersHandler {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    /// Stats cover every order, not just the filtered page.
    pub async fn handle(&self, filter: OrderFilter) -> Result<OrderListing, SalesError> {
        let (orders, stats) = futures::try_join!(self.orders.list(&filter), self.orders.stats())?;
        Ok(OrderListing { orders, stats })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
    pub order: Order,
    pub payments: Vec<Payment>,
    pub invoices: Vec<Invoice>,
}

pub struct GetOrderHandler {
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentRepository>,
    invoices: Arc<dyn InvoiceRepository>,
}

impl GetOrderHandler {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        payments: Arc<dyn PaymentRepository>,
        invoices: Arc<dyn InvoiceRepository>,
    ) -> Self {
        Self {
            orders,
            payments,
            invoices,
        }
    }

    pub async fn handle(&self, order_id: &OrderId) -> Result<OrderDetails, SalesError> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| SalesError::not_found("order", order_id))?;
        let (payments, invoices) = futures::try_join!(
            self.payments.list_for_order(order_id),
            self.invoices.list_for_order(order_id)
        )?;
        Ok(OrderDetails {
            order,
            payments,
            invoices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_fixtures::Fixture;
    use crate::domain::ordering::test_support::pending_order;
    use crate::domain::ordering::{Gateway, OrderStatus};
    use crate::ports::QuotaConsumption;

    #[tokio::test]
    async fn listing_filters_but_stats_cover_everything() {
        let fx = Fixture::new().await;
        let none: [QuotaConsumption; 0] = [];
        let pending = pending_order("u1");
        let mut completed = pending_order("u2");
        completed.order_number = "2024010100002".into();
        completed.complete().unwrap();
        fx.store.create_with_consumption(&pending, &none).await.unwrap();
        fx.store.create_with_consumption(&completed, &none).await.unwrap();

        let listing = ListOrdersHandler::new(fx.store.clone())
            .handle(OrderFilter {
                status: Some(OrderStatus::Completed),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(listing.orders.len(), 1);
        assert_eq!(listing.orders[0].id, completed.id);
        assert_eq!(listing.stats.total, 2);
        assert_eq!(listing.stats.pending, 1);
    }

    #[tokio::test]
    async fn details_include_payments() {
        let fx = Fixture::new().await;
        let none: [QuotaConsumption; 0] = [];
        let order = pending_order("u1");
        fx.store.create_with_consumption(&order, &none).await.unwrap();
        let payment = Payment::attempt(&order, Gateway::Nagad, "BDT");
        PaymentRepository::save(fx.store.as_ref(), &payment, None).await.unwrap();

        let details = GetOrderHandler::new(fx.store.clone(), fx.store.clone(), fx.store.clone())
            .handle(&order.id)
            .await
            .unwrap();

        assert_eq!(details.payments.len(), 1);
        assert!(details.invoices.is_empty());
    }
}
