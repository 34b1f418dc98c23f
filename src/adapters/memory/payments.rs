//! Payment and invoice ports over the in-memory tables.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::domain::foundation::{DomainError, InvoiceId, Money, OrderId, PaymentId, Timestamp};
use crate::domain::ordering::{Gateway, Invoice, Order, Payment, PaymentStatus};
use crate::ports::{
    GatewayTotals, InvoiceRepository, PaymentFilter, PaymentRepository, PaymentStats,
};

use super::InMemorySalesStore;

#[async_trait]
impl PaymentRepository for InMemorySalesStore {
    async fn save(&self, payment: &Payment, order: Option<&Order>) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        if let Some(txn) = &payment.transaction_id {
            if tables
                .payments
                .values()
                .any(|p| p.id != payment.id && p.transaction_id.as_ref() == Some(txn))
            {
                return Err(DomainError::conflict(format!("transaction id '{}' already recorded", txn)));
            }
        }
        if let Some(order) = order {
            tables.write_order_status(order)?;
        }
        tables.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        Ok(self.tables()?.payments.get(id).cloned())
    }

    async fn find_by_gateway_reference(
        &self,
        gateway: Gateway,
        reference: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let tables = self.tables()?;
        Ok(tables
            .payments
            .values()
            .filter(|p| p.gateway == gateway)
            .find(|p| {
                p.transaction_id.as_deref() == Some(reference)
                    || p.reference_id.as_deref() == Some(reference)
            })
            .cloned())
    }

    async fn list_for_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, DomainError> {
        let tables = self.tables()?;
        let mut payments: Vec<_> = tables
            .payments
            .values()
            .filter(|p| &p.order_id == order_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.created_at);
        Ok(payments)
    }

    async fn list(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, DomainError> {
        let tables = self.tables()?;
        let mut payments: Vec<_> = tables
            .payments
            .values()
            .filter(|p| filter.status.map_or(true, |s| p.status == s))
            .filter(|p| filter.gateway.map_or(true, |g| p.gateway == g))
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            payments.truncate(limit as usize);
        }
        Ok(payments)
    }

    async fn stats(&self, now: Timestamp) -> Result<PaymentStats, DomainError> {
        let tables = self.tables()?;
        let day_start = now.start_of_day();
        let month_start = now.start_of_month();

        let mut stats = PaymentStats::default();
        let mut by_gateway: BTreeMap<&'static str, GatewayTotals> = BTreeMap::new();
        for payment in tables.payments.values() {
            match payment.status {
                PaymentStatus::Captured => {
                    stats.total_revenue = stats.total_revenue + payment.amount;
                    if payment.created_at >= month_start {
                        stats.month_revenue = stats.month_revenue + payment.amount;
                    }
                    if payment.created_at >= day_start {
                        stats.today_revenue = stats.today_revenue + payment.amount;
                    }
                    let entry = by_gateway
                        .entry(payment.gateway.as_str())
                        .or_insert_with(|| GatewayTotals {
                            gateway: payment.gateway,
                            count: 0,
                            total: Money::ZERO,
                        });
                    entry.count += 1;
                    entry.total = entry.total + payment.amount;
                }
                PaymentStatus::Refunded => {
                    stats.refunded_amount = stats.refunded_amount + payment.amount;
                }
                PaymentStatus::Pending => stats.pending_count += 1,
                PaymentStatus::Failed => stats.failed_count += 1,
                PaymentStatus::Authorized => {}
            }
        }
        stats.by_gateway = by_gateway.into_values().collect();
        Ok(stats)
    }
}

#[async_trait]
impl InvoiceRepository for InMemorySalesStore {
    async fn save(&self, invoice: &Invoice) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        if tables
            .invoices
            .values()
            .any(|i| i.invoice_number == invoice.invoice_number && i.id != invoice.id)
        {
            return Err(DomainError::conflict(format!(
                "invoice number '{}' is taken",
                invoice.invoice_number
            )));
        }
        if invoice.is_live()
            && tables
                .invoices
                .values()
                .any(|i| i.order_id == invoice.order_id && i.id != invoice.id && i.is_live())
        {
            return Err(DomainError::conflict(format!(
                "order {} already has a live invoice",
                invoice.order_id
            )));
        }
        tables.invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &InvoiceId) -> Result<Option<Invoice>, DomainError> {
        Ok(self.tables()?.invoices.get(id).cloned())
    }

    async fn list_for_order(&self, order_id: &OrderId) -> Result<Vec<Invoice>, DomainError> {
        let tables = self.tables()?;
        let mut invoices: Vec<_> = tables
            .invoices
            .values()
            .filter(|i| &i.order_id == order_id)
            .cloned()
            .collect();
        invoices.sort_by_key(|i| i.created_at);
        Ok(invoices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;
    use crate::domain::ordering::test_support::pending_order;
    use crate::domain::ordering::{InvoiceStatus, OrderStatus};
    use crate::ports::OrderRepository;

    #[tokio::test]
    async fn save_with_order_updates_both() {
        let store = InMemorySalesStore::new();
        let mut order = pending_order("u1");
        store.create_with_consumption(&order, &[]).await.unwrap();

        let mut payment = Payment::attempt(&order, Gateway::Stripe, "BDT");
        payment.capture(Some("pi_1".into())).unwrap();
        order.complete().unwrap();
        PaymentRepository::save(&store, &payment, Some(&order)).await.unwrap();

        let stored = OrderRepository::find_by_id(&store, &order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, order.status);
        let found = store
            .find_by_gateway_reference(Gateway::Stripe, "pi_1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, payment.id);
    }

    #[tokio::test]
    async fn capture_written_after_a_cancel_is_refused() {
        let store = InMemorySalesStore::new();
        let order = pending_order("u1");
        store.create_with_consumption(&order, &[]).await.unwrap();

        let mut cancelled = order.clone();
        cancelled.cancel().unwrap();
        store.update_status(&cancelled).await.unwrap();

        // A capture computed from the pre-cancel read.
        let mut stale = order.clone();
        stale.complete().unwrap();
        let mut payment = Payment::attempt(&order, Gateway::Stripe, "BDT");
        payment.capture(Some("pi_late".into())).unwrap();

        let err = PaymentRepository::save(&store, &payment, Some(&stale)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
        let stored = OrderRepository::find_by_id(&store, &order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);
        assert_eq!(store.payment_count(), 0);
    }

    #[tokio::test]
    async fn transaction_id_is_unique_across_payments() {
        let store = InMemorySalesStore::new();
        let order = pending_order("u1");
        store.create_with_consumption(&order, &[]).await.unwrap();

        let mut first = Payment::attempt(&order, Gateway::Stripe, "BDT");
        first.capture(Some("pi_dup".into())).unwrap();
        PaymentRepository::save(&store, &first, None).await.unwrap();

        let mut second = Payment::attempt(&order, Gateway::Stripe, "BDT");
        second.capture(Some("pi_dup".into())).unwrap();
        let err = PaymentRepository::save(&store, &second, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn one_live_invoice_per_order() {
        let store = InMemorySalesStore::new();
        let order = pending_order("u1");
        let now = Timestamp::now();

        let mut first = Invoice::issue_for(&order, "Business", "INV-1".into(), now, 30);
        InvoiceRepository::save(&store, &first).await.unwrap();
        let second = Invoice::issue_for(&order, "Business", "INV-2".into(), now, 30);
        let err = InvoiceRepository::save(&store, &second).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);

        first.status = InvoiceStatus::Cancelled;
        InvoiceRepository::save(&store, &first).await.unwrap();
        InvoiceRepository::save(&store, &second).await.unwrap();
        assert_eq!(InvoiceRepository::list_for_order(&store, &order.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn stats_sum_captured_and_count_pending() {
        let store = InMemorySalesStore::new();
        let order = pending_order("u1");
        store.create_with_consumption(&order, &[]).await.unwrap();

        let mut captured = Payment::attempt(&order, Gateway::Bkash, "BDT");
        captured.capture(Some("trx-1".into())).unwrap();
        PaymentRepository::save(&store, &captured, None).await.unwrap();
        let pending = Payment::attempt(&order, Gateway::Nagad, "BDT");
        PaymentRepository::save(&store, &pending, None).await.unwrap();

        let stats = PaymentRepository::stats(&store, Timestamp::now()).await.unwrap();
        assert_eq!(stats.total_revenue, order.total_amount);
        assert_eq!(stats.today_revenue, order.total_amount);
        assert_eq!(stats.pending_count, 1);
        assert_eq!(stats.by_gateway.len(), 1);
        assert_eq!(stats.by_gateway[0].gateway, Gateway::Bkash);
    }
}
