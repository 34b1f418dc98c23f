//! GenerateInvoiceHandler - invoice snapshot of an order, issued once.

use std::sync::Arc;

use serde_json::json;

use crate::application::OrderLocks;
use crate::domain::foundation::{ErrorCode, OrderId, Timestamp, UserId};
use crate::domain::ordering::{Invoice, OrderStatus};
use crate::domain::SalesError;
use crate::ports::{
    AuditAction, AuditEntry, AuditLog, CatalogReader, InvoiceRepository, NumberGenerator,
    OrderRepository,
};

#[derive(Debug, Clone)]
pub struct InvoiceOptions {
    pub due_in_days: i64,
    /// Attempts at a unique invoice number before giving up.
    pub number_attempts: u32,
}

impl Default for InvoiceOptions {
    fn default() -> Self {
        Self {
            due_in_days: 30,
            number_attempts: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerateInvoiceCommand {
    pub actor: UserId,
    pub order_id: OrderId,
}

#[derive(Debug, Clone)]
pub struct GenerateInvoiceResult {
    pub invoice: Invoice,
    /// False when an existing live invoice was returned.
    pub created: bool,
}

pub struct GenerateInvoiceHandler {
    orders: Arc<dyn OrderRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    catalog: Arc<dyn CatalogReader>,
    numbers: Arc<dyn NumberGenerator>,
    locks: Arc<OrderLocks>,
    audit: Arc<dyn AuditLog>,
    options: InvoiceOptions,
}

impl GenerateInvoiceHandler {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        catalog: Arc<dyn CatalogReader>,
        numbers: Arc<dyn NumberGenerator>,
        locks: Arc<OrderLocks>,
        audit: Arc<dyn AuditLog>,
        options: InvoiceOptions,
    ) -> Self {
        Self {
            orders,
            invoices,
            catalog,
            numbers,
            locks,
            audit,
            options,
        }
    }

    pub async fn handle(&self, cmd: GenerateInvoiceCommand) -> Result<GenerateInvoiceResult, SalesError> {
        let _guard = self.locks.acquire(cmd.order_id).await;

        let order = self
            .orders
            .find_by_id(&cmd.order_id)
            .await?
            .ok_or_else(|| SalesError::not_found("order", cmd.order_id))?;

        if let Some(existing) = self.live_invoice(&order.id).await? {
            tracing::debug!(order_id = %order.id, invoice_number = %existing.invoice_number, "Invoice already issued");
            return Ok(GenerateInvoiceResult {
                invoice: existing,
                created: false,
            });
        }
        if order.status == OrderStatus::Cancelled {
            return Err(SalesError::invalid_state(order.status.as_str(), "issue an invoice"));
        }

        // A removed package still names the line item.
        let description = match self.catalog.get_package(&order.package_id).await? {
            Some(package) => package.name,
            None => format!("Order {}", order.order_number),
        };

        let attempts = self.options.number_attempts.max(1);
        let mut attempt = 0;
        let invoice = loop {
            attempt += 1;
            let now = Timestamp::now();
            let number = self.numbers.next_invoice_number(now).await?;
            let invoice = Invoice::issue_for(&order, &description, number, now, self.options.due_in_days);
            match self.invoices.save(&invoice).await {
                Ok(()) => break invoice,
                Err(e) if e.code == ErrorCode::Conflict => {
                    // Another writer may have issued one since the check above.
                    if let Some(existing) = self.live_invoice(&order.id).await? {
                        tracing::info!(order_id = %order.id, invoice_number = %existing.invoice_number, "Invoice issued concurrently");
                        return Ok(GenerateInvoiceResult {
                            invoice: existing,
                            created: false,
                        });
                    }
                    if attempt >= attempts {
                        return Err(e.into());
                    }
                    tracing::warn!(invoice_number = %invoice.invoice_number, attempt, "Invoice number collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        };

        tracing::info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            order_id = %order.id,
            "Invoice issued"
        );
        self.audit.record(
            AuditEntry::new(AuditAction::Create, "Invoice", invoice.id, json!(invoice)).by(&cmd.actor),
        );
        Ok(GenerateInvoiceResult {
            invoice,
            created: true,
        })
    }

    async fn live_invoice(&self, order_id: &OrderId) -> Result<Option<Invoice>, SalesError> {
        Ok(self
            .invoices
            .list_for_order(order_id)
            .await?
            .into_iter()
            .find(Invoice::is_live))
    }
}
