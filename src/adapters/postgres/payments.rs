//! Payment and invoice ports over the `payments` and `invoices` tables.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, InvoiceId, OrderId, PaymentId, Timestamp,
};
use crate::domain::ordering::{Gateway, Invoice, LineItem, Order, Payment};
use crate::ports::{
    GatewayTotals, InvoiceRepository, PaymentFilter, PaymentRepository, PaymentStats,
};

use super::ledger::write_order_status;
use super::{
    commit, count, db_error, money, parse_column, timestamp, user_id, write_error,
    PostgresSalesStore,
};

const PAYMENT_COLUMNS: &str = "id, order_id, user_id, gateway, transaction_id, reference_id, \
     amount, currency, status, metadata, gateway_response, failed_reason, attempted_at, \
     completed_at, created_at, updated_at";

/// Partial unique index: one non-cancelled invoice per order.
const LIVE_INVOICE_CONSTRAINT: &str = "invoices_live_order_key";

const INVOICE_COLUMNS: &str = "id, order_id, user_id, invoice_number, invoice_date, due_date, \
     subtotal, tax_amount, total_amount, status, notes, items, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    order_id: Uuid,
    user_id: String,
    gateway: String,
    transaction_id: Option<String>,
    reference_id: Option<String>,
    amount: Decimal,
    currency: String,
    status: String,
    metadata: Value,
    gateway_response: Option<Value>,
    failed_reason: Option<String>,
    attempted_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            order_id: OrderId::from_uuid(row.order_id),
            user_id: user_id(row.user_id)?,
            gateway: parse_column("gateway", &row.gateway)?,
            transaction_id: row.transaction_id,
            reference_id: row.reference_id,
            amount: money("amount", row.amount)?,
            currency: row.currency,
            status: parse_column("status", &row.status)?,
            metadata: row.metadata,
            gateway_response: row.gateway_response,
            failed_reason: row.failed_reason,
            attempted_at: timestamp(row.attempted_at),
            completed_at: row.completed_at.map(timestamp),
            created_at: timestamp(row.created_at),
            updated_at: timestamp(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: Uuid,
    order_id: Uuid,
    user_id: String,
    invoice_number: String,
    invoice_date: NaiveDate,
    due_date: NaiveDate,
    subtotal: Decimal,
    tax_amount: Decimal,
    total_amount: Decimal,
    status: String,
    notes: Option<String>,
    items: Json<Vec<LineItem>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DomainError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(Invoice {
            id: InvoiceId::from_uuid(row.id),
            order_id: OrderId::from_uuid(row.order_id),
            user_id: user_id(row.user_id)?,
            invoice_number: row.invoice_number,
            invoice_date: row.invoice_date,
            due_date: row.due_date,
            subtotal: money("subtotal", row.subtotal)?,
            tax_amount: money("tax_amount", row.tax_amount)?,
            total_amount: money("total_amount", row.total_amount)?,
            status: parse_column("status", &row.status)?,
            notes: row.notes,
            items: row.items.0,
            created_at: timestamp(row.created_at),
            updated_at: timestamp(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RevenueRow {
    total_revenue: Decimal,
    month_revenue: Decimal,
    today_revenue: Decimal,
    refunded_amount: Decimal,
    pending_count: i64,
    failed_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct GatewayTotalsRow {
    gateway: String,
    count: i64,
    total: Option<Decimal>,
}

impl TryFrom<GatewayTotalsRow> for GatewayTotals {
    type Error = DomainError;

    fn try_from(row: GatewayTotalsRow) -> Result<Self, Self::Error> {
        Ok(GatewayTotals {
            gateway: parse_column("gateway", &row.gateway)?,
            count: count(row.count),
            total: money("total", row.total.unwrap_or_default())?,
        })
    }
}

#[async_trait]
impl PaymentRepository for PostgresSalesStore {
    async fn save(&self, payment: &Payment, order: Option<&Order>) -> Result<(), DomainError> {
        let mut tx = self.begin().await?;

        if let Some(order) = order {
            write_order_status(&mut tx, order).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, order_id, user_id, gateway, transaction_id, reference_id, amount,
                currency, status, metadata, gateway_response, failed_reason, attempted_at,
                completed_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (id) DO UPDATE SET
                transaction_id = EXCLUDED.transaction_id,
                reference_id = EXCLUDED.reference_id,
                status = EXCLUDED.status,
                metadata = EXCLUDED.metadata,
                gateway_response = EXCLUDED.gateway_response,
                failed_reason = EXCLUDED.failed_reason,
                completed_at = EXCLUDED.completed_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.order_id.as_uuid())
        .bind(payment.user_id.as_str())
        .bind(payment.gateway.as_str())
        .bind(&payment.transaction_id)
        .bind(&payment.reference_id)
        .bind(payment.amount.to_decimal())
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(&payment.metadata)
        .bind(&payment.gateway_response)
        .bind(&payment.failed_reason)
        .bind(payment.attempted_at.as_datetime())
        .bind(payment.completed_at.as_ref().map(|t| *t.as_datetime()))
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            write_error("save payment", e, |constraint: &str| {
                (constraint == "payments_transaction_id_key").then(|| {
                    format!(
                        "transaction id '{}' already recorded",
                        payment.transaction_id.as_deref().unwrap_or_default()
                    )
                })
            })
        })?;

        commit(tx).await
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE id = $1",
            PAYMENT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch payment", e))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_by_gateway_reference(
        &self,
        gateway: Gateway,
        reference: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM payments
            WHERE gateway = $1 AND (transaction_id = $2 OR reference_id = $2)
            ORDER BY created_at
            LIMIT 1
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(gateway.as_str())
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch payment by reference", e))?;

        row.map(Payment::try_from).transpose()
    }

    async fn list_for_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE order_id = $1 ORDER BY created_at",
            PAYMENT_COLUMNS
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list order payments", e))?;

        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn list(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, DomainError> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM payments WHERE TRUE", PAYMENT_COLUMNS));
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(gateway) = filter.gateway {
            query.push(" AND gateway = ").push_bind(gateway.as_str());
        }
        query.push(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows: Vec<PaymentRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list payments", e))?;

        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn stats(&self, now: Timestamp) -> Result<PaymentStats, DomainError> {
        let revenue: RevenueRow = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(amount) FILTER (WHERE status = 'captured'), 0) AS total_revenue,
                COALESCE(SUM(amount) FILTER (WHERE status = 'captured' AND created_at >= $1), 0)
                    AS month_revenue,
                COALESCE(SUM(amount) FILTER (WHERE status = 'captured' AND created_at >= $2), 0)
                    AS today_revenue,
                COALESCE(SUM(amount) FILTER (WHERE status = 'refunded'), 0) AS refunded_amount,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending_count,
                COUNT(*) FILTER (WHERE status = 'failed') AS failed_count
            FROM payments
            "#,
        )
        .bind(now.start_of_month().as_datetime())
        .bind(now.start_of_day().as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("compute payment stats", e))?;

        let by_gateway: Vec<GatewayTotalsRow> = sqlx::query_as(
            r#"
            SELECT gateway, COUNT(*) AS count, SUM(amount) AS total
            FROM payments
            WHERE status = 'captured'
            GROUP BY gateway
            ORDER BY gateway
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("compute gateway totals", e))?;

        Ok(PaymentStats {
            today_revenue: money("today_revenue", revenue.today_revenue)?,
            month_revenue: money("month_revenue", revenue.month_revenue)?,
            total_revenue: money("total_revenue", revenue.total_revenue)?,
            refunded_amount: money("refunded_amount", revenue.refunded_amount)?,
            pending_count: count(revenue.pending_count),
            failed_count: count(revenue.failed_count),
            by_gateway: by_gateway
                .into_iter()
                .map(GatewayTotals::try_from)
                .collect::<Result<_, _>>()?,
        })
    }
}

fn live_invoice_taken(order_id: &OrderId) -> String {
    format!("order {} already has a live invoice", order_id)
}

#[async_trait]
impl InvoiceRepository for PostgresSalesStore {
    async fn save(&self, invoice: &Invoice) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, order_id, user_id, invoice_number, invoice_date, due_date, subtotal,
                tax_amount, total_amount, status, notes, items, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                notes = EXCLUDED.notes,
                due_date = EXCLUDED.due_date,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(invoice.id.as_uuid())
        .bind(invoice.order_id.as_uuid())
        .bind(invoice.user_id.as_str())
        .bind(&invoice.invoice_number)
        .bind(invoice.invoice_date)
        .bind(invoice.due_date)
        .bind(invoice.subtotal.to_decimal())
        .bind(invoice.tax_amount.to_decimal())
        .bind(invoice.total_amount.to_decimal())
        .bind(invoice.status.as_str())
        .bind(&invoice.notes)
        .bind(Json(&invoice.items))
        .bind(invoice.created_at.as_datetime())
        .bind(invoice.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            write_error("save invoice", e, |constraint: &str| match constraint {
                "invoices_invoice_number_key" => {
                    Some(format!("invoice number '{}' is taken", invoice.invoice_number))
                }
                LIVE_INVOICE_CONSTRAINT => Some(live_invoice_taken(&invoice.order_id)),
                _ => None,
            })
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: &InvoiceId) -> Result<Option<Invoice>, DomainError> {
        let row: Option<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices WHERE id = $1",
            INVOICE_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch invoice", e))?;

        row.map(Invoice::try_from).transpose()
    }

    async fn list_for_order(&self, order_id: &OrderId) -> Result<Vec<Invoice>, DomainError> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices WHERE order_id = $1 ORDER BY created_at",
            INVOICE_COLUMNS
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list order invoices", e))?;

        rows.into_iter().map(Invoice::try_from).collect()
    }
}
