//! Invoices: point-in-time snapshots of an order's amounts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    InvoiceId, Money, OrderId, StateMachine, Timestamp, UserId, ValidationError,
};

use super::Order;

/// Invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Issued => "issued",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl StateMachine for InvoiceStatus {
    fn valid_transitions(&self) -> &'static [Self] {
        use InvoiceStatus::*;
        match self {
            Draft => &[Issued, Cancelled],
            Issued => &[Paid, Overdue, Cancelled],
            Overdue => &[Paid, Cancelled],
            Paid | Cancelled => &[],
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(InvoiceStatus::Draft),
            "issued" => Ok(InvoiceStatus::Issued),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown invoice status '{}'", other),
            )),
        }
    }
}

/// A single billed line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    pub items: Vec<LineItem>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Invoice {
    /// Issues an invoice copying the order's amounts.
    ///
    /// The single line item bills the package once at the order subtotal.
    pub fn issue_for(
        order: &Order,
        package_name: &str,
        invoice_number: String,
        issued_at: Timestamp,
        due_in_days: i64,
    ) -> Self {
        Self {
            id: InvoiceId::new(),
            order_id: order.id,
            user_id: order.user_id.clone(),
            invoice_number,
            invoice_date: issued_at.date(),
            due_date: issued_at.add_days(due_in_days).date(),
            subtotal: order.subtotal,
            tax_amount: order.tax_amount,
            total_amount: order.total_amount,
            status: InvoiceStatus::Issued,
            notes: None,
            items: vec![LineItem {
                description: package_name.to_string(),
                quantity: 1,
                unit_price: order.subtotal,
                total: order.subtotal,
            }],
            created_at: issued_at,
            updated_at: issued_at,
        }
    }

    /// Cancelled invoices do not block issuing a new one.
    pub fn is_live(&self) -> bool {
        self.status != InvoiceStatus::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ordering::order::test_support::pending_order;
    use chrono::{DateTime, Utc};

    #[test]
    fn issue_copies_amounts_and_sets_due_date() {
        let order = pending_order("user-1");
        let at = Timestamp::from_datetime(
            DateTime::parse_from_rfc3339("2024-01-15T09:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        );
        let invoice = Invoice::issue_for(&order, "Business", "INV-202401000001".into(), at, 30);

        assert_eq!(invoice.status, InvoiceStatus::Issued);
        assert_eq!(invoice.total_amount, order.total_amount);
        assert_eq!(invoice.due_date.to_string(), "2024-02-14");
        assert_eq!(invoice.items.len(), 1);
        assert_eq!(invoice.items[0].unit_price, order.subtotal);
        assert!(invoice.is_live());
    }

    #[test]
    fn paid_invoice_is_terminal() {
        assert!(InvoiceStatus::Paid.is_terminal());
        assert!(InvoiceStatus::Issued.can_transition_to(&InvoiceStatus::Cancelled));
    }
}
