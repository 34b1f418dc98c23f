//! Order aggregate and its lifecycle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::catalog::BillingCycle;
use crate::domain::customization::{PriceBreakdown, ResolvedCustomization};
use crate::domain::foundation::{
    DomainError, FeatureId, Money, OrderId, PackageId, StateMachine, Timestamp, UserId, ValidationError,
};

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, awaiting payment.
    Pending,
    /// An asynchronous gateway has authorized but not yet captured.
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Payments may be started only while the order is open.
    pub fn accepts_payment(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// Whether writing `self` may replace `stored`: the same status, a
    /// lifecycle edge out of it, or the refund reversal of a completed order.
    pub fn may_replace(&self, stored: OrderStatus) -> bool {
        *self == stored
            || stored.can_transition_to(self)
            || (stored == OrderStatus::Completed && *self == OrderStatus::Cancelled)
    }
}

impl StateMachine for OrderStatus {
    fn valid_transitions(&self) -> &'static [Self] {
        use OrderStatus::*;
        match self {
            Pending => &[Processing, Completed, Failed, Cancelled],
            Processing => &[Completed, Failed, Cancelled],
            Failed => &[Cancelled],
            Completed | Cancelled => &[],
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "completed" => Ok(OrderStatus::Completed),
            "failed" => Ok(OrderStatus::Failed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown order status '{}'", other),
            )),
        }
    }
}

/// A customer's purchase of one package.
///
/// # Invariants
///
/// - `order_number` is unique
/// - customization and amounts are frozen at creation; only `status`
///   and `updated_at` change afterwards
/// - `total_amount = subtotal + tax_amount`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub package_id: PackageId,
    pub order_number: String,
    pub customization_data: BTreeMap<FeatureId, serde_json::Value>,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
    pub billing_cycle: BillingCycle,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub custom_fields: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl Order {
    /// Places a new pending order.
    pub fn place(
        user_id: UserId,
        package_id: PackageId,
        order_number: String,
        customization: &[ResolvedCustomization],
        price: PriceBreakdown,
        billing_cycle: BillingCycle,
        custom_fields: serde_json::Value,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: OrderId::new(),
            user_id,
            package_id,
            order_number,
            customization_data: customization
                .iter()
                .map(|c| (c.feature_id, c.value.to_json()))
                .collect(),
            subtotal: price.subtotal,
            tax_amount: price.tax_amount,
            total_amount: price.total_amount,
            billing_cycle,
            status: OrderStatus::Pending,
            notes: None,
            custom_fields,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Moves to `target` if the lifecycle allows it.
    pub fn transition(&mut self, target: OrderStatus) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(target)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), ValidationError> {
        self.transition(OrderStatus::Completed)
    }

    pub fn cancel(&mut self) -> Result<(), ValidationError> {
        self.transition(OrderStatus::Cancelled)
    }

    /// Marks the order as in flight after an authorization.
    ///
    /// Already processing is not an error.
    pub fn mark_processing(&mut self) -> Result<(), ValidationError> {
        if self.status == OrderStatus::Processing {
            return Ok(());
        }
        self.transition(OrderStatus::Processing)
    }

    /// Reverses the order after its payment was refunded.
    ///
    /// Unlike [`Order::cancel`] this also reverses a completed order. An
    /// already cancelled order stays as it is.
    pub fn reverse_for_refund(&mut self) {
        if self.status != OrderStatus::Cancelled {
            self.status = OrderStatus::Cancelled;
            self.updated_at = Timestamp::now();
        }
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Refuses a status write over a row that moved on since this copy was
    /// read, e.g. a capture landing after another writer cancelled.
    pub fn ensure_replaces(&self, stored: OrderStatus) -> Result<(), DomainError> {
        if self.status.may_replace(stored) {
            return Ok(());
        }
        Err(DomainError::conflict(format!(
            "order {} is already {}; cannot write {}",
            self.id, stored, self.status
        ))
        .with_detail("status", stored.as_str()))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A pending order totalling 119.60.
    pub fn pending_order(user: &str) -> Order {
        Order::place(
            UserId::new(user).unwrap(),
            PackageId::new(),
            "2024010100001".to_string(),
            &[],
            PriceBreakdown {
                subtotal: Money::from_cents(10400),
                tax_amount: Money::from_cents(1560),
                total_amount: Money::from_cents(11960),
            },
            BillingCycle::Monthly,
            serde_json::json!({}),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::pending_order;
    use super::*;

    #[test]
    fn new_order_is_pending_and_open_for_payment() {
        let order = pending_order("user-1");
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.status.accepts_payment());
    }

    #[test]
    fn completed_order_cannot_be_cancelled() {
        let mut order = pending_order("user-1");
        order.complete().unwrap();
        assert!(order.cancel().is_err());
        assert_eq!(order.status, OrderStatus::Completed);
    }

    #[test]
    fn refund_reverses_a_completed_order() {
        let mut order = pending_order("user-1");
        order.complete().unwrap();
        order.reverse_for_refund();
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[test]
    fn processing_can_complete_or_cancel() {
        let mut order = pending_order("user-1");
        order.mark_processing().unwrap();
        order.mark_processing().unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        order.complete().unwrap();
        assert!(order.status.is_terminal());
    }

    #[test]
    fn cancelled_is_terminal() {
        let mut order = pending_order("user-1");
        order.cancel().unwrap();
        assert!(order.status.is_terminal());
        assert!(!order.status.accepts_payment());
    }

    #[test]
    fn stale_write_over_a_cancelled_order_is_a_conflict() {
        let mut captured = pending_order("user-1");
        captured.complete().unwrap();

        let err = captured.ensure_replaces(OrderStatus::Cancelled).unwrap_err();
        assert_eq!(err.code, crate::domain::foundation::ErrorCode::Conflict);
        assert!(captured.ensure_replaces(OrderStatus::Pending).is_ok());
        assert!(captured.ensure_replaces(OrderStatus::Completed).is_ok());
    }

    #[test]
    fn refund_reversal_may_replace_completed() {
        assert!(OrderStatus::Cancelled.may_replace(OrderStatus::Completed));
        assert!(!OrderStatus::Completed.may_replace(OrderStatus::Cancelled));
        assert!(!OrderStatus::Pending.may_replace(OrderStatus::Processing));
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Completed,
            OrderStatus::Failed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }
}
