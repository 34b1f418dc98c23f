//! Payment attempts and their lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    Money, OrderId, PaymentId, StateMachine, Timestamp, UserId, ValidationError,
};

use super::Order;

/// Payment gateway that handled an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gateway {
    Stripe,
    Bkash,
    Nagad,
    BankTransfer,
}

impl Gateway {
    pub const ALL: [Gateway; 4] = [
        Gateway::Stripe,
        Gateway::Bkash,
        Gateway::Nagad,
        Gateway::BankTransfer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gateway::Stripe => "stripe",
            Gateway::Bkash => "bkash",
            Gateway::Nagad => "nagad",
            Gateway::BankTransfer => "bank_transfer",
        }
    }
}

impl fmt::Display for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gateway {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stripe" => Ok(Gateway::Stripe),
            "bkash" => Ok(Gateway::Bkash),
            "nagad" => Ok(Gateway::Nagad),
            "bank_transfer" => Ok(Gateway::BankTransfer),
            other => Err(ValidationError::invalid_format(
                "gateway",
                format!("unknown gateway '{}'", other),
            )),
        }
    }
}

/// Payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Authorized,
    Captured,
    Refunded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Authorized => "authorized",
            PaymentStatus::Captured => "captured",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Failed => "failed",
        }
    }

    /// Money has moved or is reserved.
    pub fn is_successful(&self) -> bool {
        matches!(self, PaymentStatus::Authorized | PaymentStatus::Captured)
    }
}

impl StateMachine for PaymentStatus {
    fn valid_transitions(&self) -> &'static [Self] {
        use PaymentStatus::*;
        match self {
            Pending => &[Authorized, Captured, Failed],
            Authorized => &[Captured, Failed, Refunded],
            Captured => &[Refunded],
            Refunded | Failed => &[],
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "authorized" => Ok(PaymentStatus::Authorized),
            "captured" => Ok(PaymentStatus::Captured),
            "refunded" => Ok(PaymentStatus::Refunded),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown payment status '{}'", other),
            )),
        }
    }
}

/// One payment attempt against an order.
///
/// An order may have many attempts; at most one ends up captured in
/// practice, though the gateway is the authority on that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub gateway: Gateway,
    pub transaction_id: Option<String>,
    pub reference_id: Option<String>,
    pub amount: Money,
    pub currency: String,
    pub status: PaymentStatus,
    pub metadata: serde_json::Value,
    pub gateway_response: Option<serde_json::Value>,
    pub failed_reason: Option<String>,
    pub attempted_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Payment {
    /// Starts a pending attempt for the full order total.
    pub fn attempt(order: &Order, gateway: Gateway, currency: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: PaymentId::new(),
            order_id: order.id,
            user_id: order.user_id.clone(),
            gateway,
            transaction_id: None,
            reference_id: None,
            amount: order.total_amount,
            currency: currency.into(),
            status: PaymentStatus::Pending,
            metadata: serde_json::json!({}),
            gateway_response: None,
            failed_reason: None,
            attempted_at: now,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(&mut self, target: PaymentStatus) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(target)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Funds captured by the gateway.
    pub fn capture(&mut self, transaction_id: Option<String>) -> Result<(), ValidationError> {
        self.transition(PaymentStatus::Captured)?;
        if transaction_id.is_some() {
            self.transaction_id = transaction_id;
        }
        self.completed_at = Some(self.updated_at);
        Ok(())
    }

    /// Funds reserved, capture pending.
    pub fn authorize(&mut self, transaction_id: Option<String>) -> Result<(), ValidationError> {
        self.transition(PaymentStatus::Authorized)?;
        if transaction_id.is_some() {
            self.transaction_id = transaction_id;
        }
        self.completed_at = Some(self.updated_at);
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), ValidationError> {
        self.transition(PaymentStatus::Failed)?;
        self.failed_reason = Some(reason.into());
        Ok(())
    }

    pub fn refund(&mut self) -> Result<(), ValidationError> {
        self.transition(PaymentStatus::Refunded)
    }

    /// Moves to whatever terminal-ish status a gateway reported.
    pub fn apply_status(
        &mut self,
        status: PaymentStatus,
        transaction_id: Option<String>,
        reason: Option<String>,
    ) -> Result<(), ValidationError> {
        match status {
            PaymentStatus::Captured => self.capture(transaction_id),
            PaymentStatus::Authorized => self.authorize(transaction_id),
            PaymentStatus::Failed => self.fail(reason.unwrap_or_else(|| "declined by gateway".to_string())),
            PaymentStatus::Refunded => self.refund(),
            PaymentStatus::Pending => Err(ValidationError::invalid_transition(self.status.as_str(), "pending")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ordering::order::test_support::pending_order;

    #[test]
    fn attempt_charges_order_total() {
        let order = pending_order("user-1");
        let payment = Payment::attempt(&order, Gateway::Stripe, "BDT");
        assert_eq!(payment.amount, order.total_amount);
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[test]
    fn capture_then_refund() {
        let order = pending_order("user-1");
        let mut payment = Payment::attempt(&order, Gateway::Stripe, "BDT");
        payment.capture(Some("pi_123".into())).unwrap();
        assert!(payment.completed_at.is_some());
        assert_eq!(payment.transaction_id.as_deref(), Some("pi_123"));
        payment.refund().unwrap();
        assert_eq!(payment.status, PaymentStatus::Refunded);
    }

    #[test]
    fn pending_payment_cannot_be_refunded() {
        let order = pending_order("user-1");
        let mut payment = Payment::attempt(&order, Gateway::Bkash, "BDT");
        assert!(payment.refund().is_err());
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[test]
    fn failed_payment_records_reason() {
        let order = pending_order("user-1");
        let mut payment = Payment::attempt(&order, Gateway::Stripe, "BDT");
        payment.fail("card declined").unwrap();
        assert_eq!(payment.failed_reason.as_deref(), Some("card declined"));
        assert!(payment.status.is_terminal());
    }

    #[test]
    fn gateway_parses_case_insensitively() {
        assert_eq!("BKASH".parse::<Gateway>().unwrap(), Gateway::Bkash);
        assert!("paypal".parse::<Gateway>().is_err());
    }
}
