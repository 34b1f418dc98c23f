//! Payment gateway port.
//!
//! Gateways are opaque charge-initiation services. A synchronous gateway
//! (card processor) answers with a final outcome; an asynchronous one
//! (mobile wallet, bank transfer) hands back a redirect and reports the
//! result later through a webhook.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Money, OrderId, PaymentId};
use crate::domain::ordering::{Gateway, PaymentStatus};

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Which gateway this adapter speaks to.
    fn gateway(&self) -> Gateway;

    /// Initiates a charge for the full order amount.
    ///
    /// A decline is an `Ok(ChargeOutcome::Declined)`; `Err` is reserved
    /// for transport and configuration problems.
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome, GatewayError>;
}

/// What the recorder sends to a gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub order_id: OrderId,
    pub payment_id: PaymentId,
    pub order_number: String,
    pub amount: Money,
    pub currency: String,
    /// Gateway-specific input from the customer (payment method token, ...).
    pub input: serde_json::Value,
}

/// Result of a charge attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChargeOutcome {
    /// Funds captured immediately.
    Captured {
        transaction_id: String,
        response: serde_json::Value,
    },
    /// Funds reserved; capture follows.
    Authorized {
        transaction_id: String,
        response: serde_json::Value,
    },
    /// Customer must complete the payment elsewhere.
    Redirect {
        reference_id: String,
        redirect_url: String,
        response: serde_json::Value,
    },
    /// Gateway refused the charge or left it in a non-final state.
    Declined {
        reason: String,
        response: Option<serde_json::Value>,
    },
}

impl ChargeOutcome {
    /// Payment status the outcome implies.
    pub fn payment_status(&self) -> PaymentStatus {
        match self {
            ChargeOutcome::Captured { .. } => PaymentStatus::Captured,
            ChargeOutcome::Authorized { .. } => PaymentStatus::Authorized,
            ChargeOutcome::Redirect { .. } => PaymentStatus::Pending,
            ChargeOutcome::Declined { .. } => PaymentStatus::Failed,
        }
    }
}

/// Errors from gateway operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayError {
    pub code: GatewayErrorCode,
    pub message: String,
    /// Gateway's own error code, if any.
    pub provider_code: Option<String>,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    pub fn timeout() -> Self {
        Self::new(GatewayErrorCode::Timeout, "gateway timeout")
    }

    pub fn not_configured(gateway: Gateway) -> Self {
        Self::new(
            GatewayErrorCode::NotConfigured,
            format!("{} gateway is not configured", gateway),
        )
    }

    pub fn invalid_webhook(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidWebhook, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

/// Gateway error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    NetworkError,
    Timeout,
    AuthenticationError,
    InvalidRequest,
    ProviderError,
    InvalidWebhook,
    NotConfigured,
}

impl GatewayErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::NetworkError | GatewayErrorCode::Timeout | GatewayErrorCode::ProviderError
        )
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::Timeout => "timeout",
            GatewayErrorCode::AuthenticationError => "authentication_error",
            GatewayErrorCode::InvalidRequest => "invalid_request",
            GatewayErrorCode::ProviderError => "provider_error",
            GatewayErrorCode::InvalidWebhook => "invalid_webhook",
            GatewayErrorCode::NotConfigured => "not_configured",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_maps_to_payment_status() {
        let redirect = ChargeOutcome::Redirect {
            reference_id: "ref".into(),
            redirect_url: "https://pay.example/ref".into(),
            response: serde_json::json!({}),
        };
        assert_eq!(redirect.payment_status(), PaymentStatus::Pending);
        let declined = ChargeOutcome::Declined {
            reason: "insufficient funds".into(),
            response: None,
        };
        assert_eq!(declined.payment_status(), PaymentStatus::Failed);
    }

    #[test]
    fn timeouts_are_retryable_but_bad_config_is_not() {
        assert!(GatewayError::timeout().is_retryable());
        assert!(!GatewayError::not_configured(Gateway::Nagad).is_retryable());
    }

    #[test]
    fn error_displays_code_and_message() {
        let err = GatewayError::network("connection reset");
        assert_eq!(err.to_string(), "network_error: connection reset");
    }
}
