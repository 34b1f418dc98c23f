//! Stripe card gateway.
//!
//! Creates and confirms a PaymentIntent in one call. Card charges are
//! synchronous: `succeeded` captures, `requires_capture` authorizes,
//! `requires_action` hands back a 3-D Secure redirect, anything else is
//! treated as a decline.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::ordering::Gateway;
use crate::ports::{ChargeOutcome, ChargeRequest, GatewayError, GatewayErrorCode, PaymentGateway};

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    api_key: SecretString,
    api_base_url: String,
    return_url: String,
}

impl StripeConfig {
    pub fn new(api_key: SecretString, return_url: impl Into<String>) -> Self {
        Self {
            api_key,
            api_base_url: "https://api.stripe.com".to_string(),
            return_url: return_url.into(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

pub struct StripeGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn outcome_for(intent: StripePaymentIntent, raw: serde_json::Value) -> ChargeOutcome {
        match intent.status.as_str() {
            "succeeded" => ChargeOutcome::Captured {
                transaction_id: intent.id,
                response: raw,
            },
            "requires_capture" => ChargeOutcome::Authorized {
                transaction_id: intent.id,
                response: raw,
            },
            "requires_action" => match intent.next_action.and_then(|a| a.redirect_to_url).map(|r| r.url) {
                Some(url) => ChargeOutcome::Redirect {
                    reference_id: intent.id,
                    redirect_url: url,
                    response: raw,
                },
                None => ChargeOutcome::Declined {
                    reason: "Payment requires an action this client cannot perform".to_string(),
                    response: Some(raw),
                },
            },
            other => ChargeOutcome::Declined {
                reason: format!("Payment processing. Status: {}", other),
                response: Some(raw),
            },
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn gateway(&self) -> Gateway {
        Gateway::Stripe
    }

    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome, GatewayError> {
        let payment_method = request
            .input
            .get("payment_method")
            .and_then(|v| v.as_str())
            .ok_or_else(|| GatewayError::new(GatewayErrorCode::InvalidRequest, "payment_method is required"))?;

        let url = format!("{}/v1/payment_intents", self.config.api_base_url);
        let params = vec![
            ("amount", request.amount.cents().to_string()),
            ("currency", request.currency.to_ascii_lowercase()),
            ("payment_method", payment_method.to_string()),
            ("confirm", "true".to_string()),
            ("return_url", self.config.return_url.clone()),
            ("metadata[order_id]", request.order_id.to_string()),
            ("metadata[order_number]", request.order_number.clone()),
            ("metadata[payment_id]", request.payment_id.to_string()),
        ];

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .header("Idempotency-Key", request.payment_id.to_string())
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        let status = response.status();
        let raw: serde_json::Value = response.json().await.map_err(|e| {
            GatewayError::new(
                GatewayErrorCode::ProviderError,
                format!("Failed to parse Stripe response: {}", e),
            )
        })?;

        // Card errors come back as 402 with a structured error body.
        if status == reqwest::StatusCode::PAYMENT_REQUIRED {
            let error: StripeErrorBody = serde_json::from_value(raw.clone()).unwrap_or_default();
            return Ok(ChargeOutcome::Declined {
                reason: error.error.message.unwrap_or_else(|| "card declined".to_string()),
                response: Some(raw),
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GatewayError::new(
                GatewayErrorCode::AuthenticationError,
                "Stripe rejected the API key",
            ));
        }

        if !status.is_success() {
            let error: StripeErrorBody = serde_json::from_value(raw).unwrap_or_default();
            tracing::error!(status = %status, code = ?error.error.code, "Stripe charge failed");
            let err = GatewayError::new(
                GatewayErrorCode::ProviderError,
                error.error.message.unwrap_or_else(|| format!("Stripe API error ({})", status)),
            );
            return Err(match error.error.code {
                Some(code) => err.with_provider_code(code),
                None => err,
            });
        }

        let intent: StripePaymentIntent = serde_json::from_value(raw.clone()).map_err(|e| {
            GatewayError::new(
                GatewayErrorCode::ProviderError,
                format!("Unexpected PaymentIntent shape: {}", e),
            )
        })?;
        Ok(Self::outcome_for(intent, raw))
    }
}

#[derive(Debug, Deserialize)]
struct StripePaymentIntent {
    id: String,
    status: String,
    #[serde(default)]
    next_action: Option<StripeNextAction>,
}

#[derive(Debug, Deserialize)]
struct StripeNextAction {
    #[serde(default)]
    redirect_to_url: Option<StripeRedirect>,
}

#[derive(Debug, Deserialize)]
struct StripeRedirect {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    error: StripeError,
}

#[derive(Debug, Default, Deserialize)]
struct StripeError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn intent(raw: serde_json::Value) -> ChargeOutcome {
        let parsed: StripePaymentIntent = serde_json::from_value(raw.clone()).unwrap();
        StripeGateway::outcome_for(parsed, raw)
    }

    #[test]
    fn succeeded_intent_is_captured() {
        let outcome = intent(json!({"id": "pi_1", "status": "succeeded"}));
        assert!(matches!(outcome, ChargeOutcome::Captured { ref transaction_id, .. } if transaction_id == "pi_1"));
    }

    #[test]
    fn requires_capture_is_authorized() {
        let outcome = intent(json!({"id": "pi_2", "status": "requires_capture"}));
        assert!(matches!(outcome, ChargeOutcome::Authorized { .. }));
    }

    #[test]
    fn three_d_secure_becomes_redirect() {
        let outcome = intent(json!({
            "id": "pi_3",
            "status": "requires_action",
            "next_action": {"redirect_to_url": {"url": "https://hooks.stripe.com/3ds"}}
        }));
        assert!(matches!(outcome, ChargeOutcome::Redirect { ref redirect_url, .. } if redirect_url.contains("3ds")));
    }

    #[test]
    fn processing_is_declined_with_status() {
        let outcome = intent(json!({"id": "pi_4", "status": "processing"}));
        match outcome {
            ChargeOutcome::Declined { reason, .. } => assert_eq!(reason, "Payment processing. Status: processing"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_payment_method_is_invalid_request() {
        let gateway = StripeGateway::new(StripeConfig::new(
            SecretString::new("sk_test".to_string()),
            "https://shop.example/return",
        ));
        let request = ChargeRequest {
            order_id: crate::domain::foundation::OrderId::new(),
            payment_id: crate::domain::foundation::PaymentId::new(),
            order_number: "2024010100001".into(),
            amount: crate::domain::foundation::Money::from_cents(100),
            currency: "BDT".into(),
            input: json!({}),
        };
        let err = gateway.charge(&request).await.unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::InvalidRequest);
    }
}
