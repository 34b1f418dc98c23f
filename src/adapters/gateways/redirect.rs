//! Redirect-style gateways (mobile wallets, bank transfer).
//!
//! Nothing is charged here. The customer is sent to the gateway's hosted
//! page and the outcome arrives later as a signed webhook carrying the
//! reference id issued below.

use async_trait::async_trait;
use serde_json::json;

use crate::domain::ordering::Gateway;
use crate::ports::{ChargeOutcome, ChargeRequest, GatewayError, PaymentGateway};

pub struct RedirectGateway {
    gateway: Gateway,
    checkout_base_url: String,
}

impl RedirectGateway {
    pub fn new(gateway: Gateway, checkout_base_url: impl Into<String>) -> Self {
        Self {
            gateway,
            checkout_base_url: checkout_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Reference the gateway echoes back in its callback.
    pub fn reference_for(&self, request: &ChargeRequest) -> String {
        format!("{}_{}", self.gateway.as_str(), request.payment_id.as_uuid().simple())
    }
}

#[async_trait]
impl PaymentGateway for RedirectGateway {
    fn gateway(&self) -> Gateway {
        self.gateway
    }

    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome, GatewayError> {
        if self.checkout_base_url.is_empty() {
            return Err(GatewayError::not_configured(self.gateway));
        }

        let reference_id = self.reference_for(request);
        let redirect_url = format!(
            "{}/{}?reference={}&amount={}&currency={}",
            self.checkout_base_url, request.order_number, reference_id, request.amount, request.currency
        );

        tracing::debug!(
            gateway = %self.gateway,
            order_id = %request.order_id,
            reference_id = %reference_id,
            "Issued redirect payment"
        );

        Ok(ChargeOutcome::Redirect {
            response: json!({
                "reference_id": reference_id,
                "redirect_url": redirect_url,
            }),
            reference_id,
            redirect_url,
        })
    }
}
