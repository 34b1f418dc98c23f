//! HMAC webhook verifier.
//!
//! Stripe events are translated from their native `payment_intent.*`
//! envelope. Redirect gateways post a flat, already-normalized body:
//!
//! ```json
//! {"event_id": "...", "reference": "bkash_...", "transaction_id": "...",
//!  "status": "captured", "reason": null}
//! ```

use std::collections::HashMap;

use chrono::Utc;
use secrecy::SecretString;
use serde::Deserialize;

use crate::domain::ordering::{Gateway, PaymentStatus};
use crate::ports::{GatewayError, GatewayEvent, WebhookVerifier};

use super::signature::{self, SignatureHeader};

#[derive(Default)]
pub struct HmacWebhookVerifier {
    secrets: HashMap<Gateway, SecretString>,
}

impl HmacWebhookVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, gateway: Gateway, secret: SecretString) -> Self {
        self.secrets.insert(gateway, secret);
        self
    }

    /// Verification against an explicit clock (unix seconds).
    pub fn verify_at(
        &self,
        gateway: Gateway,
        payload: &[u8],
        signature: Option<&str>,
        now: i64,
    ) -> Result<GatewayEvent, GatewayError> {
        let secret = self
            .secrets
            .get(&gateway)
            .ok_or_else(|| GatewayError::not_configured(gateway))?;
        let header = SignatureHeader::parse(signature.unwrap_or_default())?;
        signature::verify(secret, payload, &header, now)?;

        let value: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| GatewayError::invalid_webhook(format!("payload is not JSON: {}", e)))?;

        match gateway {
            Gateway::Stripe => parse_stripe_event(value),
            other => parse_normalized_event(other, value),
        }
    }
}

impl WebhookVerifier for HmacWebhookVerifier {
    fn verify(
        &self,
        gateway: Gateway,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<GatewayEvent, GatewayError> {
        self.verify_at(gateway, payload, signature, Utc::now().timestamp())
    }
}

#[derive(Debug, Deserialize)]
struct StripeEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: StripeObject,
}

#[derive(Debug, Deserialize)]
struct StripeObject {
    id: String,
    #[serde(default)]
    payment_intent: Option<String>,
    #[serde(default)]
    last_payment_error: Option<StripeLastError>,
}

#[derive(Debug, Deserialize)]
struct StripeLastError {
    #[serde(default)]
    message: Option<String>,
}

fn parse_stripe_event(value: serde_json::Value) -> Result<GatewayEvent, GatewayError> {
    let event: StripeEvent = serde_json::from_value(value.clone())
        .map_err(|e| GatewayError::invalid_webhook(format!("malformed Stripe event: {}", e)))?;

    let (status, reference) = match event.event_type.as_str() {
        "payment_intent.succeeded" => (PaymentStatus::Captured, event.data.object.id.clone()),
        "payment_intent.amount_capturable_updated" => {
            (PaymentStatus::Authorized, event.data.object.id.clone())
        }
        "payment_intent.payment_failed" => (PaymentStatus::Failed, event.data.object.id.clone()),
        // Charges point back at their intent.
        "charge.refunded" => (
            PaymentStatus::Refunded,
            event
                .data
                .object
                .payment_intent
                .clone()
                .unwrap_or_else(|| event.data.object.id.clone()),
        ),
        other => {
            return Err(GatewayError::invalid_webhook(format!(
                "unsupported Stripe event type '{}'",
                other
            )))
        }
    };

    Ok(GatewayEvent {
        gateway: Gateway::Stripe,
        event_id: event.id,
        transaction_id: Some(reference.clone()),
        reference,
        status,
        reason: event.data.object.last_payment_error.and_then(|e| e.message),
        payload: value,
    })
}

#[derive(Debug, Deserialize)]
struct NormalizedEvent {
    event_id: String,
    reference: String,
    #[serde(default)]
    transaction_id: Option<String>,
    status: PaymentStatus,
    #[serde(default)]
    reason: Option<String>,
}

fn parse_normalized_event(gateway: Gateway, value: serde_json::Value) -> Result<GatewayEvent, GatewayError> {
    let event: NormalizedEvent = serde_json::from_value(value.clone())
        .map_err(|e| GatewayError::invalid_webhook(format!("malformed {} event: {}", gateway, e)))?;
    if event.status == PaymentStatus::Pending {
        return Err(GatewayError::invalid_webhook("pending is not a reportable status"));
    }
    Ok(GatewayEvent {
        gateway,
        event_id: event.event_id,
        reference: event.reference,
        transaction_id: event.transaction_id,
        status: event.status,
        reason: event.reason,
        payload: value,
    })
}
