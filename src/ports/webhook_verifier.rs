//! Webhook verification port.
//!
//! Turns a raw gateway callback into a trusted [`GatewayEvent`]. Anything
//! that fails verification never reaches the payment recorder.

use serde::{Deserialize, Serialize};

use crate::domain::ordering::{Gateway, PaymentStatus};

use super::GatewayError;

/// A verified, normalized callback from a gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayEvent {
    pub gateway: Gateway,
    /// Gateway's own event id.
    pub event_id: String,
    /// Transaction or reference id identifying the payment.
    pub reference: String,
    /// Final transaction id, if the gateway assigned one.
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
    pub reason: Option<String>,
    pub payload: serde_json::Value,
}

pub trait WebhookVerifier: Send + Sync {
    /// Verifies the signature and parses the payload.
    ///
    /// # Errors
    ///
    /// - `InvalidWebhook` for bad signatures, stale timestamps, unknown
    ///   gateways or malformed payloads
    fn verify(
        &self,
        gateway: Gateway,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<GatewayEvent, GatewayError>;
}
