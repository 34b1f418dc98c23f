//! HandleGatewayWebhookHandler - applies verified gateway callbacks.
//!
//! The handler never fails towards the caller. Gateways retry anything
//! that is not a 2xx, and a callback we cannot use will not become usable
//! on retry, so every problem ends as a logged [`WebhookOutcome::Rejected`].

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::application::OrderLocks;
use crate::domain::ordering::Gateway;
use crate::domain::SalesError;
use crate::ports::{
    AuditAction, AuditEntry, AuditLog, GatewayEvent, OrderRepository, PaymentRepository,
    WebhookVerifier,
};

use super::settle::settle;

#[derive(Debug, Clone)]
pub struct HandleGatewayWebhookCommand {
    pub gateway: Gateway,
    /// Raw request body, exactly as signed.
    pub payload: Vec<u8>,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// Payment and order were updated.
    Applied,
    /// The payment already had the reported status; nothing changed.
    AlreadyApplied,
    /// Ignored; see the reason.
    Rejected { reason: String },
}

pub struct HandleGatewayWebhookHandler {
    verifier: Arc<dyn WebhookVerifier>,
    payments: Arc<dyn PaymentRepository>,
    orders: Arc<dyn OrderRepository>,
    locks: Arc<OrderLocks>,
    audit: Arc<dyn AuditLog>,
}

impl HandleGatewayWebhookHandler {
    pub fn new(
        verifier: Arc<dyn WebhookVerifier>,
        payments: Arc<dyn PaymentRepository>,
        orders: Arc<dyn OrderRepository>,
        locks: Arc<OrderLocks>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            verifier,
            payments,
            orders,
            locks,
            audit,
        }
    }

    pub async fn handle(&self, cmd: HandleGatewayWebhookCommand) -> WebhookOutcome {
        let event = match self
            .verifier
            .verify(cmd.gateway, &cmd.payload, cmd.signature.as_deref())
        {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(gateway = %cmd.gateway, error = %e.message, "Webhook verification failed");
                return WebhookOutcome::Rejected { reason: e.message };
            }
        };

        match self.apply(&event).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    gateway = %event.gateway,
                    event_id = %event.event_id,
                    reference = %event.reference,
                    error = %e,
                    "Webhook not applied"
                );
                WebhookOutcome::Rejected { reason: e.message() }
            }
        }
    }

    async fn apply(&self, event: &GatewayEvent) -> Result<WebhookOutcome, SalesError> {
        let order_id = self
            .payments
            .find_by_gateway_reference(event.gateway, &event.reference)
            .await?
            .ok_or_else(|| SalesError::not_found("payment", &event.reference))?
            .order_id;

        let _guard = self.locks.acquire(order_id).await;

        let mut payment = self
            .payments
            .find_by_gateway_reference(event.gateway, &event.reference)
            .await?
            .ok_or_else(|| SalesError::not_found("payment", &event.reference))?;
        if payment.status == event.status {
            tracing::debug!(payment_id = %payment.id, event_id = %event.event_id, "Webhook already applied");
            return Ok(WebhookOutcome::AlreadyApplied);
        }

        let mut order = self
            .orders
            .find_by_id(&order_id)
            .await?
            .ok_or_else(|| SalesError::not_found("order", order_id))?;
        let previous = payment.status;

        settle(
            &mut payment,
            &mut order,
            event.status,
            event.transaction_id.clone(),
            event.reason.clone(),
        )?;
        payment.gateway_response = Some(event.payload.clone());
        self.payments.save(&payment, Some(&order)).await?;

        tracing::info!(
            payment_id = %payment.id,
            order_id = %order.id,
            from = %previous,
            to = %payment.status,
            event_id = %event.event_id,
            "Webhook applied"
        );
        self.audit.record(AuditEntry::new(
            AuditAction::Update,
            "Payment",
            payment.id,
            json!({
                "event_id": event.event_id,
                "from": previous,
                "to": payment.status,
                "order_status": order.status,
            }),
        ));

        Ok(WebhookOutcome::Applied)
    }
}
