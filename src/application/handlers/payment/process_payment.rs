//! ProcessPaymentHandler - one payment attempt against an order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;

use crate::application::OrderLocks;
use crate::domain::foundation::{OrderId, UserId};
use crate::domain::ordering::{Gateway, Payment, PaymentStatus};
use crate::domain::SalesError;
use crate::ports::{
    AuditAction, AuditEntry, AuditLog, ChargeOutcome, ChargeRequest, OrderRepository,
    PaymentGateway, PaymentRepository,
};

use super::settle::settle;

/// Configured gateway adapters by gateway.
#[derive(Default, Clone)]
pub struct PaymentGateways {
    gateways: HashMap<Gateway, Arc<dyn PaymentGateway>>,
}

impl PaymentGateways {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateways.insert(gateway.gateway(), gateway);
        self
    }

    pub fn get(&self, gateway: Gateway) -> Option<&Arc<dyn PaymentGateway>> {
        self.gateways.get(&gateway)
    }
}

#[derive(Debug, Clone)]
pub struct PaymentOptions {
    pub currency: String,
    pub gateway_timeout: Duration,
}

impl Default for PaymentOptions {
    fn default() -> Self {
        Self {
            currency: "BDT".to_string(),
            gateway_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessPaymentCommand {
    pub user_id: UserId,
    pub order_id: OrderId,
    pub gateway: Gateway,
    /// Gateway-specific customer input (e.g. a card payment method token).
    pub input: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessPaymentResult {
    pub payment: Payment,
    /// Set for redirect gateways; the payment stays pending until a webhook.
    pub redirect_url: Option<String>,
}

pub struct ProcessPaymentHandler {
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentRepository>,
    gateways: PaymentGateways,
    locks: Arc<OrderLocks>,
    audit: Arc<dyn AuditLog>,
    options: PaymentOptions,
}

impl ProcessPaymentHandler {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        payments: Arc<dyn PaymentRepository>,
        gateways: PaymentGateways,
        locks: Arc<OrderLocks>,
        audit: Arc<dyn AuditLog>,
        options: PaymentOptions,
    ) -> Self {
        Self {
            orders,
            payments,
            gateways,
            locks,
            audit,
            options,
        }
    }

    pub async fn handle(&self, cmd: ProcessPaymentCommand) -> Result<ProcessPaymentResult, SalesError> {
        let gateway = self
            .gateways
            .get(cmd.gateway)
            .cloned()
            .ok_or_else(|| SalesError::validation("gateway", format!("{} is not available", cmd.gateway)))?;

        let _guard = self.locks.acquire(cmd.order_id).await;

        let mut order = self
            .orders
            .find_by_id(&cmd.order_id)
            .await?
            .ok_or_else(|| SalesError::not_found("order", cmd.order_id))?;
        if !order.is_owned_by(&cmd.user_id) {
            return Err(SalesError::forbidden("Unauthorized access to order"));
        }
        if !order.status.accepts_payment() {
            return Err(SalesError::invalid_state(order.status.as_str(), "accept payment"));
        }

        let mut payment = Payment::attempt(&order, cmd.gateway, self.options.currency.clone());
        let request = ChargeRequest {
            order_id: order.id,
            payment_id: payment.id,
            order_number: order.order_number.clone(),
            amount: payment.amount,
            currency: payment.currency.clone(),
            input: cmd.input,
        };

        let outcome = tokio::time::timeout(self.options.gateway_timeout, gateway.charge(&request)).await;
        let failure = match outcome {
            Ok(Ok(ChargeOutcome::Captured {
                transaction_id,
                response,
            })) => {
                payment.gateway_response = Some(response);
                settle(&mut payment, &mut order, PaymentStatus::Captured, Some(transaction_id), None)?;
                None
            }
            Ok(Ok(ChargeOutcome::Authorized {
                transaction_id,
                response,
            })) => {
                payment.gateway_response = Some(response);
                settle(&mut payment, &mut order, PaymentStatus::Authorized, Some(transaction_id), None)?;
                None
            }
            Ok(Ok(ChargeOutcome::Redirect {
                reference_id,
                redirect_url,
                response,
            })) => {
                payment.reference_id = Some(reference_id);
                payment.metadata = json!({ "redirect_url": redirect_url });
                payment.gateway_response = Some(response);
                None
            }
            Ok(Ok(ChargeOutcome::Declined { reason, response })) => {
                payment.gateway_response = response;
                Some(reason)
            }
            Ok(Err(e)) => {
                tracing::error!(
                    order_id = %order.id,
                    gateway = %cmd.gateway,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Gateway charge failed"
                );
                Some(e.message)
            }
            Err(_) => {
                tracing::error!(order_id = %order.id, gateway = %cmd.gateway, "Gateway charge timed out");
                Some("gateway timeout".to_string())
            }
        };

        if let Some(reason) = failure {
            // Record the failed attempt first; the order stays open for a retry.
            payment.fail(reason.clone())?;
            self.payments.save(&payment, None).await?;
            self.audit_payment(&payment);
            tracing::warn!(
                payment_id = %payment.id,
                order_id = %order.id,
                reason = %reason,
                "Payment attempt failed"
            );
            return Err(SalesError::gateway_failure(cmd.gateway.as_str(), reason));
        }

        let order_changed = payment.status != PaymentStatus::Pending;
        self.payments
            .save(&payment, order_changed.then_some(&order))
            .await?;
        self.audit_payment(&payment);

        tracing::info!(
            payment_id = %payment.id,
            order_id = %order.id,
            gateway = %payment.gateway,
            status = %payment.status,
            order_status = %order.status,
            "Payment recorded"
        );

        let redirect_url = payment
            .metadata
            .get("redirect_url")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        Ok(ProcessPaymentResult {
            payment,
            redirect_url,
        })
    }

    fn audit_payment(&self, payment: &Payment) {
        self.audit.record(
            AuditEntry::new(
                AuditAction::Create,
                "Payment",
                payment.id,
                json!({
                    "order_id": payment.order_id,
                    "gateway": payment.gateway,
                    "status": payment.status,
                    "amount": payment.amount,
                }),
            )
            .by(&payment.user_id),
        );
    }
}
