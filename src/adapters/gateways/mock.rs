//! Mock payment gateway for testing.
//!
//! Supports:
//! - Pre-configured outcomes
//! - Error injection
//! - Artificial latency (for timeout paths)
//! - Call tracking

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::domain::ordering::Gateway;
use crate::ports::{ChargeOutcome, ChargeRequest, GatewayError, PaymentGateway};

/// Mock gateway. Captures every charge unless told otherwise.
///
/// ```ignore
/// let mock = MockPaymentGateway::new(Gateway::Stripe);
/// mock.decline_next("insufficient funds");
/// let outcome = mock.charge(&request).await?;
/// assert_eq!(mock.calls().len(), 1);
/// ```
#[derive(Clone)]
pub struct MockPaymentGateway {
    gateway: Gateway,
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    next_outcome: Option<ChargeOutcome>,
    next_error: Option<GatewayError>,
    delay: Option<Duration>,
    calls: Vec<ChargeRequest>,
}

impl MockPaymentGateway {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            inner: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A panicking test thread leaves the state usable for the rest.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Outcome for the next charge only.
    pub fn set_outcome(&self, outcome: ChargeOutcome) {
        self.state().next_outcome = Some(outcome);
    }

    pub fn decline_next(&self, reason: impl Into<String>) {
        self.set_outcome(ChargeOutcome::Declined {
            reason: reason.into(),
            response: None,
        });
    }

    /// Error for the next charge only.
    pub fn set_error(&self, error: GatewayError) {
        self.state().next_error = Some(error);
    }

    /// Delay applied to every charge.
    pub fn set_delay(&self, delay: Duration) {
        self.state().delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<ChargeRequest> {
        self.state().calls.clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    fn gateway(&self) -> Gateway {
        self.gateway
    }

    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome, GatewayError> {
        let (delay, error, outcome) = {
            let mut state = self.state();
            state.calls.push(request.clone());
            (state.delay, state.next_error.take(), state.next_outcome.take())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = error {
            return Err(error);
        }

        Ok(outcome.unwrap_or_else(|| ChargeOutcome::Captured {
            transaction_id: format!("txn_{}", request.payment_id.as_uuid().simple()),
            response: json!({"status": "succeeded", "mock": true}),
        }))
    }
}
