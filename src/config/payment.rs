//! Payment gateway configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Gateway credentials and charge settings.
///
/// A gateway is enabled when its credentials are present. Stripe needs an
/// API key; the redirect gateways need a checkout URL and a webhook secret.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// ISO currency code charged for every order
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Upper bound on a single gateway charge call
    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,

    pub stripe_api_key: Option<SecretString>,
    pub stripe_webhook_secret: Option<SecretString>,

    /// Where Stripe sends the customer after 3-D Secure
    #[serde(default = "default_stripe_return_url")]
    pub stripe_return_url: String,

    pub bkash_checkout_url: Option<String>,
    pub bkash_webhook_secret: Option<SecretString>,

    pub nagad_checkout_url: Option<String>,
    pub nagad_webhook_secret: Option<SecretString>,

    pub bank_transfer_checkout_url: Option<String>,
    pub bank_transfer_webhook_secret: Option<SecretString>,
}

impl PaymentConfig {
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    pub fn stripe_enabled(&self) -> bool {
        self.stripe_api_key.is_some()
    }

    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key
            .as_ref()
            .is_some_and(|k| k.expose_secret().starts_with("sk_test_"))
    }

    /// Redirect gateways with a checkout URL, as `(name, url, secret)`.
    pub fn redirect_gateways(&self) -> Vec<(&'static str, &str, Option<&SecretString>)> {
        [
            ("bkash", &self.bkash_checkout_url, &self.bkash_webhook_secret),
            ("nagad", &self.nagad_checkout_url, &self.nagad_webhook_secret),
            (
                "bank_transfer",
                &self.bank_transfer_checkout_url,
                &self.bank_transfer_webhook_secret,
            ),
        ]
        .into_iter()
        .filter_map(|(name, url, secret)| url.as_deref().map(|u| (name, u, secret.as_ref())))
        .collect()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCurrency);
        }
        if self.gateway_timeout_secs == 0 || self.gateway_timeout_secs > 120 {
            return Err(ValidationError::InvalidGatewayTimeout);
        }

        if let Some(key) = &self.stripe_api_key {
            if !key.expose_secret().starts_with("sk_") {
                return Err(ValidationError::InvalidStripeKey);
            }
            match &self.stripe_webhook_secret {
                None => return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET")),
                Some(secret) if !secret.expose_secret().starts_with("whsec_") => {
                    return Err(ValidationError::InvalidStripeWebhookSecret)
                }
                Some(_) => {}
            }
        }

        for (name, _, secret) in self.redirect_gateways() {
            if secret.is_none() {
                return Err(ValidationError::GatewaySecretMissing(name));
            }
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            gateway_timeout_secs: default_gateway_timeout(),
            stripe_api_key: None,
            stripe_webhook_secret: None,
            stripe_return_url: default_stripe_return_url(),
            bkash_checkout_url: None,
            bkash_webhook_secret: None,
            nagad_checkout_url: None,
            nagad_webhook_secret: None,
            bank_transfer_checkout_url: None,
            bank_transfer_webhook_secret: None,
        }
    }
}

fn default_currency() -> String {
    "BDT".to_string()
}

fn default_gateway_timeout() -> u64 {
    30
}

fn default_stripe_return_url() -> String {
    "http://localhost:8080/payment/return".to_string()
}
