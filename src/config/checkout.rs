//! Checkout and invoicing configuration

use rust_decimal::Decimal;
use serde::Deserialize;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutConfig {
    /// Sales tax as a fraction (0.15 = 15%)
    #[serde(default = "default_tax_rate")]
    pub tax_rate: Decimal,

    /// Attempts at a unique order or invoice number
    #[serde(default = "default_number_attempts")]
    pub number_attempts: u32,

    /// Days between invoice date and due date
    #[serde(default = "default_invoice_due_days")]
    pub invoice_due_days: i64,

    /// Prefix of the payment URL handed back from checkout
    #[serde(default = "default_payment_url_base")]
    pub payment_url_base: String,
}

impl CheckoutConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE {
            return Err(ValidationError::InvalidTaxRate);
        }
        if self.number_attempts == 0 {
            return Err(ValidationError::MustBePositive("number_attempts"));
        }
        if self.invoice_due_days < 1 {
            return Err(ValidationError::MustBePositive("invoice_due_days"));
        }
        Ok(())
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            tax_rate: default_tax_rate(),
            number_attempts: default_number_attempts(),
            invoice_due_days: default_invoice_due_days(),
            payment_url_base: default_payment_url_base(),
        }
    }
}

fn default_tax_rate() -> Decimal {
    Decimal::new(15, 2)
}

fn default_number_attempts() -> u32 {
    3
}

fn default_invoice_due_days() -> i64 {
    30
}

fn default_payment_url_base() -> String {
    "/api/payment".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CheckoutConfig::default();
        assert_eq!(config.tax_rate, Decimal::new(15, 2));
        assert_eq!(config.invoice_due_days, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tax_rate_above_one_rejected() {
        let config = CheckoutConfig {
            tax_rate: Decimal::new(15, 0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidTaxRate)));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = CheckoutConfig {
            number_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
