//! Payment gateway adapters.
//!
//! - `StripeGateway` - synchronous card charges via PaymentIntents
//! - `RedirectGateway` - bKash, Nagad and bank transfer hosted pages
//! - `MockPaymentGateway` - configurable test double
//! - `HmacWebhookVerifier` - signed callbacks for every gateway

mod mock;
mod redirect;
pub mod signature;
mod stripe;
mod webhook;

pub use mock::MockPaymentGateway;
pub use redirect::RedirectGateway;
pub use stripe::{StripeConfig, StripeGateway};
pub use webhook::HmacWebhookVerifier;
