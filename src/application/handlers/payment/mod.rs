//! Payment handlers.
//!
//! ## Commands
//! - Customer payment attempt against an order
//! - Gateway webhook application
//! - Admin refund and manual payment recording
//!
//! ## Queries
//! - Customer order payment view
//! - Admin listing, detail and revenue stats
//!
//! Every command that changes a payment holds the order's lock from
//! [`OrderLocks`](crate::application::OrderLocks) while it reads and writes.

mod handle_webhook;
mod payment_queries;
mod process_payment;
mod record_manual_payment;
mod refund_payment;
mod settle;

pub use handle_webhook::{HandleGatewayWebhookCommand, HandleGatewayWebhookHandler, WebhookOutcome};
pub use payment_queries::{
    GetOrderPaymentHandler, GetPaymentHandler, ListPaymentsHandler, OrderPaymentView,
    PaymentDashboard, PaymentStatsHandler,
};
pub use process_payment::{
    PaymentGateways, PaymentOptions, ProcessPaymentCommand, ProcessPaymentHandler,
    ProcessPaymentResult,
};
pub use record_manual_payment::{RecordManualPaymentCommand, RecordManualPaymentHandler};
pub use refund_payment::{RefundPaymentCommand, RefundPaymentHandler, RefundPaymentResult};
