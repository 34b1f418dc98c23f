//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Axum REST API (storefront, admin, webhooks)
//! - `postgres` - PostgreSQL-backed storage, numbering and audit
//! - `memory` - In-memory storage for development and tests
//! - `gateways` - Payment gateways and webhook signature verification
//! - `audit` - Audit sinks that need no database
//! - `numbering` - Process-local order and invoice numbers

pub mod audit;
pub mod gateways;
pub mod http;
pub mod memory;
pub mod numbering;
pub mod postgres;

pub use audit::{RecordingAuditLog, TracingAuditLog};
pub use gateways::{HmacWebhookVerifier, MockPaymentGateway, RedirectGateway, StripeConfig, StripeGateway};
pub use memory::InMemorySalesStore;
pub use numbering::SequentialNumberGenerator;
pub use postgres::{PostgresAuditLog, PostgresNumberGenerator, PostgresSalesStore};
