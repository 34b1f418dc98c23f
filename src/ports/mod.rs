//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `CatalogReader` / `CatalogRepository` - categories, features, packages
//! - `LimitRepository` - per-user customization quota ledger
//! - `OrderRepository` - orders, created together with quota consumption
//! - `PaymentRepository` - payment attempts, saved together with order status
//! - `InvoiceRepository` - invoice snapshots
//!
//! ## External Service Ports
//!
//! - `PaymentGateway` - charge initiation
//! - `WebhookVerifier` - signed gateway callbacks
//! - `AuditLog` - write-only audit sink
//! - `NumberGenerator` - order and invoice numbers

mod audit_log;
mod catalog_repository;
mod invoice_repository;
mod limit_repository;
mod number_generator;
mod order_repository;
mod payment_gateway;
mod payment_repository;
mod webhook_verifier;

pub use audit_log::{AuditAction, AuditEntry, AuditLog};
pub use catalog_repository::{CatalogReader, CatalogRepository};
pub use invoice_repository::InvoiceRepository;
pub use limit_repository::LimitRepository;
pub use number_generator::{format_invoice_number, format_order_number, NumberGenerator};
pub use order_repository::{OrderFilter, OrderRepository, OrderStats, QuotaConsumption};
pub use payment_gateway::{ChargeOutcome, ChargeRequest, GatewayError, GatewayErrorCode, PaymentGateway};
pub use payment_repository::{GatewayTotals, PaymentFilter, PaymentRepository, PaymentStats};
pub use webhook_verifier::{GatewayEvent, WebhookVerifier};
