//! Ordering domain - orders, payment attempts and invoices.
//!
//! # Lifecycles
//!
//! ```text
//! Order:   pending ─┬─> processing ─┬─> completed
//!                   │               ├─> failed ──> cancelled
//!                   ├───────────────┴─> cancelled
//!                   └─> completed / failed
//!
//! Payment: pending ─┬─> authorized ─┬─> captured ──> refunded
//!                   │               ├─> refunded
//!                   │               └─> failed
//!                   ├─> captured
//!                   └─> failed
//! ```

mod invoice;
mod order;
mod payment;

pub use invoice::{Invoice, InvoiceStatus, LineItem};
pub use order::{Order, OrderStatus};
pub use payment::{Gateway, Payment, PaymentStatus};

#[cfg(test)]
pub(crate) use order::test_support;
