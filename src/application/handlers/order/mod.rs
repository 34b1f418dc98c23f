//! Order administration handlers.
//!
//! ## Commands
//! - Cancel an open order
//! - Generate (or return the existing) invoice
//!
//! ## Queries
//! - Filtered listing with status counts
//! - One order with its payments and invoices

mod cancel_order;
mod generate_invoice;
mod order_queries;

pub use cancel_order::{CancelOrderCommand, CancelOrderHandler};
pub use generate_invoice::{
    GenerateInvoiceCommand, GenerateInvoiceHandler, GenerateInvoiceResult, InvoiceOptions,
};
pub use order_queries::{GetOrderHandler, ListOrdersHandler, OrderDetails, OrderListing};
