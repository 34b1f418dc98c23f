//! Hosting Sales - catalog, customization, checkout and payments for a
//! web hosting storefront.
//!
//! Customers pick a package, customize its features within their quota,
//! check out into an order and pay through one of several gateways.
//! Administrators manage the catalog, quotas, orders and refunds.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
