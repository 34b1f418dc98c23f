//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, money, timestamps, errors)
//! - `catalog` - Categories, features and packages
//! - `customization` - Feature values, quotas, pricing and validation
//! - `ordering` - Orders, payments and invoices with their state machines

pub mod catalog;
pub mod customization;
mod errors;
pub mod foundation;
pub mod ordering;

pub use errors::SalesError;
