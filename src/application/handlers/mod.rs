//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations. Each
//! handler takes its ports as `Arc<dyn Port>` and exposes a single async
//! `handle` method.

pub mod catalog;
pub mod checkout;
pub mod customization;
pub mod order;
pub mod payment;

#[cfg(test)]
pub(crate) mod test_fixtures;
