//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Write paths (checkout, payments, admin mutations) and read paths
//! (catalog listing, stats) live in separate handlers.

pub mod handlers;
mod order_locks;

pub use order_locks::OrderLocks;
