//! In-memory storage adapter.
//!
//! One [`InMemorySalesStore`] implements every repository port over a single
//! set of tables guarded by one `Mutex`. Each port call takes the lock once,
//! so multi-table writes (order + quota, payment + order) are atomic and
//! quota check-then-increment is serialized.
//!
//! Useful for:
//! - Development without PostgreSQL
//! - Handler and integration tests
//!
//! Does not persist across restarts.

mod catalog;
mod ledger;
mod payments;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::domain::catalog::{Category, Feature, Package};
use crate::domain::customization::CustomizationLimit;
use crate::domain::foundation::{
    CategoryId, DomainError, ErrorCode, FeatureId, InvoiceId, LimitId, OrderId, PackageId,
    PaymentId,
};
use crate::domain::ordering::{Invoice, Order, Payment};

#[derive(Default)]
struct Tables {
    categories: HashMap<CategoryId, Category>,
    features: HashMap<FeatureId, Feature>,
    packages: HashMap<PackageId, Package>,
    limits: HashMap<LimitId, CustomizationLimit>,
    orders: HashMap<OrderId, Order>,
    payments: HashMap<PaymentId, Payment>,
    invoices: HashMap<InvoiceId, Invoice>,
}

/// In-memory implementation of all storage ports.
#[derive(Default)]
pub struct InMemorySalesStore {
    tables: Mutex<Tables>,
}

impl InMemorySalesStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, DomainError> {
        self.tables
            .lock()
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "in-memory store lock poisoned"))
    }

    /// Number of stored orders, including soft-deleted ones.
    pub fn order_count(&self) -> usize {
        self.tables().map(|t| t.orders.len()).unwrap_or(0)
    }

    /// Number of stored payment attempts.
    pub fn payment_count(&self) -> usize {
        self.tables().map(|t| t.payments.len()).unwrap_or(0)
    }
}

fn not_found(code: ErrorCode, id: impl ToString) -> DomainError {
    let id = id.to_string();
    DomainError::new(code, format!("{} not found", id)).with_detail("id", id)
}
