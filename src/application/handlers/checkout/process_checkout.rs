//! ProcessCheckoutHandler - turns a customized package into a pending order.
//!
//! Steps, in order:
//! 1. shape check (no store access)
//! 2. load the package and resolve every value against its feature
//! 3. quota check against the user's ledger, failing fast
//! 4. price and tax
//! 5. persist the order and consume quota in one storage transaction,
//!    which re-checks the ledger under its row locks
//! 6. retry with a fresh order number if the number was taken

use std::sync::Arc;

use serde::Serialize;

use crate::domain::catalog::BillingCycle;
use crate::domain::customization::{
    calculate_price, first_violation, validate_shape, CustomizationItem, PriceBreakdown, TaxRate,
};
use crate::domain::foundation::{ErrorCode, PackageId, Timestamp, UserId};
use crate::domain::ordering::Order;
use crate::domain::SalesError;
use crate::ports::{
    AuditAction, AuditEntry, AuditLog, CatalogReader, LimitRepository, NumberGenerator,
    OrderRepository, QuotaConsumption,
};

use crate::application::handlers::customization::resolve::{
    limit_table, load_purchasable_package, resolve_all,
};

/// Checkout tunables.
#[derive(Debug, Clone)]
pub struct CheckoutOptions {
    pub tax_rate: TaxRate,
    /// Attempts at a unique order number before giving up.
    pub order_number_attempts: u32,
    /// Orders are paid at `{payment_url_base}/{order_id}`.
    pub payment_url_base: String,
}

impl Default for CheckoutOptions {
    fn default() -> Self {
        Self {
            tax_rate: TaxRate::default(),
            order_number_attempts: 3,
            payment_url_base: "/api/payment".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessCheckoutCommand {
    pub user_id: UserId,
    pub package_id: PackageId,
    pub customization: Vec<CustomizationItem>,
    /// Defaults to the package's own cycle.
    pub billing_cycle: Option<BillingCycle>,
    pub custom_fields: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessCheckoutResult {
    pub order: Order,
    pub payment_url: String,
}

pub struct ProcessCheckoutHandler {
    catalog: Arc<dyn CatalogReader>,
    limits: Arc<dyn LimitRepository>,
    orders: Arc<dyn OrderRepository>,
    numbers: Arc<dyn NumberGenerator>,
    audit: Arc<dyn AuditLog>,
    options: CheckoutOptions,
}

impl ProcessCheckoutHandler {
    pub fn new(
        catalog: Arc<dyn CatalogReader>,
        limits: Arc<dyn LimitRepository>,
        orders: Arc<dyn OrderRepository>,
        numbers: Arc<dyn NumberGenerator>,
        audit: Arc<dyn AuditLog>,
        options: CheckoutOptions,
    ) -> Self {
        Self {
            catalog,
            limits,
            orders,
            numbers,
            audit,
            options,
        }
    }

    pub async fn handle(&self, cmd: ProcessCheckoutCommand) -> Result<ProcessCheckoutResult, SalesError> {
        // 1. Shape
        validate_shape(&cmd.customization)?;

        // 2. Package and typed values
        let package = load_purchasable_package(self.catalog.as_ref(), cmd.package_id).await?;
        let resolved = resolve_all(self.catalog.as_ref(), &cmd.customization).await?;

        // 3. Quota, first violation wins
        let table = limit_table(self.limits.as_ref(), &cmd.user_id).await?;
        if let Some(violation) = first_violation(&table, &resolved) {
            tracing::info!(
                user_id = %cmd.user_id,
                feature_id = %violation.feature_id,
                requested = %violation.requested,
                remaining = %violation.remaining,
                "Checkout rejected: customization limit exceeded"
            );
            return Err(violation.into());
        }

        // 4. Price
        let subtotal = calculate_price(&package, &resolved)?;
        let price = PriceBreakdown::with_tax(subtotal, self.options.tax_rate)?;

        // 5 + 6. Persist with quota consumption, retrying number collisions
        let consumption: Vec<QuotaConsumption> = resolved
            .iter()
            .map(|r| QuotaConsumption {
                feature_id: r.feature_id,
                amount: r.value.quantity(),
            })
            .filter(|c| !c.amount.is_zero())
            .collect();
        let billing_cycle = cmd.billing_cycle.unwrap_or(package.billing_cycle);

        let attempts = self.options.order_number_attempts.max(1);
        let mut attempt = 0;
        let order = loop {
            attempt += 1;
            let number = self.numbers.next_order_number(Timestamp::now()).await?;
            let order = Order::place(
                cmd.user_id.clone(),
                package.id,
                number,
                &resolved,
                price,
                billing_cycle,
                cmd.custom_fields.clone(),
            );

            match self.orders.create_with_consumption(&order, &consumption).await {
                Ok(()) => break order,
                Err(e) if e.code == ErrorCode::Conflict && attempt < attempts => {
                    tracing::warn!(
                        order_number = %order.order_number,
                        attempt,
                        "Order number collision, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        };

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            user_id = %order.user_id,
            total = %order.total_amount,
            "Order placed"
        );
        self.audit.record(
            AuditEntry::new(AuditAction::Create, "Order", order.id, serde_json::json!(order))
                .by(&order.user_id),
        );

        let payment_url = format!(
            "{}/{}",
            self.options.payment_url_base.trim_end_matches('/'),
            order.id
        );
        Ok(ProcessCheckoutResult { order, payment_url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::numbering::SequentialNumberGenerator;
    use crate::application::handlers::test_fixtures::{user, Fixture};
    use crate::domain::foundation::{DomainError, Money};
    use crate::domain::ordering::OrderStatus;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    // ════════════════════════════════════════════════════════════════════════════
    // Mock Implementations
    // ════════════════════════════════════════════════════════════════════════════

    /// Always hands out the same number first, then fresh ones.
    struct CollidingNumbers {
        issued: Mutex<u32>,
    }

    #[async_trait]
    impl NumberGenerator for CollidingNumbers {
        async fn next_order_number(&self, _at: Timestamp) -> Result<String, DomainError> {
            let mut issued = self.issued.lock().unwrap();
            *issued += 1;
            Ok(if *issued <= 2 {
                "2024010100001".to_string()
            } else {
                format!("20240101{:05}", *issued)
            })
        }

        async fn next_invoice_number(&self, _at: Timestamp) -> Result<String, DomainError> {
            unreachable!("checkout never issues invoices")
        }
    }

    fn handler(fx: &Fixture, numbers: Arc<dyn NumberGenerator>) -> ProcessCheckoutHandler {
        ProcessCheckoutHandler::new(
            fx.store.clone(),
            fx.store.clone(),
            fx.store.clone(),
            numbers,
            fx.audit.clone(),
            CheckoutOptions::default(),
        )
    }

    fn command(fx: &Fixture, user_id: &UserId, gb: i64) -> ProcessCheckoutCommand {
        ProcessCheckoutCommand {
            user_id: user_id.clone(),
            package_id: fx.package.id,
            customization: vec![fx.storage_item(gb)],
            billing_cycle: None,
            custom_fields: serde_json::json!({"domain": "example.com"}),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn places_pending_order_and_consumes_quota() {
        let fx = Fixture::new().await;
        let u = user("u1");
        fx.limit_storage(&u, 50, 0).await;

        let result = handler(&fx, Arc::new(SequentialNumberGenerator::new()))
            .handle(command(&fx, &u, 10))
            .await
            .unwrap();

        assert_eq!(result.order.status, OrderStatus::Pending);
        assert_eq!(result.order.subtotal, Money::from_cents(10400));
        assert_eq!(result.order.tax_amount, Money::from_cents(1560));
        assert_eq!(result.order.total_amount, Money::from_cents(11960));
        assert_eq!(result.payment_url, format!("/api/payment/{}", result.order.id));

        let limit = fx.store.get_limit(&u, &fx.storage.id).await.unwrap().unwrap();
        assert_eq!(limit.current_value, Decimal::from(10));
        assert_eq!(fx.audit.entries()[0].entity_type, "Order");
    }

    #[tokio::test]
    async fn over_quota_fails_fast_without_writes() {
        let fx = Fixture::new().await;
        let u = user("u1");
        fx.limit_storage(&u, 5, 0).await;

        let result = handler(&fx, Arc::new(SequentialNumberGenerator::new()))
            .handle(command(&fx, &u, 10))
            .await;

        assert!(matches!(result, Err(SalesError::LimitExceeded { .. })));
        assert_eq!(fx.store.order_count(), 0);
        assert!(fx.audit.entries().is_empty());
    }

    #[tokio::test]
    async fn duplicate_feature_is_rejected_before_lookup() {
        let fx = Fixture::new().await;
        let mut cmd = command(&fx, &user("u1"), 1);
        cmd.customization.push(fx.storage_item(2));

        let result = handler(&fx, Arc::new(SequentialNumberGenerator::new())).handle(cmd).await;

        assert!(matches!(result, Err(SalesError::ValidationFailed { .. })));
    }

    #[tokio::test]
    async fn number_collision_is_retried() {
        let fx = Fixture::new().await;
        let numbers = Arc::new(CollidingNumbers {
            issued: Mutex::new(0),
        });
        let h = handler(&fx, numbers);

        let first = h.handle(command(&fx, &user("u1"), 1)).await.unwrap();
        let second = h.handle(command(&fx, &user("u2"), 1)).await.unwrap();

        assert_eq!(first.order.order_number, "2024010100001");
        assert_eq!(second.order.order_number, "2024010100003");
        assert_eq!(fx.store.order_count(), 2);
    }

    #[tokio::test]
    async fn unknown_package_is_not_found() {
        let fx = Fixture::new().await;
        let mut cmd = command(&fx, &user("u1"), 1);
        cmd.package_id = PackageId::new();

        let result = handler(&fx, Arc::new(SequentialNumberGenerator::new())).handle(cmd).await;

        assert!(matches!(result, Err(SalesError::NotFound { resource: "package", .. })));
    }
}
