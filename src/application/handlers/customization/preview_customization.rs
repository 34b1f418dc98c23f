//! PreviewCustomizationHandler - the storefront "customize" step.
//!
//! Same checks as checkout, minus persistence: a quota violation fails
//! fast and reports the remaining capacity.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::catalog::BillingCycle;
use crate::domain::customization::{
    calculate_price, first_violation, validate_shape, CustomizationItem,
};
use crate::domain::foundation::{FeatureId, Money, PackageId, UserId};
use crate::domain::SalesError;
use crate::ports::{CatalogReader, LimitRepository};

use super::resolve::{limit_table, load_purchasable_package, resolve_all};

#[derive(Debug, Clone)]
pub struct PreviewCustomizationCommand {
    pub user_id: UserId,
    pub package_id: PackageId,
    pub customization: Vec<CustomizationItem>,
    /// Defaults to the package's own cycle.
    pub billing_cycle: Option<BillingCycle>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NormalizedChoice {
    pub feature_id: FeatureId,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomizationPreview {
    pub package_name: String,
    pub base_price: Money,
    pub setup_fee: Money,
    /// Pre-tax price.
    pub total_price: Money,
    pub billing_cycle: BillingCycle,
    pub customization: Vec<NormalizedChoice>,
}

pub struct PreviewCustomizationHandler {
    catalog: Arc<dyn CatalogReader>,
    limits: Arc<dyn LimitRepository>,
}

impl PreviewCustomizationHandler {
    pub fn new(catalog: Arc<dyn CatalogReader>, limits: Arc<dyn LimitRepository>) -> Self {
        Self { catalog, limits }
    }

    pub async fn handle(&self, cmd: PreviewCustomizationCommand) -> Result<CustomizationPreview, SalesError> {
        validate_shape(&cmd.customization)?;
        let package = load_purchasable_package(self.catalog.as_ref(), cmd.package_id).await?;
        let resolved = resolve_all(self.catalog.as_ref(), &cmd.customization).await?;

        let table = limit_table(self.limits.as_ref(), &cmd.user_id).await?;
        if let Some(violation) = first_violation(&table, &resolved) {
            tracing::debug!(
                user_id = %cmd.user_id,
                feature_id = %violation.feature_id,
                remaining = %violation.remaining,
                "Customization preview over quota"
            );
            return Err(violation.into());
        }

        let total_price = calculate_price(&package, &resolved)?;
        Ok(CustomizationPreview {
            package_name: package.name,
            base_price: package.base_price,
            setup_fee: package.setup_fee,
            total_price,
            billing_cycle: cmd.billing_cycle.unwrap_or(package.billing_cycle),
            customization: resolved
                .iter()
                .map(|r| NormalizedChoice {
                    feature_id: r.feature_id,
                    value: r.value.to_json(),
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_fixtures::{user, Fixture};
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn preview_prices_and_normalizes() {
        let fx = Fixture::new().await;
        let handler = PreviewCustomizationHandler::new(fx.store.clone(), fx.store.clone());

        let preview = handler
            .handle(PreviewCustomizationCommand {
                user_id: user("u1"),
                package_id: fx.package.id,
                customization: vec![CustomizationItem {
                    feature_id: fx.storage.id,
                    value: serde_json::json!("10"),
                }],
                billing_cycle: Some(BillingCycle::Annually),
            })
            .await
            .unwrap();

        assert_eq!(preview.package_name, "Business");
        assert_eq!(preview.total_price, Money::from_major(104));
        assert_eq!(preview.billing_cycle, BillingCycle::Annually);
        assert_eq!(preview.customization[0].value, serde_json::json!(10));
    }

    #[tokio::test]
    async fn over_quota_reports_remaining() {
        let fx = Fixture::new().await;
        let u = user("u1");
        fx.limit_storage(&u, 20, 15).await;
        let handler = PreviewCustomizationHandler::new(fx.store.clone(), fx.store.clone());

        let result = handler
            .handle(PreviewCustomizationCommand {
                user_id: u,
                package_id: fx.package.id,
                customization: vec![fx.storage_item(10)],
                billing_cycle: None,
            })
            .await;

        match result {
            Err(SalesError::LimitExceeded { remaining, .. }) => assert_eq!(remaining, Decimal::from(5)),
            other => panic!("expected LimitExceeded, got {:?}", other),
        }
    }
}
