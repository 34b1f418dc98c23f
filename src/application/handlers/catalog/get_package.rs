//! GetPackageHandler - Query handler for one package with its features.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::catalog::{Category, Feature, Package};
use crate::domain::foundation::{Money, PackageId};
use crate::domain::SalesError;
use crate::ports::CatalogReader;

#[derive(Debug, Clone)]
pub struct GetPackageQuery {
    pub package_id: PackageId,
    /// Admin view; otherwise the package must be purchasable.
    pub include_inactive: bool,
}

/// A feature as bundled by one package.
#[derive(Debug, Clone, Serialize)]
pub struct BundledFeature {
    pub feature: Feature,
    pub value: Option<String>,
    pub price_modifier: Money,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageDetails {
    pub package: Package,
    pub category: Option<Category>,
    pub features: Vec<BundledFeature>,
}

pub struct GetPackageHandler {
    catalog: Arc<dyn CatalogReader>,
}

impl GetPackageHandler {
    pub fn new(catalog: Arc<dyn CatalogReader>) -> Self {
        Self { catalog }
    }

    pub async fn handle(&self, query: GetPackageQuery) -> Result<PackageDetails, SalesError> {
        let package = self
            .catalog
            .get_package(&query.package_id)
            .await?
            .filter(|p| query.include_inactive || p.is_purchasable())
            .ok_or_else(|| SalesError::not_found("package", query.package_id))?;

        let category = self.catalog.get_category(&package.category_id).await?;

        let ids: Vec<_> = package.features.iter().map(|p| p.feature_id).collect();
        let features = self.catalog.get_features(&ids).await?;

        // Keep the package's pivot order; skip features deleted since.
        let mut bundled: Vec<BundledFeature> = package
            .features
            .iter()
            .filter_map(|pivot| {
                let feature = features.iter().find(|f| f.id == pivot.feature_id)?;
                Some(BundledFeature {
                    feature: feature.clone(),
                    value: pivot.value.clone(),
                    price_modifier: pivot.price_modifier,
                    is_default: pivot.is_default,
                })
            })
            .collect();
        bundled.sort_by_key(|b| b.feature.display_order);

        Ok(PackageDetails {
            package,
            category,
            features: bundled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_fixtures::Fixture;
    use crate::ports::CatalogRepository;

    #[tokio::test]
    async fn returns_package_with_bundled_features() {
        let fx = Fixture::new().await;
        let handler = GetPackageHandler::new(fx.store.clone());

        let details = handler
            .handle(GetPackageQuery {
                package_id: fx.package.id,
                include_inactive: false,
            })
            .await
            .unwrap();

        assert_eq!(details.package.name, "Business");
        assert_eq!(details.features.len(), 2);
        assert_eq!(details.category.unwrap().slug, "shared-hosting");
    }

    #[tokio::test]
    async fn inactive_package_is_not_found_on_storefront() {
        let fx = Fixture::new().await;
        let mut package = fx.package.clone();
        package.set_active(false);
        fx.store.update_package(&package).await.unwrap();

        let result = GetPackageHandler::new(fx.store.clone())
            .handle(GetPackageQuery {
                package_id: fx.package.id,
                include_inactive: false,
            })
            .await;

        assert!(matches!(result, Err(SalesError::NotFound { resource: "package", .. })));
    }
}
