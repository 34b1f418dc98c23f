//! Loading and resolving a customization request against the catalog.

use crate::domain::catalog::{Feature, Package};
use crate::domain::customization::{
    CustomizationItem, FeatureValue, LimitTable, ResolvedCustomization,
};
use crate::domain::foundation::{PackageId, UserId};
use crate::domain::SalesError;
use crate::ports::{CatalogReader, LimitRepository};

/// Active, non-deleted package or `NotFound`.
pub(crate) async fn load_purchasable_package(
    catalog: &dyn CatalogReader,
    package_id: PackageId,
) -> Result<Package, SalesError> {
    catalog
        .get_package(&package_id)
        .await?
        .filter(Package::is_purchasable)
        .ok_or_else(|| SalesError::not_found("package", package_id))
}

/// Fetches the features a request names.
pub(crate) async fn features_for(
    catalog: &dyn CatalogReader,
    items: &[CustomizationItem],
) -> Result<Vec<Feature>, SalesError> {
    let ids: Vec<_> = items.iter().map(|i| i.feature_id).collect();
    Ok(catalog.get_features(&ids).await?)
}

/// Resolves one entry; the error is field-scoped to its request index.
pub(crate) fn resolve_item(
    features: &[Feature],
    idx: usize,
    item: &CustomizationItem,
) -> Result<ResolvedCustomization, SalesError> {
    let feature = features
        .iter()
        .find(|f| f.id == item.feature_id && f.accepts_customization())
        .ok_or_else(|| {
            SalesError::validation(
                format!("customization.{}.feature_id", idx),
                "feature is unknown or not customizable",
            )
        })?;
    let value = FeatureValue::resolve(&feature.kind, &item.value)
        .map_err(|e| SalesError::validation(format!("customization.{}.value", idx), e.to_string()))?;
    Ok(ResolvedCustomization {
        feature_id: item.feature_id,
        value,
    })
}

/// Resolves every entry, stopping at the first bad one.
pub(crate) async fn resolve_all(
    catalog: &dyn CatalogReader,
    items: &[CustomizationItem],
) -> Result<Vec<ResolvedCustomization>, SalesError> {
    let features = features_for(catalog, items).await?;
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| resolve_item(&features, idx, item))
        .collect()
}

/// The user's quota rows keyed by feature.
pub(crate) async fn limit_table(
    limits: &dyn LimitRepository,
    user_id: &UserId,
) -> Result<LimitTable, SalesError> {
    Ok(limits
        .list_for_user(user_id)
        .await?
        .into_iter()
        .map(|l| (l.feature_id, l))
        .collect())
}
