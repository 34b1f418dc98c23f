//! Catalog ports over the in-memory tables.

use async_trait::async_trait;

use crate::domain::catalog::{Category, Feature, Package, PackageFeature};
use crate::domain::foundation::{CategoryId, DomainError, ErrorCode, FeatureId, PackageId};
use crate::ports::{CatalogReader, CatalogRepository};

use super::{not_found, InMemorySalesStore};

#[async_trait]
impl CatalogReader for InMemorySalesStore {
    async fn get_package(&self, id: &PackageId) -> Result<Option<Package>, DomainError> {
        let tables = self.tables()?;
        Ok(tables.packages.get(id).filter(|p| p.deleted_at.is_none()).cloned())
    }

    async fn get_package_feature(
        &self,
        package_id: &PackageId,
        feature_id: &FeatureId,
    ) -> Result<Option<PackageFeature>, DomainError> {
        let tables = self.tables()?;
        Ok(tables
            .packages
            .get(package_id)
            .filter(|p| p.deleted_at.is_none())
            .and_then(|p| p.pivot(feature_id).cloned()))
    }

    async fn get_feature(&self, id: &FeatureId) -> Result<Option<Feature>, DomainError> {
        let tables = self.tables()?;
        Ok(tables.features.get(id).filter(|f| f.deleted_at.is_none()).cloned())
    }

    async fn get_features(&self, ids: &[FeatureId]) -> Result<Vec<Feature>, DomainError> {
        let tables = self.tables()?;
        Ok(ids
            .iter()
            .filter_map(|id| tables.features.get(id))
            .filter(|f| f.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn get_category(&self, id: &CategoryId) -> Result<Option<Category>, DomainError> {
        let tables = self.tables()?;
        Ok(tables.categories.get(id).filter(|c| c.deleted_at.is_none()).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, DomainError> {
        let tables = self.tables()?;
        let mut categories: Vec<_> = tables
            .categories
            .values()
            .filter(|c| c.deleted_at.is_none())
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.display_order.cmp(&b.display_order).then(a.name.cmp(&b.name)));
        Ok(categories)
    }

    async fn list_features(&self) -> Result<Vec<Feature>, DomainError> {
        let tables = self.tables()?;
        let mut features: Vec<_> = tables
            .features
            .values()
            .filter(|f| f.deleted_at.is_none())
            .cloned()
            .collect();
        features.sort_by(|a, b| a.display_order.cmp(&b.display_order).then(a.name.cmp(&b.name)));
        Ok(features)
    }

    async fn list_packages(&self, active_only: bool) -> Result<Vec<Package>, DomainError> {
        let tables = self.tables()?;
        let mut packages: Vec<_> = tables
            .packages
            .values()
            .filter(|p| p.deleted_at.is_none() && (!active_only || p.is_active))
            .cloned()
            .collect();
        packages.sort_by(|a, b| a.display_order.cmp(&b.display_order).then(a.name.cmp(&b.name)));
        Ok(packages)
    }
}

#[async_trait]
impl CatalogRepository for InMemorySalesStore {
    async fn save_category(&self, category: &Category) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        if tables.categories.values().any(|c| c.slug == category.slug) {
            return Err(DomainError::conflict(format!("category slug '{}' is taken", category.slug)));
        }
        tables.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        if tables
            .categories
            .values()
            .any(|c| c.slug == category.slug && c.id != category.id)
        {
            return Err(DomainError::conflict(format!("category slug '{}' is taken", category.slug)));
        }
        match tables.categories.get_mut(&category.id) {
            Some(existing) => {
                *existing = category.clone();
                Ok(())
            }
            None => Err(not_found(ErrorCode::CategoryNotFound, category.id)),
        }
    }

    async fn save_feature(&self, feature: &Feature) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        if tables
            .features
            .values()
            .any(|f| f.category_id == feature.category_id && f.slug == feature.slug)
        {
            return Err(DomainError::conflict(format!("feature slug '{}' is taken", feature.slug)));
        }
        tables.features.insert(feature.id, feature.clone());
        Ok(())
    }

    async fn update_feature(&self, feature: &Feature) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        if tables.features.values().any(|f| {
            f.category_id == feature.category_id && f.slug == feature.slug && f.id != feature.id
        }) {
            return Err(DomainError::conflict(format!("feature slug '{}' is taken", feature.slug)));
        }
        match tables.features.get_mut(&feature.id) {
            Some(existing) => {
                *existing = feature.clone();
                Ok(())
            }
            None => Err(not_found(ErrorCode::FeatureNotFound, feature.id)),
        }
    }

    async fn save_package(&self, package: &Package) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        if tables.packages.values().any(|p| p.slug == package.slug) {
            return Err(DomainError::conflict(format!("package slug '{}' is taken", package.slug)));
        }
        tables.packages.insert(package.id, package.clone());
        Ok(())
    }

    async fn update_package(&self, package: &Package) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        if tables
            .packages
            .values()
            .any(|p| p.slug == package.slug && p.id != package.id)
        {
            return Err(DomainError::conflict(format!("package slug '{}' is taken", package.slug)));
        }
        match tables.packages.get_mut(&package.id) {
            Some(existing) => {
                *existing = package.clone();
                Ok(())
            }
            None => Err(not_found(ErrorCode::PackageNotFound, package.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::test_support::package_with;

    #[tokio::test]
    async fn duplicate_package_slug_is_a_conflict() {
        let store = InMemorySalesStore::new();
        let first = package_with(vec![]);
        store.save_package(&first).await.unwrap();

        let second = package_with(vec![]);
        let err = store.save_package(&second).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn soft_deleted_package_is_hidden() {
        let store = InMemorySalesStore::new();
        let mut pkg = package_with(vec![]);
        store.save_package(&pkg).await.unwrap();
        pkg.soft_delete();
        store.update_package(&pkg).await.unwrap();

        assert!(store.get_package(&pkg.id).await.unwrap().is_none());
        assert!(store.list_packages(false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn active_only_listing_skips_inactive() {
        let store = InMemorySalesStore::new();
        let mut pkg = package_with(vec![]);
        pkg.set_active(false);
        store.save_package(&pkg).await.unwrap();

        assert!(store.list_packages(true).await.unwrap().is_empty());
        assert_eq!(store.list_packages(false).await.unwrap().len(), 1);
    }
}
