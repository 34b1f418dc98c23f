//! Catalog ports.
//!
//! Split into a read side used by storefront, pricing and checkout, and a
//! write side used only by admin handlers.
//!
//! # Visibility
//!
//! Single-entity lookups never return soft-deleted rows. Listing
//! operations document their own filtering.

use async_trait::async_trait;

use crate::domain::catalog::{Category, Feature, Package, PackageFeature};
use crate::domain::foundation::{CategoryId, DomainError, FeatureId, PackageId};

/// Read-only access to the catalog.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Find a package, with its feature pivots.
    async fn get_package(&self, id: &PackageId) -> Result<Option<Package>, DomainError>;

    /// Find one pivot row.
    async fn get_package_feature(
        &self,
        package_id: &PackageId,
        feature_id: &FeatureId,
    ) -> Result<Option<PackageFeature>, DomainError>;

    async fn get_feature(&self, id: &FeatureId) -> Result<Option<Feature>, DomainError>;

    /// Fetch several features at once. Missing ids are skipped.
    async fn get_features(&self, ids: &[FeatureId]) -> Result<Vec<Feature>, DomainError>;

    async fn get_category(&self, id: &CategoryId) -> Result<Option<Category>, DomainError>;

    /// Categories that are not deleted, by display order.
    async fn list_categories(&self) -> Result<Vec<Category>, DomainError>;

    /// Features that are not deleted, by display order.
    async fn list_features(&self) -> Result<Vec<Feature>, DomainError>;

    /// Packages that are not deleted, by display order.
    ///
    /// With `active_only`, inactive packages are skipped too.
    async fn list_packages(&self, active_only: bool) -> Result<Vec<Package>, DomainError>;
}

/// Write access for catalog administration.
///
/// Soft deletes are expressed by saving the entity with `deleted_at` set.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// # Errors
    ///
    /// - `Conflict` if the slug is taken
    async fn save_category(&self, category: &Category) -> Result<(), DomainError>;

    async fn update_category(&self, category: &Category) -> Result<(), DomainError>;

    /// # Errors
    ///
    /// - `Conflict` if the slug is taken within the category
    async fn save_feature(&self, feature: &Feature) -> Result<(), DomainError>;

    async fn update_feature(&self, feature: &Feature) -> Result<(), DomainError>;

    /// Inserts the package and its pivots in one unit.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the slug is taken
    async fn save_package(&self, package: &Package) -> Result<(), DomainError>;

    /// Updates the package and replaces its pivots in one unit.
    async fn update_package(&self, package: &Package) -> Result<(), DomainError>;
}
