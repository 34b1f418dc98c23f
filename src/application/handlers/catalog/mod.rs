//! Catalog handlers.
//!
//! ## Queries
//! - Active packages grouped by category (storefront) or everything (admin)
//! - One package with its bundled features
//! - Feature listing (admin)
//!
//! ## Commands
//! - Category, feature and package create / update / soft delete
//! - Bulk package activate / deactivate / delete

mod get_package;
mod list_packages;
mod manage_categories;
mod manage_features;
mod manage_packages;

// Queries
pub use get_package::{BundledFeature, GetPackageHandler, GetPackageQuery, PackageDetails};
pub use list_packages::{CategoryPackages, ListPackagesHandler, ListPackagesQuery};
pub use manage_features::ListFeaturesHandler;

// Commands
pub use manage_categories::{
    CategoryFields, CreateCategoryCommand, CreateCategoryHandler, DeleteCategoryCommand,
    DeleteCategoryHandler, UpdateCategoryCommand, UpdateCategoryHandler,
};
pub use manage_features::{
    CreateFeatureCommand, CreateFeatureHandler, DeleteFeatureCommand, DeleteFeatureHandler,
    UpdateFeatureCommand, UpdateFeatureHandler,
};
pub use manage_packages::{
    BulkPackageAction, BulkPackageActionCommand, BulkPackageActionHandler, BulkPackageActionResult,
    CreatePackageCommand, CreatePackageHandler, DeletePackageCommand, DeletePackageHandler,
    UpdatePackageCommand, UpdatePackageHandler,
};
