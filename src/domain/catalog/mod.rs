//! Catalog domain - categories, features and packages.
//!
//! Read-mostly reference data. Admin operations mutate it; the pricing
//! and checkout paths only read it.

mod category;
mod feature;
mod package;
mod slug;

pub use category::Category;
pub use feature::{Feature, FeatureDraft, FeatureKind};
pub use package::{BillingCycle, Package, PackageDraft, PackageFeature};
pub use slug::{slugify, validate_slug};

#[cfg(test)]
pub(crate) use package::test_support;
