//! Customization domain - feature values, quotas and pricing.
//!
//! Everything here is pure. The quota ledger's persistence and locking live
//! behind [`crate::ports::LimitRepository`].

mod limit;
mod pricing;
mod validator;
mod value;

pub use limit::{CustomizationLimit, LimitViolation};
pub use pricing::{calculate_price, PriceBreakdown, TaxRate};
pub use validator::{all_violations, first_violation, violation_message, LimitTable};
pub use value::{validate_shape, CustomizationItem, FeatureValue, ResolvedCustomization};
