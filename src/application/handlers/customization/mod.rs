//! Customization handlers.
//!
//! ## Queries
//! - Price a selection (subtotal, tax, total)
//! - Validate a selection, collecting every problem by request index
//! - List a user's limits
//!
//! ## Commands
//! - Preview ("customize"), failing fast on quota
//! - Set, remove and bulk-set customization limits

mod calculate_price;
mod manage_limits;
mod preview_customization;
pub(crate) mod resolve;
mod validate_customization;

pub use calculate_price::{CalculatePriceHandler, CalculatePriceQuery};
pub use manage_limits::{
    BulkSetLimitsCommand, BulkSetLimitsHandler, BulkSetLimitsResult, ListLimitsHandler,
    RemoveLimitCommand, RemoveLimitHandler, SetLimitCommand, SetLimitHandler,
};
pub use preview_customization::{
    CustomizationPreview, NormalizedChoice, PreviewCustomizationCommand, PreviewCustomizationHandler,
};
pub use validate_customization::{
    CustomizationValidation, ValidateCustomizationHandler, ValidateCustomizationQuery,
};
