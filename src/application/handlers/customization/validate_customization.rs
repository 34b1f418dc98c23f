//! ValidateCustomizationHandler - validate-only, collecting every problem.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::customization::{
    all_violations, validate_shape, violation_message, CustomizationItem,
};
use crate::domain::foundation::{PackageId, UserId};
use crate::domain::SalesError;
use crate::ports::{CatalogReader, LimitRepository};

use super::resolve::{features_for, limit_table, load_purchasable_package, resolve_item};

#[derive(Debug, Clone)]
pub struct ValidateCustomizationQuery {
    pub user_id: UserId,
    pub package_id: PackageId,
    pub customization: Vec<CustomizationItem>,
}

/// Per-index messages; empty when the selection is admissible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomizationValidation {
    pub valid: bool,
    pub errors: BTreeMap<usize, String>,
}

pub struct ValidateCustomizationHandler {
    catalog: Arc<dyn CatalogReader>,
    limits: Arc<dyn LimitRepository>,
}

impl ValidateCustomizationHandler {
    pub fn new(catalog: Arc<dyn CatalogReader>, limits: Arc<dyn LimitRepository>) -> Self {
        Self { catalog, limits }
    }

    pub async fn handle(&self, query: ValidateCustomizationQuery) -> Result<CustomizationValidation, SalesError> {
        validate_shape(&query.customization)?;
        load_purchasable_package(self.catalog.as_ref(), query.package_id).await?;

        let features = features_for(self.catalog.as_ref(), &query.customization).await?;
        let mut errors = BTreeMap::new();
        let mut indices = Vec::new();
        let mut resolved = Vec::new();
        for (idx, item) in query.customization.iter().enumerate() {
            match resolve_item(&features, idx, item) {
                Ok(r) => {
                    indices.push(idx);
                    resolved.push(r);
                }
                Err(e) => {
                    errors.insert(idx, e.message());
                }
            }
        }

        let table = limit_table(self.limits.as_ref(), &query.user_id).await?;
        for (pos, violation) in all_violations(&table, &resolved) {
            errors.insert(indices[pos], violation_message(&violation));
        }

        Ok(CustomizationValidation {
            valid: errors.is_empty(),
            errors,
        })
    }
}
