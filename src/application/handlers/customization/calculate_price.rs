//! CalculatePriceHandler - prices a customization without touching quotas.

use std::sync::Arc;

use crate::domain::customization::{
    calculate_price, validate_shape, CustomizationItem, PriceBreakdown, TaxRate,
};
use crate::domain::foundation::PackageId;
use crate::domain::SalesError;
use crate::ports::CatalogReader;

use super::resolve::{load_purchasable_package, resolve_all};

#[derive(Debug, Clone)]
pub struct CalculatePriceQuery {
    pub package_id: PackageId,
    pub customization: Vec<CustomizationItem>,
}

pub struct CalculatePriceHandler {
    catalog: Arc<dyn CatalogReader>,
    tax_rate: TaxRate,
}

impl CalculatePriceHandler {
    pub fn new(catalog: Arc<dyn CatalogReader>, tax_rate: TaxRate) -> Self {
        Self { catalog, tax_rate }
    }

    pub async fn handle(&self, query: CalculatePriceQuery) -> Result<PriceBreakdown, SalesError> {
        validate_shape(&query.customization)?;
        let package = load_purchasable_package(self.catalog.as_ref(), query.package_id).await?;
        let resolved = resolve_all(self.catalog.as_ref(), &query.customization).await?;

        let subtotal = calculate_price(&package, &resolved)?;
        Ok(PriceBreakdown::with_tax(subtotal, self.tax_rate)?)
    }
}
