//! Hosting packages and their bundled features.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    CategoryId, FeatureId, Money, PackageId, Percentage, Timestamp, ValidationError,
};

use super::slug::validate_slug;

/// How often a package is billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Annually,
    Biennial,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Annually => "annually",
            BillingCycle::Biennial => "biennial",
        }
    }
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingCycle {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(BillingCycle::Monthly),
            "annually" => Ok(BillingCycle::Annually),
            "biennial" => Ok(BillingCycle::Biennial),
            other => Err(ValidationError::invalid_format(
                "billing_cycle",
                format!("unknown billing cycle '{}'", other),
            )),
        }
    }
}

/// Pivot between a package and one of its features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageFeature {
    pub feature_id: FeatureId,
    /// Bundled quantity or choice, as entered by the admin.
    pub value: Option<String>,
    /// Price per unit of the customer's chosen quantity.
    pub price_modifier: Money,
    pub is_default: bool,
}

impl PackageFeature {
    pub fn new(feature_id: FeatureId, value: Option<String>, price_modifier: Money) -> Self {
        Self {
            feature_id,
            value,
            price_modifier,
            is_default: false,
        }
    }
}

/// A sellable hosting package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub base_price: Money,
    pub billing_cycle: BillingCycle,
    pub setup_fee: Money,
    pub is_popular: bool,
    pub is_active: bool,
    pub discount: Percentage,
    pub display_order: i32,
    pub max_renewals: Option<u32>,
    pub features: Vec<PackageFeature>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

/// Fields an admin supplies when creating or updating a package.
#[derive(Debug, Clone)]
pub struct PackageDraft {
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub base_price: Money,
    pub billing_cycle: BillingCycle,
    pub setup_fee: Money,
    pub is_popular: bool,
    pub is_active: bool,
    pub discount: Percentage,
    pub display_order: i32,
    pub max_renewals: Option<u32>,
    pub features: Vec<PackageFeature>,
}

impl PackageDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        validate_slug(&self.slug)?;
        if self.base_price.is_negative() {
            return Err(ValidationError::out_of_range("base_price", 0, "-", self.base_price));
        }
        if self.setup_fee.is_negative() {
            return Err(ValidationError::out_of_range("setup_fee", 0, "-", self.setup_fee));
        }
        let mut seen = HashSet::new();
        for pivot in &self.features {
            if !seen.insert(pivot.feature_id) {
                return Err(ValidationError::invalid_format(
                    "features",
                    format!("feature {} attached twice", pivot.feature_id),
                ));
            }
        }
        Ok(())
    }
}

impl Package {
    /// Creates a package from a validated draft.
    pub fn create(draft: PackageDraft) -> Result<Self, ValidationError> {
        draft.validate()?;
        let now = Timestamp::now();
        Ok(Self {
            id: PackageId::new(),
            category_id: draft.category_id,
            name: draft.name,
            slug: draft.slug,
            description: draft.description,
            base_price: draft.base_price,
            billing_cycle: draft.billing_cycle,
            setup_fee: draft.setup_fee,
            is_popular: draft.is_popular,
            is_active: draft.is_active,
            discount: draft.discount,
            display_order: draft.display_order,
            max_renewals: draft.max_renewals,
            features: draft.features,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Replaces every editable field, syncing the feature pivots.
    pub fn apply(&mut self, draft: PackageDraft) -> Result<(), ValidationError> {
        draft.validate()?;
        self.category_id = draft.category_id;
        self.name = draft.name;
        self.slug = draft.slug;
        self.description = draft.description;
        self.base_price = draft.base_price;
        self.billing_cycle = draft.billing_cycle;
        self.setup_fee = draft.setup_fee;
        self.is_popular = draft.is_popular;
        self.is_active = draft.is_active;
        self.discount = draft.discount;
        self.display_order = draft.display_order;
        self.max_renewals = draft.max_renewals;
        self.features = draft.features;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Pivot row for a feature, if the package bundles it.
    pub fn pivot(&self, feature_id: &FeatureId) -> Option<&PackageFeature> {
        self.features.iter().find(|p| &p.feature_id == feature_id)
    }

    /// Active and not deleted.
    pub fn is_purchasable(&self) -> bool {
        self.is_active && self.deleted_at.is_none()
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
        self.updated_at = Timestamp::now();
    }

    pub fn soft_delete(&mut self) {
        let now = Timestamp::now();
        self.deleted_at = Some(now);
        self.updated_at = now;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A monthly package priced 99.00 with no setup fee.
    pub fn package_with(features: Vec<PackageFeature>) -> Package {
        Package::create(PackageDraft {
            category_id: CategoryId::new(),
            name: "Business".to_string(),
            slug: "business".to_string(),
            description: None,
            base_price: Money::from_major(99),
            billing_cycle: BillingCycle::Monthly,
            setup_fee: Money::ZERO,
            is_popular: false,
            is_active: true,
            discount: Percentage::ZERO,
            display_order: 0,
            max_renewals: None,
            features,
        })
        .unwrap()
    }
}
