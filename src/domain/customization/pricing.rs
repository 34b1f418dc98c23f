//! Pricing engine.
//!
//! `price = base_price + setup_fee + Σ price_modifier × quantity` over the
//! features the package bundles. Features the package does not bundle
//! contribute nothing. Summation happens in exact decimals and is rounded
//! once at the end.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::Package;
use crate::domain::foundation::{Money, ValidationError};

use super::ResolvedCustomization;

/// Prices a package with the given customization.
///
/// Pure and order-independent over `customization`.
pub fn calculate_price(
    package: &Package,
    customization: &[ResolvedCustomization],
) -> Result<Money, ValidationError> {
    let overflow =
        |quantity: Decimal| ValidationError::out_of_range("value", 0, "a payable amount", quantity);

    let mut total = package.base_price.to_decimal() + package.setup_fee.to_decimal();
    for item in customization {
        if let Some(pivot) = package.pivot(&item.feature_id) {
            let quantity = item.value.quantity();
            total = pivot
                .price_modifier
                .to_decimal()
                .checked_mul(quantity)
                .and_then(|line| total.checked_add(line))
                .ok_or_else(|| overflow(quantity))?;
        }
    }
    Money::from_decimal(total)
}

/// Sales tax rate as a fraction (0.15 = 15%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct TaxRate(Decimal);

impl TaxRate {
    pub fn new(rate: Decimal) -> Result<Self, ValidationError> {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(ValidationError::out_of_range("tax_rate", 0, 1, rate));
        }
        Ok(Self(rate))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        Self(Decimal::new(15, 2))
    }
}

impl TryFrom<Decimal> for TaxRate {
    type Error = ValidationError;

    fn try_from(rate: Decimal) -> Result<Self, Self::Error> {
        Self::new(rate)
    }
}

impl From<TaxRate> for Decimal {
    fn from(rate: TaxRate) -> Decimal {
        rate.0
    }
}

/// Subtotal, tax and total for one priced selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
}

impl PriceBreakdown {
    /// Applies tax to a subtotal; tax is rounded on its own.
    pub fn with_tax(subtotal: Money, rate: TaxRate) -> Result<Self, ValidationError> {
        let tax_amount = subtotal.times(rate.as_decimal())?;
        Ok(Self {
            subtotal,
            tax_amount,
            total_amount: subtotal.checked_add(tax_amount)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::test_support::package_with;
    use crate::domain::catalog::PackageFeature;
    use crate::domain::customization::FeatureValue;
    use crate::domain::foundation::FeatureId;
    use proptest::prelude::*;

    fn qty(feature_id: FeatureId, n: Decimal) -> ResolvedCustomization {
        ResolvedCustomization {
            feature_id,
            value: FeatureValue::Quantity(n),
        }
    }

    #[test]
    fn ten_units_at_half_price_on_99_package() {
        let disk = FeatureId::new();
        let pkg = package_with(vec![PackageFeature::new(disk, Some("10".into()), Money::from_cents(50))]);

        let subtotal = calculate_price(&pkg, &[qty(disk, Decimal::from(10))]).unwrap();
        let breakdown = PriceBreakdown::with_tax(subtotal, TaxRate::default()).unwrap();

        assert_eq!(breakdown.subtotal, Money::from_cents(10400));
        assert_eq!(breakdown.tax_amount, Money::from_cents(1560));
        assert_eq!(breakdown.total_amount, Money::from_cents(11960));
    }

    #[test]
    fn includes_setup_fee() {
        let mut pkg = package_with(vec![]);
        pkg.setup_fee = Money::from_major(10);
        assert_eq!(calculate_price(&pkg, &[]).unwrap(), Money::from_major(109));
    }

    #[test]
    fn unbundled_features_are_ignored() {
        let pkg = package_with(vec![]);
        let price = calculate_price(&pkg, &[qty(FeatureId::new(), Decimal::from(1000))]).unwrap();
        assert_eq!(price, Money::from_major(99));
    }

    #[test]
    fn flags_and_choices_price_as_one_unit() {
        let ssl = FeatureId::new();
        let panel = FeatureId::new();
        let pkg = package_with(vec![
            PackageFeature::new(ssl, None, Money::from_major(5)),
            PackageFeature::new(panel, None, Money::from_major(3)),
        ]);
        let items = vec![
            ResolvedCustomization { feature_id: ssl, value: FeatureValue::Flag(true) },
            ResolvedCustomization { feature_id: panel, value: FeatureValue::Choice("cPanel".into()) },
        ];
        assert_eq!(calculate_price(&pkg, &items).unwrap(), Money::from_major(107));

        let off = vec![ResolvedCustomization { feature_id: ssl, value: FeatureValue::Flag(false) }];
        assert_eq!(calculate_price(&pkg, &off).unwrap(), Money::from_major(99));
    }

    #[test]
    fn rounds_once_at_the_end() {
        let f = FeatureId::new();
        let pkg = package_with(vec![PackageFeature::new(f, None, Money::from_cents(1))]);
        // 0.01 × 0.5 = 0.005 rounds up to 0.01 only once
        let price = calculate_price(&pkg, &[qty(f, Decimal::new(5, 1))]).unwrap();
        assert_eq!(price, Money::from_cents(9901));
    }

    #[test]
    fn huge_quantity_is_rejected_instead_of_overflowing() {
        let f = FeatureId::new();
        let pkg = package_with(vec![PackageFeature::new(f, None, Money::from_major(5))]);

        let err = calculate_price(&pkg, &[qty(f, Decimal::MAX)]).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { ref field, .. } if field == "value"));
    }

    #[test]
    fn subtotal_past_the_cent_range_is_rejected() {
        let f = FeatureId::new();
        let pkg = package_with(vec![PackageFeature::new(f, None, Money::from_major(5))]);

        assert!(calculate_price(&pkg, &[qty(f, Decimal::from(i64::MAX))]).is_err());
        assert!(PriceBreakdown::with_tax(Money::from_cents(i64::MAX - 1), TaxRate::default()).is_err());
    }

    #[test]
    fn tax_rate_must_be_a_fraction() {
        assert!(TaxRate::new(Decimal::new(15, 1)).is_err());
        assert!(TaxRate::new(Decimal::ZERO).is_ok());
    }

    proptest! {
        #[test]
        fn price_matches_formula_and_ignores_order(
            modifiers in proptest::collection::vec((0i64..10_000, 0i64..500), 0..6)
        ) {
            let ids: Vec<FeatureId> = modifiers.iter().map(|_| FeatureId::new()).collect();
            let pivots = ids
                .iter()
                .zip(&modifiers)
                .map(|(id, (cents, _))| PackageFeature::new(*id, None, Money::from_cents(*cents)))
                .collect();
            let pkg = package_with(pivots);

            let items: Vec<_> = ids
                .iter()
                .zip(&modifiers)
                .map(|(id, (_, q))| qty(*id, Decimal::from(*q)))
                .collect();
            let mut reversed = items.clone();
            reversed.reverse();

            let expected = 9900 + modifiers.iter().map(|(c, q)| c * q).sum::<i64>();
            prop_assert_eq!(calculate_price(&pkg, &items).unwrap().cents(), expected);
            prop_assert_eq!(
                calculate_price(&pkg, &items).unwrap(),
                calculate_price(&pkg, &reversed).unwrap()
            );
        }
    }
}
