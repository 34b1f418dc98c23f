//! Customization validator.
//!
//! Checks a resolved selection against the user's quota rows. Lookups are
//! done by the caller; this module only decides.

use std::collections::{BTreeMap, HashMap};

use crate::domain::foundation::FeatureId;

use super::{CustomizationLimit, LimitViolation, ResolvedCustomization};

/// Quota rows for one user, keyed by feature.
pub type LimitTable = HashMap<FeatureId, CustomizationLimit>;

/// Returns the first violation in request order, if any.
///
/// Features without a quota row are unconstrained.
pub fn first_violation(
    limits: &LimitTable,
    customization: &[ResolvedCustomization],
) -> Option<LimitViolation> {
    customization.iter().find_map(|item| {
        let limit = limits.get(&item.feature_id)?;
        let amount = item.value.quantity();
        (!limit.can_add_more(amount)).then(|| limit.violation(amount))
    })
}

/// Collects every violation keyed by request index.
pub fn all_violations(
    limits: &LimitTable,
    customization: &[ResolvedCustomization],
) -> BTreeMap<usize, LimitViolation> {
    customization
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let limit = limits.get(&item.feature_id)?;
            let amount = item.value.quantity();
            (!limit.can_add_more(amount)).then(|| (idx, limit.violation(amount)))
        })
        .collect()
}

/// Message shown to customers for one violation.
pub fn violation_message(violation: &LimitViolation) -> String {
    format!("Limit exceeded. Remaining: {}", violation.remaining.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::customization::FeatureValue;
    use crate::domain::foundation::UserId;
    use rust_decimal::Decimal;

    fn table(rows: &[(FeatureId, i64, i64, bool)]) -> LimitTable {
        rows.iter()
            .map(|(id, max, current, enforced)| {
                let mut l = CustomizationLimit::new(
                    UserId::new("user-1").unwrap(),
                    *id,
                    Decimal::from(*max),
                    *enforced,
                )
                .unwrap();
                l.current_value = Decimal::from(*current);
                (*id, l)
            })
            .collect()
    }

    fn item(feature_id: FeatureId, n: i64) -> ResolvedCustomization {
        ResolvedCustomization {
            feature_id,
            value: FeatureValue::Quantity(Decimal::from(n)),
        }
    }

    #[test]
    fn features_without_rows_are_unconstrained() {
        let limits = table(&[]);
        assert!(first_violation(&limits, &[item(FeatureId::new(), 1_000_000)]).is_none());
    }

    #[test]
    fn first_violation_stops_at_earliest() {
        let a = FeatureId::new();
        let b = FeatureId::new();
        let limits = table(&[(a, 5, 5, true), (b, 1, 0, true)]);
        let v = first_violation(&limits, &[item(a, 1), item(b, 2)]).unwrap();
        assert_eq!(v.feature_id, a);
        assert_eq!(v.remaining, Decimal::ZERO);
    }

    #[test]
    fn all_violations_are_keyed_by_index() {
        let a = FeatureId::new();
        let b = FeatureId::new();
        let c = FeatureId::new();
        let limits = table(&[(a, 5, 5, true), (b, 10, 0, true), (c, 3, 1, true)]);
        let found = all_violations(&limits, &[item(a, 1), item(b, 2), item(c, 5)]);

        assert_eq!(found.keys().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(violation_message(&found[&2]), "Limit exceeded. Remaining: 2");
    }

    #[test]
    fn unenforced_rows_never_violate() {
        let a = FeatureId::new();
        let limits = table(&[(a, 1, 1, false)]);
        assert!(all_violations(&limits, &[item(a, 50)]).is_empty());
    }
}
