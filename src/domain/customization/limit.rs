//! Per-user customization quotas.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{FeatureId, LimitId, Timestamp, UserId, ValidationError};

/// One row of the quota ledger: how much of a feature a user may consume.
///
/// # Invariants
///
/// - `(user_id, feature_id)` is unique
/// - when `is_enforced`, `current_value <= max_value` after every consume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomizationLimit {
    pub id: LimitId,
    pub user_id: UserId,
    pub feature_id: FeatureId,
    pub max_value: Decimal,
    pub current_value: Decimal,
    pub is_enforced: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A consumption that would push an enforced limit past its maximum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitViolation {
    pub feature_id: FeatureId,
    pub requested: Decimal,
    pub remaining: Decimal,
}

impl CustomizationLimit {
    /// Creates a fresh limit with nothing consumed.
    pub fn new(
        user_id: UserId,
        feature_id: FeatureId,
        max_value: Decimal,
        is_enforced: bool,
    ) -> Result<Self, ValidationError> {
        validate_max(max_value)?;
        let now = Timestamp::now();
        Ok(Self {
            id: LimitId::new(),
            user_id,
            feature_id,
            max_value,
            current_value: Decimal::ZERO,
            is_enforced,
            created_at: now,
            updated_at: now,
        })
    }

    /// Changes the ceiling and enforcement flag, keeping consumption.
    pub fn reconfigure(&mut self, max_value: Decimal, is_enforced: bool) -> Result<(), ValidationError> {
        validate_max(max_value)?;
        self.max_value = max_value;
        self.is_enforced = is_enforced;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Unenforced limits always admit; enforced ones admit up to the max.
    pub fn can_add_more(&self, amount: Decimal) -> bool {
        !self.is_enforced
            || self
                .current_value
                .checked_add(amount)
                .map_or(false, |total| total <= self.max_value)
    }

    pub fn remaining_capacity(&self) -> Decimal {
        (self.max_value - self.current_value).max(Decimal::ZERO)
    }

    /// Consumes `amount`, refusing if an enforced limit would overflow.
    pub fn consume(&mut self, amount: Decimal) -> Result<(), LimitViolation> {
        if !self.can_add_more(amount) {
            return Err(self.violation(amount));
        }
        self.current_value = self
            .current_value
            .checked_add(amount)
            .ok_or_else(|| self.violation(amount))?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    pub fn violation(&self, requested: Decimal) -> LimitViolation {
        LimitViolation {
            feature_id: self.feature_id,
            requested,
            remaining: self.remaining_capacity(),
        }
    }
}

fn validate_max(max_value: Decimal) -> Result<(), ValidationError> {
    if max_value.is_sign_negative() && !max_value.is_zero() {
        return Err(ValidationError::out_of_range("max_value", 0, "-", max_value));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn limit(max: i64, current: i64, enforced: bool) -> CustomizationLimit {
        let mut l = CustomizationLimit::new(
            UserId::new("user-1").unwrap(),
            FeatureId::new(),
            Decimal::from(max),
            enforced,
        )
        .unwrap();
        l.current_value = Decimal::from(current);
        l
    }

    #[test]
    fn boundary_exactly_at_max_is_admitted() {
        let l = limit(10, 7, true);
        assert!(l.can_add_more(Decimal::from(3)));
        assert!(!l.can_add_more(Decimal::from(4)));
    }

    #[test]
    fn remaining_capacity_never_negative() {
        assert_eq!(limit(5, 8, true).remaining_capacity(), Decimal::ZERO);
        assert_eq!(limit(5, 2, true).remaining_capacity(), Decimal::from(3));
    }

    #[test]
    fn consume_increments_or_reports_violation() {
        let mut l = limit(10, 8, true);
        l.consume(Decimal::from(2)).unwrap();
        assert_eq!(l.current_value, Decimal::from(10));

        let v = l.consume(Decimal::ONE).unwrap_err();
        assert_eq!(v.remaining, Decimal::ZERO);
        assert_eq!(l.current_value, Decimal::from(10));
    }

    #[test]
    fn amount_that_would_overflow_is_refused() {
        let mut l = limit(10, 5, true);
        assert!(!l.can_add_more(Decimal::MAX));
        assert!(l.consume(Decimal::MAX).is_err());
        assert_eq!(l.current_value, Decimal::from(5));

        let mut open = limit(10, 5, false);
        assert!(open.consume(Decimal::MAX).is_err());
        assert_eq!(open.current_value, Decimal::from(5));
    }

    #[test]
    fn reconfigure_keeps_consumption() {
        let mut l = limit(10, 4, true);
        l.reconfigure(Decimal::from(20), false).unwrap();
        assert_eq!(l.current_value, Decimal::from(4));
        assert!(!l.is_enforced);
        assert!(l.reconfigure(Decimal::from(-1), true).is_err());
    }

    proptest! {
        #[test]
        fn unenforced_limit_always_admits(max in 0i64..1000, current in 0i64..5000, amount in 0i64..5000) {
            prop_assert!(limit(max, current, false).can_add_more(Decimal::from(amount)));
        }

        #[test]
        fn enforced_admission_matches_headroom(max in 0i64..1000, current in 0i64..1000, amount in 0i64..1000) {
            let l = limit(max, current, true);
            prop_assert_eq!(l.can_add_more(Decimal::from(amount)), current + amount <= max);
        }
    }
}
