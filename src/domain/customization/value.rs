//! Customer-chosen feature values.
//!
//! Raw request values are untyped JSON. They are resolved against the
//! feature's [`FeatureKind`] exactly once, at the edge of the checkout and
//! pricing paths, and from then on travel as [`FeatureValue`].

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

use crate::domain::catalog::FeatureKind;
use crate::domain::foundation::{FeatureId, ValidationError};

/// One entry of a customization request, before resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomizationItem {
    pub feature_id: FeatureId,
    pub value: serde_json::Value,
}

/// Checks request shape without touching any store.
///
/// Every value must be present and each feature may appear once.
pub fn validate_shape(items: &[CustomizationItem]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        if item.value.is_null() {
            return Err(ValidationError::empty_field(format!("customization.{}.value", idx)));
        }
        if !seen.insert(item.feature_id) {
            return Err(ValidationError::invalid_format(
                format!("customization.{}.feature_id", idx),
                "feature listed more than once",
            ));
        }
    }
    Ok(())
}

/// A value that has been checked against its feature's kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureValue {
    Quantity(Decimal),
    Flag(bool),
    Choice(String),
    Text(String),
}

impl FeatureValue {
    /// Resolves a raw JSON value against a feature kind.
    pub fn resolve(kind: &FeatureKind, raw: &serde_json::Value) -> Result<Self, ValidationError> {
        match kind {
            FeatureKind::Number { min, max } => {
                let qty = parse_decimal(raw)
                    .ok_or_else(|| ValidationError::invalid_format("value", "expected a number"))?;
                if qty.is_sign_negative() && !qty.is_zero() {
                    return Err(ValidationError::out_of_range("value", 0, "-", qty));
                }
                let below = min.map_or(false, |m| qty < m);
                let above = max.map_or(false, |m| qty > m);
                if below || above {
                    return Err(ValidationError::out_of_range(
                        "value",
                        min.map_or_else(|| "-".to_string(), |m| m.to_string()),
                        max.map_or_else(|| "-".to_string(), |m| m.to_string()),
                        qty,
                    ));
                }
                Ok(FeatureValue::Quantity(qty))
            }
            FeatureKind::Boolean => parse_flag(raw)
                .map(FeatureValue::Flag)
                .ok_or_else(|| ValidationError::invalid_format("value", "expected true or false")),
            FeatureKind::Dropdown { options } => {
                let choice = raw
                    .as_str()
                    .ok_or_else(|| ValidationError::invalid_format("value", "expected one of the options"))?;
                if !options.iter().any(|o| o == choice) {
                    return Err(ValidationError::invalid_format(
                        "value",
                        format!("'{}' is not one of: {}", choice, options.join(", ")),
                    ));
                }
                Ok(FeatureValue::Choice(choice.to_string()))
            }
            FeatureKind::Text => match raw {
                serde_json::Value::String(s) => Ok(FeatureValue::Text(s.clone())),
                serde_json::Value::Number(n) => Ok(FeatureValue::Text(n.to_string())),
                _ => Err(ValidationError::invalid_format("value", "expected text")),
            },
        }
    }

    /// Units this value counts for in pricing and quota consumption.
    ///
    /// Flags count 1 when on and 0 when off; choices and text count 1.
    pub fn quantity(&self) -> Decimal {
        match self {
            FeatureValue::Quantity(q) => *q,
            FeatureValue::Flag(true) => Decimal::ONE,
            FeatureValue::Flag(false) => Decimal::ZERO,
            FeatureValue::Choice(_) | FeatureValue::Text(_) => Decimal::ONE,
        }
    }

    /// Normalized JSON for freezing into an order.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FeatureValue::Quantity(q) => {
                let q = q.normalize();
                if q.fract().is_zero() {
                    if let Some(i) = q.to_i64() {
                        return serde_json::Value::from(i);
                    }
                }
                q.to_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(serde_json::Value::Number)
                    .unwrap_or_else(|| serde_json::Value::String(q.to_string()))
            }
            FeatureValue::Flag(b) => serde_json::Value::Bool(*b),
            FeatureValue::Choice(s) | FeatureValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// A request entry after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCustomization {
    pub feature_id: FeatureId,
    pub value: FeatureValue,
}

fn parse_decimal(raw: &serde_json::Value) -> Option<Decimal> {
    match raw {
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                Decimal::from_u64(u)
            } else {
                // Go through the shortest textual form so 0.1 stays 0.1.
                Decimal::from_str(&n.to_string()).ok()
            }
        }
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn parse_flag(raw: &serde_json::Value) -> Option<bool> {
    match raw {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        serde_json::Value::String(s) => match s.as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn number(min: Option<i64>, max: Option<i64>) -> FeatureKind {
        FeatureKind::Number {
            min: min.map(Decimal::from),
            max: max.map(Decimal::from),
        }
    }

    #[test]
    fn number_accepts_numbers_and_numeric_strings() {
        let kind = number(None, None);
        assert_eq!(
            FeatureValue::resolve(&kind, &json!(10)).unwrap().quantity(),
            Decimal::from(10)
        );
        assert_eq!(
            FeatureValue::resolve(&kind, &json!("2.5")).unwrap().quantity(),
            Decimal::new(25, 1)
        );
        assert_eq!(
            FeatureValue::resolve(&kind, &json!(0.1)).unwrap().quantity(),
            Decimal::new(1, 1)
        );
    }

    #[test]
    fn number_rejects_out_of_bounds_and_negative() {
        let kind = number(Some(1), Some(100));
        assert!(FeatureValue::resolve(&kind, &json!(0)).is_err());
        assert!(FeatureValue::resolve(&kind, &json!(101)).is_err());
        assert!(FeatureValue::resolve(&number(None, None), &json!(-3)).is_err());
        assert!(FeatureValue::resolve(&kind, &json!("lots")).is_err());
    }

    #[test]
    fn boolean_quantities_are_one_and_zero() {
        let on = FeatureValue::resolve(&FeatureKind::Boolean, &json!(true)).unwrap();
        let off = FeatureValue::resolve(&FeatureKind::Boolean, &json!("0")).unwrap();
        assert_eq!(on.quantity(), Decimal::ONE);
        assert_eq!(off.quantity(), Decimal::ZERO);
    }

    #[test]
    fn dropdown_requires_listed_option() {
        let kind = FeatureKind::Dropdown {
            options: vec!["cPanel".into(), "Plesk".into()],
        };
        let v = FeatureValue::resolve(&kind, &json!("Plesk")).unwrap();
        assert_eq!(v.quantity(), Decimal::ONE);
        assert!(FeatureValue::resolve(&kind, &json!("DirectAdmin")).is_err());
    }

    #[test]
    fn shape_rejects_missing_values_and_duplicates() {
        let id = FeatureId::new();
        let missing = vec![CustomizationItem { feature_id: id, value: json!(null) }];
        assert!(validate_shape(&missing).is_err());

        let dup = vec![
            CustomizationItem { feature_id: id, value: json!(1) },
            CustomizationItem { feature_id: id, value: json!(2) },
        ];
        assert!(validate_shape(&dup).is_err());
    }

    #[test]
    fn to_json_keeps_whole_numbers_integral() {
        assert_eq!(FeatureValue::Quantity(Decimal::new(1000, 2)).to_json(), json!(10));
        assert_eq!(FeatureValue::Quantity(Decimal::new(5, 1)).to_json(), json!(0.5));
        assert_eq!(FeatureValue::Flag(true).to_json(), json!(true));
    }
}
