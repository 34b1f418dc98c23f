//! Customizable features (disk space, SSL, control panel, ...).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CategoryId, FeatureId, Money, Timestamp, ValidationError};

use super::slug::validate_slug;

/// What kind of value a feature accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureKind {
    /// Numeric quantity, optionally bounded.
    Number {
        #[serde(default)]
        min: Option<Decimal>,
        #[serde(default)]
        max: Option<Decimal>,
    },
    Boolean,
    /// One of a fixed, ordered list of choices.
    Dropdown { options: Vec<String> },
    Text,
}

impl FeatureKind {
    /// Validates the kind's own parameters.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            FeatureKind::Number {
                min: Some(min),
                max: Some(max),
            } if min > max => Err(ValidationError::out_of_range("min_value", "-", max, min)),
            FeatureKind::Dropdown { options } if options.is_empty() => {
                Err(ValidationError::empty_field("options"))
            }
            FeatureKind::Dropdown { options } if options.iter().any(|o| o.trim().is_empty()) => {
                Err(ValidationError::invalid_format("options", "options cannot be blank"))
            }
            _ => Ok(()),
        }
    }

    /// Storage name of the variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            FeatureKind::Number { .. } => "number",
            FeatureKind::Boolean => "boolean",
            FeatureKind::Dropdown { .. } => "dropdown",
            FeatureKind::Text => "text",
        }
    }

    /// Rebuilds a kind from its flattened storage columns.
    pub fn from_parts(
        type_name: &str,
        min: Option<Decimal>,
        max: Option<Decimal>,
        options: Option<Vec<String>>,
    ) -> Result<Self, ValidationError> {
        let kind = match type_name {
            "number" => FeatureKind::Number { min, max },
            "boolean" => FeatureKind::Boolean,
            "dropdown" => FeatureKind::Dropdown {
                options: options.unwrap_or_default(),
            },
            "text" => FeatureKind::Text,
            other => {
                return Err(ValidationError::invalid_format(
                    "type",
                    format!("unknown feature type '{}'", other),
                ))
            }
        };
        kind.validate()?;
        Ok(kind)
    }
}

/// A catalog feature that packages bundle and customers customize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub kind: FeatureKind,
    pub default_value: Option<String>,
    pub base_price: Money,
    pub is_customizable: bool,
    pub is_active: bool,
    pub display_order: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

/// Fields an admin supplies when creating or updating a feature.
#[derive(Debug, Clone)]
pub struct FeatureDraft {
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub kind: FeatureKind,
    pub default_value: Option<String>,
    pub base_price: Money,
    pub is_customizable: bool,
    pub is_active: bool,
    pub display_order: i32,
}

impl FeatureDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        validate_slug(&self.slug)?;
        self.kind.validate()?;
        if self.base_price.is_negative() {
            return Err(ValidationError::out_of_range("base_price", 0, "-", self.base_price));
        }
        Ok(())
    }
}

impl Feature {
    /// Creates a feature from a validated draft.
    pub fn create(draft: FeatureDraft) -> Result<Self, ValidationError> {
        draft.validate()?;
        let now = Timestamp::now();
        Ok(Self {
            id: FeatureId::new(),
            category_id: draft.category_id,
            name: draft.name,
            slug: draft.slug,
            description: draft.description,
            kind: draft.kind,
            default_value: draft.default_value,
            base_price: draft.base_price,
            is_customizable: draft.is_customizable,
            is_active: draft.is_active,
            display_order: draft.display_order,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Replaces every editable field from a validated draft.
    pub fn apply(&mut self, draft: FeatureDraft) -> Result<(), ValidationError> {
        draft.validate()?;
        self.category_id = draft.category_id;
        self.name = draft.name;
        self.slug = draft.slug;
        self.description = draft.description;
        self.kind = draft.kind;
        self.default_value = draft.default_value;
        self.base_price = draft.base_price;
        self.is_customizable = draft.is_customizable;
        self.is_active = draft.is_active;
        self.display_order = draft.display_order;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    pub fn soft_delete(&mut self) {
        let now = Timestamp::now();
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    /// True when customers may choose a value for this feature.
    pub fn accepts_customization(&self) -> bool {
        self.is_customizable && self.is_active && self.deleted_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn draft(kind: FeatureKind) -> FeatureDraft {
        FeatureDraft {
            category_id: CategoryId::new(),
            name: "Disk Space".to_string(),
            slug: "disk-space".to_string(),
            description: None,
            kind,
            default_value: Some("10".to_string()),
            base_price: Money::ZERO,
            is_customizable: true,
            is_active: true,
            display_order: 0,
        }
    }

    #[test]
    fn dropdown_requires_options() {
        let kind = FeatureKind::Dropdown { options: vec![] };
        assert!(Feature::create(draft(kind)).is_err());
    }

    #[test]
    fn number_bounds_must_be_ordered() {
        let kind = FeatureKind::Number {
            min: Some(Decimal::from(10)),
            max: Some(Decimal::from(1)),
        };
        assert!(kind.validate().is_err());
    }

    #[test]
    fn kind_round_trips_through_storage_columns() {
        let kind = FeatureKind::from_parts("dropdown", None, None, Some(vec!["cPanel".into()])).unwrap();
        assert_eq!(kind.type_name(), "dropdown");
        assert!(FeatureKind::from_parts("slider", None, None, None).is_err());
    }

    #[test]
    fn kind_serializes_with_type_tag() {
        let json = serde_json::to_value(FeatureKind::Boolean).unwrap();
        assert_eq!(json["type"], "boolean");
    }

    #[test]
    fn deleted_feature_rejects_customization() {
        let mut f = Feature::create(draft(FeatureKind::Text)).unwrap();
        assert!(f.accepts_customization());
        f.soft_delete();
        assert!(!f.accepts_customization());
    }
}
