//! Service categories (e.g. "Shared Hosting", "VPS").

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CategoryId, Timestamp, ValidationError};

use super::slug::validate_slug;

/// Top-level grouping of features and packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub display_order: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl Category {
    /// Creates an active category.
    pub fn new(
        name: impl Into<String>,
        slug: impl Into<String>,
        description: Option<String>,
        display_order: i32,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        let slug = slug.into();
        validate_slug(&slug)?;

        let now = Timestamp::now();
        Ok(Self {
            id: CategoryId::new(),
            name,
            slug,
            description,
            is_active: true,
            display_order,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    pub fn is_visible(&self) -> bool {
        self.is_active && self.deleted_at.is_none()
    }

    /// Replaces the editable fields.
    pub fn apply(
        &mut self,
        name: impl Into<String>,
        slug: impl Into<String>,
        description: Option<String>,
        is_active: bool,
        display_order: i32,
    ) -> Result<(), ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        let slug = slug.into();
        validate_slug(&slug)?;

        self.name = name;
        self.slug = slug;
        self.description = description;
        self.is_active = is_active;
        self.display_order = display_order;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Marks the category deleted; it stays in storage for history.
    pub fn soft_delete(&mut self) {
        let now = Timestamp::now();
        self.deleted_at = Some(now);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_category_is_active() {
        let cat = Category::new("Shared Hosting", "shared-hosting", None, 1).unwrap();
        assert!(cat.is_visible());
    }

    #[test]
    fn blank_name_is_rejected() {
        assert!(Category::new(" ", "x", None, 0).is_err());
    }

    #[test]
    fn soft_delete_hides_category() {
        let mut cat = Category::new("VPS", "vps", None, 2).unwrap();
        cat.soft_delete();
        assert!(!cat.is_visible());
    }
}
