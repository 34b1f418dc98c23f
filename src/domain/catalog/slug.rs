//! URL slug helpers shared by categories, features and packages.

use crate::domain::foundation::ValidationError;

/// Derives a slug from a display name: lowercase ASCII words joined by `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Accepts lowercase alphanumerics separated by single dashes.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if slug.is_empty() {
        return Err(ValidationError::empty_field("slug"));
    }
    let well_formed = slug
        .split('-')
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    if !well_formed {
        return Err(ValidationError::invalid_format(
            "slug",
            "use lowercase letters, digits and single dashes",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Business  Pro (2024)"), "business-pro-2024");
        assert_eq!(slugify("  --Starter--  "), "starter");
    }

    #[test]
    fn validate_slug_rules() {
        assert!(validate_slug("vps-10").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Bad_Slug").is_err());
        assert!(validate_slug("double--dash").is_err());
        assert!(validate_slug("-lead").is_err());
    }
}
