//! Catalog ports over the `categories`, `features`, `packages` and
//! `package_features` tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::catalog::{Category, Feature, FeatureKind, Package, PackageFeature};
use crate::domain::foundation::{
    CategoryId, DomainError, ErrorCode, FeatureId, PackageId, Percentage,
};
use crate::ports::{CatalogReader, CatalogRepository};

use super::{
    commit, corrupt, db_error, money, not_found, parse_column, timestamp, write_error,
    PostgresSalesStore,
};

const CATEGORY_COLUMNS: &str = "id, name, slug, description, is_active, display_order, \
     created_at, updated_at, deleted_at";

const FEATURE_COLUMNS: &str = "id, category_id, name, slug, description, type, min_value, \
     max_value, options, default_value, base_price, is_customizable, is_active, display_order, \
     created_at, updated_at, deleted_at";

const PACKAGE_COLUMNS: &str = "id, category_id, name, slug, description, base_price, \
     billing_cycle, setup_fee, is_popular, is_active, discount, display_order, max_renewals, \
     created_at, updated_at, deleted_at";

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    slug: String,
    description: Option<String>,
    is_active: bool,
    display_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: CategoryId::from_uuid(row.id),
            name: row.name,
            slug: row.slug,
            description: row.description,
            is_active: row.is_active,
            display_order: row.display_order,
            created_at: timestamp(row.created_at),
            updated_at: timestamp(row.updated_at),
            deleted_at: row.deleted_at.map(timestamp),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FeatureRow {
    id: Uuid,
    category_id: Uuid,
    name: String,
    slug: String,
    description: Option<String>,
    #[sqlx(rename = "type")]
    kind: String,
    min_value: Option<Decimal>,
    max_value: Option<Decimal>,
    options: Option<Json<Vec<String>>>,
    default_value: Option<String>,
    base_price: Decimal,
    is_customizable: bool,
    is_active: bool,
    display_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<FeatureRow> for Feature {
    type Error = DomainError;

    fn try_from(row: FeatureRow) -> Result<Self, Self::Error> {
        let kind = FeatureKind::from_parts(
            &row.kind,
            row.min_value,
            row.max_value,
            row.options.map(|Json(options)| options),
        )
        .map_err(|e| corrupt("type", e))?;

        Ok(Feature {
            id: FeatureId::from_uuid(row.id),
            category_id: CategoryId::from_uuid(row.category_id),
            name: row.name,
            slug: row.slug,
            description: row.description,
            kind,
            default_value: row.default_value,
            base_price: money("base_price", row.base_price)?,
            is_customizable: row.is_customizable,
            is_active: row.is_active,
            display_order: row.display_order,
            created_at: timestamp(row.created_at),
            updated_at: timestamp(row.updated_at),
            deleted_at: row.deleted_at.map(timestamp),
        })
    }
}

/// Flattens a feature kind into its `min_value`, `max_value` and
/// `options` columns.
fn kind_columns(kind: &FeatureKind) -> (Option<Decimal>, Option<Decimal>, Option<Json<Vec<String>>>) {
    match kind {
        FeatureKind::Number { min, max } => (*min, *max, None),
        FeatureKind::Dropdown { options } => (None, None, Some(Json(options.clone()))),
        FeatureKind::Boolean | FeatureKind::Text => (None, None, None),
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PackageRow {
    id: Uuid,
    category_id: Uuid,
    name: String,
    slug: String,
    description: Option<String>,
    base_price: Decimal,
    billing_cycle: String,
    setup_fee: Decimal,
    is_popular: bool,
    is_active: bool,
    discount: i16,
    display_order: i32,
    max_renewals: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl PackageRow {
    fn into_package(self, features: Vec<PackageFeature>) -> Result<Package, DomainError> {
        let discount = u8::try_from(self.discount)
            .map_err(|e| corrupt("discount", e))
            .and_then(|d| Percentage::try_new(d).map_err(|e| corrupt("discount", e)))?;
        let max_renewals = self
            .max_renewals
            .map(u32::try_from)
            .transpose()
            .map_err(|e| corrupt("max_renewals", e))?;

        Ok(Package {
            id: PackageId::from_uuid(self.id),
            category_id: CategoryId::from_uuid(self.category_id),
            name: self.name,
            slug: self.slug,
            description: self.description,
            base_price: money("base_price", self.base_price)?,
            billing_cycle: parse_column("billing_cycle", &self.billing_cycle)?,
            setup_fee: money("setup_fee", self.setup_fee)?,
            is_popular: self.is_popular,
            is_active: self.is_active,
            discount,
            display_order: self.display_order,
            max_renewals,
            features,
            created_at: timestamp(self.created_at),
            updated_at: timestamp(self.updated_at),
            deleted_at: self.deleted_at.map(timestamp),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PackageFeatureRow {
    package_id: Uuid,
    feature_id: Uuid,
    value: Option<String>,
    price_modifier: Decimal,
    is_default: bool,
}

impl TryFrom<PackageFeatureRow> for PackageFeature {
    type Error = DomainError;

    fn try_from(row: PackageFeatureRow) -> Result<Self, Self::Error> {
        Ok(PackageFeature {
            feature_id: FeatureId::from_uuid(row.feature_id),
            value: row.value,
            price_modifier: money("price_modifier", row.price_modifier)?,
            is_default: row.is_default,
        })
    }
}

fn max_renewals_column(package: &Package) -> Result<Option<i32>, DomainError> {
    package
        .max_renewals
        .map(i32::try_from)
        .transpose()
        .map_err(|_| DomainError::validation("max_renewals", "max_renewals is too large"))
}

impl PostgresSalesStore {
    /// Loads pivots for the given packages, keyed by package, in stored order.
    async fn pivots_for(
        &self,
        package_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<PackageFeature>>, DomainError> {
        let rows: Vec<PackageFeatureRow> = sqlx::query_as(
            r#"
            SELECT package_id, feature_id, value, price_modifier, is_default
            FROM package_features
            WHERE package_id = ANY($1)
            ORDER BY package_id, position
            "#,
        )
        .bind(package_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("load package features", e))?;

        let mut pivots: HashMap<Uuid, Vec<PackageFeature>> = HashMap::new();
        for row in rows {
            let package_id = row.package_id;
            pivots.entry(package_id).or_default().push(row.try_into()?);
        }
        Ok(pivots)
    }

    async fn packages_from_rows(&self, rows: Vec<PackageRow>) -> Result<Vec<Package>, DomainError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut pivots = self.pivots_for(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let features = pivots.remove(&row.id).unwrap_or_default();
                row.into_package(features)
            })
            .collect()
    }
}

async fn insert_pivots(
    tx: &mut sqlx::Transaction<'static, sqlx::Postgres>,
    package: &Package,
) -> Result<(), DomainError> {
    for (position, pivot) in package.features.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO package_features (
                package_id, feature_id, position, value, price_modifier, is_default
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(package.id.as_uuid())
        .bind(pivot.feature_id.as_uuid())
        .bind(position as i32)
        .bind(&pivot.value)
        .bind(pivot.price_modifier.to_decimal())
        .bind(pivot.is_default)
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error("save package features", e))?;
    }
    Ok(())
}

fn category_conflict(category: &Category) -> impl FnOnce(&str) -> Option<String> + '_ {
    move |constraint: &str| {
        (constraint == "categories_slug_key")
            .then(|| format!("category slug '{}' is taken", category.slug))
    }
}

fn feature_conflict(feature: &Feature) -> impl FnOnce(&str) -> Option<String> + '_ {
    move |constraint: &str| {
        (constraint == "features_category_slug_key")
            .then(|| format!("feature slug '{}' is taken", feature.slug))
    }
}

fn package_conflict(package: &Package) -> impl FnOnce(&str) -> Option<String> + '_ {
    move |constraint: &str| {
        (constraint == "packages_slug_key")
            .then(|| format!("package slug '{}' is taken", package.slug))
    }
}

#[async_trait]
impl CatalogReader for PostgresSalesStore {
    async fn get_package(&self, id: &PackageId) -> Result<Option<Package>, DomainError> {
        let row: Option<PackageRow> = sqlx::query_as(&format!(
            "SELECT {} FROM packages WHERE id = $1 AND deleted_at IS NULL",
            PACKAGE_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch package", e))?;

        match row {
            Some(row) => Ok(self.packages_from_rows(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn get_package_feature(
        &self,
        package_id: &PackageId,
        feature_id: &FeatureId,
    ) -> Result<Option<PackageFeature>, DomainError> {
        let row: Option<PackageFeatureRow> = sqlx::query_as(
            r#"
            SELECT pf.package_id, pf.feature_id, pf.value, pf.price_modifier, pf.is_default
            FROM package_features pf
            JOIN packages p ON p.id = pf.package_id
            WHERE pf.package_id = $1 AND pf.feature_id = $2 AND p.deleted_at IS NULL
            "#,
        )
        .bind(package_id.as_uuid())
        .bind(feature_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch package feature", e))?;

        row.map(PackageFeature::try_from).transpose()
    }

    async fn get_feature(&self, id: &FeatureId) -> Result<Option<Feature>, DomainError> {
        let row: Option<FeatureRow> = sqlx::query_as(&format!(
            "SELECT {} FROM features WHERE id = $1 AND deleted_at IS NULL",
            FEATURE_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch feature", e))?;

        row.map(Feature::try_from).transpose()
    }

    async fn get_features(&self, ids: &[FeatureId]) -> Result<Vec<Feature>, DomainError> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows: Vec<FeatureRow> = sqlx::query_as(&format!(
            "SELECT {} FROM features WHERE id = ANY($1) AND deleted_at IS NULL",
            FEATURE_COLUMNS
        ))
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("fetch features", e))?;

        let mut by_id = HashMap::new();
        for row in rows {
            let feature = Feature::try_from(row)?;
            by_id.insert(feature.id, feature);
        }
        // Callers index results by request order.
        Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
    }

    async fn get_category(&self, id: &CategoryId) -> Result<Option<Category>, DomainError> {
        let row: Option<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM categories WHERE id = $1 AND deleted_at IS NULL",
            CATEGORY_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch category", e))?;

        Ok(row.map(Category::from))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, DomainError> {
        let rows: Vec<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM categories WHERE deleted_at IS NULL ORDER BY display_order, name",
            CATEGORY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list categories", e))?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn list_features(&self) -> Result<Vec<Feature>, DomainError> {
        let rows: Vec<FeatureRow> = sqlx::query_as(&format!(
            "SELECT {} FROM features WHERE deleted_at IS NULL ORDER BY display_order, name",
            FEATURE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list features", e))?;

        rows.into_iter().map(Feature::try_from).collect()
    }

    async fn list_packages(&self, active_only: bool) -> Result<Vec<Package>, DomainError> {
        let rows: Vec<PackageRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM packages
            WHERE deleted_at IS NULL AND (NOT $1 OR is_active)
            ORDER BY display_order, name
            "#,
            PACKAGE_COLUMNS
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list packages", e))?;

        self.packages_from_rows(rows).await
    }
}

#[async_trait]
impl CatalogRepository for PostgresSalesStore {
    async fn save_category(&self, category: &Category) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO categories (
                id, name, slug, description, is_active, display_order,
                created_at, updated_at, deleted_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.is_active)
        .bind(category.display_order)
        .bind(category.created_at.as_datetime())
        .bind(category.updated_at.as_datetime())
        .bind(category.deleted_at.as_ref().map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("save category", e, category_conflict(category)))?;

        Ok(())
    }

    async fn update_category(&self, category: &Category) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE categories SET
                name = $2,
                slug = $3,
                description = $4,
                is_active = $5,
                display_order = $6,
                updated_at = $7,
                deleted_at = $8
            WHERE id = $1
            "#,
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.is_active)
        .bind(category.display_order)
        .bind(category.updated_at.as_datetime())
        .bind(category.deleted_at.as_ref().map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("update category", e, category_conflict(category)))?;

        if result.rows_affected() == 0 {
            return Err(not_found(ErrorCode::CategoryNotFound, category.id));
        }
        Ok(())
    }

    async fn save_feature(&self, feature: &Feature) -> Result<(), DomainError> {
        let (min_value, max_value, options) = kind_columns(&feature.kind);
        sqlx::query(
            r#"
            INSERT INTO features (
                id, category_id, name, slug, description, type, min_value, max_value,
                options, default_value, base_price, is_customizable, is_active,
                display_order, created_at, updated_at, deleted_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(feature.id.as_uuid())
        .bind(feature.category_id.as_uuid())
        .bind(&feature.name)
        .bind(&feature.slug)
        .bind(&feature.description)
        .bind(feature.kind.type_name())
        .bind(min_value)
        .bind(max_value)
        .bind(options)
        .bind(&feature.default_value)
        .bind(feature.base_price.to_decimal())
        .bind(feature.is_customizable)
        .bind(feature.is_active)
        .bind(feature.display_order)
        .bind(feature.created_at.as_datetime())
        .bind(feature.updated_at.as_datetime())
        .bind(feature.deleted_at.as_ref().map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("save feature", e, feature_conflict(feature)))?;

        Ok(())
    }

    async fn update_feature(&self, feature: &Feature) -> Result<(), DomainError> {
        let (min_value, max_value, options) = kind_columns(&feature.kind);
        let result = sqlx::query(
            r#"
            UPDATE features SET
                category_id = $2,
                name = $3,
                slug = $4,
                description = $5,
                type = $6,
                min_value = $7,
                max_value = $8,
                options = $9,
                default_value = $10,
                base_price = $11,
                is_customizable = $12,
                is_active = $13,
                display_order = $14,
                updated_at = $15,
                deleted_at = $16
            WHERE id = $1
            "#,
        )
        .bind(feature.id.as_uuid())
        .bind(feature.category_id.as_uuid())
        .bind(&feature.name)
        .bind(&feature.slug)
        .bind(&feature.description)
        .bind(feature.kind.type_name())
        .bind(min_value)
        .bind(max_value)
        .bind(options)
        .bind(&feature.default_value)
        .bind(feature.base_price.to_decimal())
        .bind(feature.is_customizable)
        .bind(feature.is_active)
        .bind(feature.display_order)
        .bind(feature.updated_at.as_datetime())
        .bind(feature.deleted_at.as_ref().map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("update feature", e, feature_conflict(feature)))?;

        if result.rows_affected() == 0 {
            return Err(not_found(ErrorCode::FeatureNotFound, feature.id));
        }
        Ok(())
    }

    async fn save_package(&self, package: &Package) -> Result<(), DomainError> {
        let mut tx = self.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO packages (
                id, category_id, name, slug, description, base_price, billing_cycle,
                setup_fee, is_popular, is_active, discount, display_order, max_renewals,
                created_at, updated_at, deleted_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(package.id.as_uuid())
        .bind(package.category_id.as_uuid())
        .bind(&package.name)
        .bind(&package.slug)
        .bind(&package.description)
        .bind(package.base_price.to_decimal())
        .bind(package.billing_cycle.as_str())
        .bind(package.setup_fee.to_decimal())
        .bind(package.is_popular)
        .bind(package.is_active)
        .bind(i16::from(package.discount.value()))
        .bind(package.display_order)
        .bind(max_renewals_column(package)?)
        .bind(package.created_at.as_datetime())
        .bind(package.updated_at.as_datetime())
        .bind(package.deleted_at.as_ref().map(|t| *t.as_datetime()))
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error("save package", e, package_conflict(package)))?;

        insert_pivots(&mut tx, package).await?;
        commit(tx).await
    }

    async fn update_package(&self, package: &Package) -> Result<(), DomainError> {
        let mut tx = self.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE packages SET
                category_id = $2,
                name = $3,
                slug = $4,
                description = $5,
                base_price = $6,
                billing_cycle = $7,
                setup_fee = $8,
                is_popular = $9,
                is_active = $10,
                discount = $11,
                display_order = $12,
                max_renewals = $13,
                updated_at = $14,
                deleted_at = $15
            WHERE id = $1
            "#,
        )
        .bind(package.id.as_uuid())
        .bind(package.category_id.as_uuid())
        .bind(&package.name)
        .bind(&package.slug)
        .bind(&package.description)
        .bind(package.base_price.to_decimal())
        .bind(package.billing_cycle.as_str())
        .bind(package.setup_fee.to_decimal())
        .bind(package.is_popular)
        .bind(package.is_active)
        .bind(i16::from(package.discount.value()))
        .bind(package.display_order)
        .bind(max_renewals_column(package)?)
        .bind(package.updated_at.as_datetime())
        .bind(package.deleted_at.as_ref().map(|t| *t.as_datetime()))
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error("update package", e, package_conflict(package)))?;

        if result.rows_affected() == 0 {
            return Err(not_found(ErrorCode::PackageNotFound, package.id));
        }

        // Pivots are replaced wholesale.
        sqlx::query("DELETE FROM package_features WHERE package_id = $1")
            .bind(package.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("clear package features", e))?;
        insert_pivots(&mut tx, package).await?;
        commit(tx).await
    }
}
