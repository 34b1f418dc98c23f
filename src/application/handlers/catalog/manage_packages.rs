//! Package administration, including bulk actions.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::catalog::{Package, PackageDraft};
use crate::domain::foundation::{PackageId, UserId, ValidationError};
use crate::domain::SalesError;
use crate::ports::{AuditAction, AuditEntry, AuditLog, CatalogReader, CatalogRepository};

const ENTITY: &str = "Package";

/// Category and every pivot feature must exist.
async fn check_references(reader: &dyn CatalogReader, draft: &PackageDraft) -> Result<(), SalesError> {
    if reader.get_category(&draft.category_id).await?.is_none() {
        return Err(SalesError::not_found("category", draft.category_id));
    }
    let ids: Vec<_> = draft.features.iter().map(|p| p.feature_id).collect();
    let found = reader.get_features(&ids).await?;
    if let Some(missing) = ids.iter().find(|id| !found.iter().any(|f| &f.id == *id)) {
        return Err(SalesError::not_found("feature", missing));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct CreatePackageCommand {
    pub actor: UserId,
    pub draft: PackageDraft,
}

pub struct CreatePackageHandler {
    reader: Arc<dyn CatalogReader>,
    repository: Arc<dyn CatalogRepository>,
    audit: Arc<dyn AuditLog>,
}

impl CreatePackageHandler {
    pub fn new(
        reader: Arc<dyn CatalogReader>,
        repository: Arc<dyn CatalogRepository>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            reader,
            repository,
            audit,
        }
    }

    pub async fn handle(&self, cmd: CreatePackageCommand) -> Result<Package, SalesError> {
        cmd.draft.validate()?;
        check_references(self.reader.as_ref(), &cmd.draft).await?;

        let package = Package::create(cmd.draft)?;
        self.repository.save_package(&package).await?;

        tracing::info!(
            package_id = %package.id,
            slug = %package.slug,
            features = package.features.len(),
            "Package created"
        );
        self.audit.record(
            AuditEntry::new(AuditAction::Create, ENTITY, package.id, json!(package)).by(&cmd.actor),
        );
        Ok(package)
    }
}

#[derive(Debug, Clone)]
pub struct UpdatePackageCommand {
    pub actor: UserId,
    pub package_id: PackageId,
    pub draft: PackageDraft,
}

pub struct UpdatePackageHandler {
    reader: Arc<dyn CatalogReader>,
    repository: Arc<dyn CatalogRepository>,
    audit: Arc<dyn AuditLog>,
}

impl UpdatePackageHandler {
    pub fn new(
        reader: Arc<dyn CatalogReader>,
        repository: Arc<dyn CatalogRepository>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            reader,
            repository,
            audit,
        }
    }

    /// Replaces the package fields and syncs its feature pivots.
    pub async fn handle(&self, cmd: UpdatePackageCommand) -> Result<Package, SalesError> {
        let mut package = self
            .reader
            .get_package(&cmd.package_id)
            .await?
            .ok_or_else(|| SalesError::not_found("package", cmd.package_id))?;
        cmd.draft.validate()?;
        check_references(self.reader.as_ref(), &cmd.draft).await?;

        package.apply(cmd.draft)?;
        self.repository.update_package(&package).await?;

        self.audit.record(
            AuditEntry::new(AuditAction::Update, ENTITY, package.id, json!(package)).by(&cmd.actor),
        );
        Ok(package)
    }
}

#[derive(Debug, Clone)]
pub struct DeletePackageCommand {
    pub actor: UserId,
    pub package_id: PackageId,
}

pub struct DeletePackageHandler {
    reader: Arc<dyn CatalogReader>,
    repository: Arc<dyn CatalogRepository>,
    audit: Arc<dyn AuditLog>,
}

impl DeletePackageHandler {
    pub fn new(
        reader: Arc<dyn CatalogReader>,
        repository: Arc<dyn CatalogRepository>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            reader,
            repository,
            audit,
        }
    }

    pub async fn handle(&self, cmd: DeletePackageCommand) -> Result<(), SalesError> {
        let mut package = self
            .reader
            .get_package(&cmd.package_id)
            .await?
            .ok_or_else(|| SalesError::not_found("package", cmd.package_id))?;

        package.soft_delete();
        self.repository.update_package(&package).await?;

        self.audit.record(
            AuditEntry::new(AuditAction::Delete, ENTITY, package.id, json!({ "slug": package.slug }))
                .by(&cmd.actor),
        );
        Ok(())
    }
}

/// Bulk action over many packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkPackageAction {
    Activate,
    Deactivate,
    Delete,
}

impl FromStr for BulkPackageAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activate" => Ok(BulkPackageAction::Activate),
            "deactivate" => Ok(BulkPackageAction::Deactivate),
            "delete" => Ok(BulkPackageAction::Delete),
            other => Err(ValidationError::invalid_format(
                "action",
                format!("unknown bulk action '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BulkPackageActionCommand {
    pub actor: UserId,
    pub action: BulkPackageAction,
    pub package_ids: Vec<PackageId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkPackageActionResult {
    pub affected: usize,
    /// Ids that did not resolve to a live package.
    pub skipped: Vec<PackageId>,
}

pub struct BulkPackageActionHandler {
    reader: Arc<dyn CatalogReader>,
    repository: Arc<dyn CatalogRepository>,
    audit: Arc<dyn AuditLog>,
}

impl BulkPackageActionHandler {
    pub fn new(
        reader: Arc<dyn CatalogReader>,
        repository: Arc<dyn CatalogRepository>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            reader,
            repository,
            audit,
        }
    }

    pub async fn handle(&self, cmd: BulkPackageActionCommand) -> Result<BulkPackageActionResult, SalesError> {
        if cmd.package_ids.is_empty() {
            return Err(SalesError::validation("packages", "at least one package is required"));
        }

        let mut affected = 0;
        let mut skipped = Vec::new();
        for id in cmd.package_ids {
            let Some(mut package) = self.reader.get_package(&id).await? else {
                skipped.push(id);
                continue;
            };
            let action = match cmd.action {
                BulkPackageAction::Activate => {
                    package.set_active(true);
                    AuditAction::Update
                }
                BulkPackageAction::Deactivate => {
                    package.set_active(false);
                    AuditAction::Update
                }
                BulkPackageAction::Delete => {
                    package.soft_delete();
                    AuditAction::Delete
                }
            };
            self.repository.update_package(&package).await?;
            self.audit.record(
                AuditEntry::new(action, ENTITY, package.id, json!({ "bulk_action": cmd.action }))
                    .by(&cmd.actor),
            );
            affected += 1;
        }

        tracing::info!(action = ?cmd.action, affected, skipped = skipped.len(), "Bulk package action");
        Ok(BulkPackageActionResult { affected, skipped })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_fixtures::{user, Fixture};
    use crate::domain::catalog::{BillingCycle, PackageFeature};
    use crate::domain::foundation::{FeatureId, Money, Percentage};

    fn draft(fx: &Fixture, slug: &str, features: Vec<PackageFeature>) -> PackageDraft {
        PackageDraft {
            category_id: fx.category.id,
            name: "Starter".to_string(),
            slug: slug.to_string(),
            description: None,
            base_price: Money::from_major(10),
            billing_cycle: BillingCycle::Annually,
            setup_fee: Money::from_major(5),
            is_popular: false,
            is_active: true,
            discount: Percentage::try_new(10).unwrap(),
            display_order: 0,
            max_renewals: Some(3),
            features,
        }
    }

    #[tokio::test]
    async fn create_attaches_pivots() {
        let fx = Fixture::new().await;
        let handler = CreatePackageHandler::new(fx.store.clone(), fx.store.clone(), fx.audit.clone());
        let pivot = PackageFeature::new(fx.storage.id, Some("5".into()), Money::from_cents(25));

        let package = handler
            .handle(CreatePackageCommand {
                actor: user("admin"),
                draft: draft(&fx, "starter", vec![pivot]),
            })
            .await
            .unwrap();

        let stored = fx.store.get_package(&package.id).await.unwrap().unwrap();
        assert_eq!(stored.features.len(), 1);
        assert_eq!(stored.pivot(&fx.storage.id).unwrap().price_modifier, Money::from_cents(25));
    }

    #[tokio::test]
    async fn unknown_pivot_feature_is_rejected() {
        let fx = Fixture::new().await;
        let handler = CreatePackageHandler::new(fx.store.clone(), fx.store.clone(), fx.audit.clone());
        let pivot = PackageFeature::new(FeatureId::new(), None, Money::ZERO);

        let result = handler
            .handle(CreatePackageCommand {
                actor: user("admin"),
                draft: draft(&fx, "starter", vec![pivot]),
            })
            .await;

        assert!(matches!(result, Err(SalesError::NotFound { resource: "feature", .. })));
    }

    #[tokio::test]
    async fn duplicate_slug_is_a_conflict() {
        let fx = Fixture::new().await;
        let handler = CreatePackageHandler::new(fx.store.clone(), fx.store.clone(), fx.audit.clone());

        let result = handler
            .handle(CreatePackageCommand {
                actor: user("admin"),
                draft: draft(&fx, "business", vec![]),
            })
            .await;

        assert!(matches!(result, Err(SalesError::Conflict(_))));
    }

    #[tokio::test]
    async fn update_syncs_pivots() {
        let fx = Fixture::new().await;
        let handler = UpdatePackageHandler::new(fx.store.clone(), fx.store.clone(), fx.audit.clone());
        let pivot = PackageFeature::new(fx.dedicated_ip.id, None, Money::from_major(7));

        let package = handler
            .handle(UpdatePackageCommand {
                actor: user("admin"),
                package_id: fx.package.id,
                draft: draft(&fx, "business", vec![pivot]),
            })
            .await
            .unwrap();

        assert!(package.pivot(&fx.storage.id).is_none());
        assert_eq!(package.pivot(&fx.dedicated_ip.id).unwrap().price_modifier, Money::from_major(7));
    }

    #[tokio::test]
    async fn bulk_deactivate_skips_unknown_ids() {
        let fx = Fixture::new().await;
        let handler = BulkPackageActionHandler::new(fx.store.clone(), fx.store.clone(), fx.audit.clone());

        let result = handler
            .handle(BulkPackageActionCommand {
                actor: user("admin"),
                action: BulkPackageAction::Deactivate,
                package_ids: vec![fx.package.id, PackageId::new()],
            })
            .await
            .unwrap();

        assert_eq!(result.affected, 1);
        assert_eq!(result.skipped.len(), 1);
        let stored = fx.store.get_package(&fx.package.id).await.unwrap().unwrap();
        assert!(!stored.is_active);
    }

    #[tokio::test]
    async fn bulk_delete_hides_packages() {
        let fx = Fixture::new().await;
        BulkPackageActionHandler::new(fx.store.clone(), fx.store.clone(), fx.audit.clone())
            .handle(BulkPackageActionCommand {
                actor: user("admin"),
                action: BulkPackageAction::Delete,
                package_ids: vec![fx.package.id],
            })
            .await
            .unwrap();

        assert!(fx.store.get_package(&fx.package.id).await.unwrap().is_none());
        assert_eq!(fx.audit.entries()[0].action, AuditAction::Delete);
    }

    #[test]
    fn bulk_action_parses() {
        assert_eq!("activate".parse::<BulkPackageAction>().unwrap(), BulkPackageAction::Activate);
        assert!("archive".parse::<BulkPackageAction>().is_err());
    }
}
