//! Feature administration.

use std::sync::Arc;

use serde_json::json;

use crate::domain::catalog::{Feature, FeatureDraft};
use crate::domain::foundation::{CategoryId, FeatureId, UserId};
use crate::domain::SalesError;
use crate::ports::{AuditAction, AuditEntry, AuditLog, CatalogReader, CatalogRepository};

const ENTITY: &str = "Feature";

async fn ensure_category(reader: &dyn CatalogReader, id: CategoryId) -> Result<(), SalesError> {
    match reader.get_category(&id).await? {
        Some(_) => Ok(()),
        None => Err(SalesError::not_found("category", id)),
    }
}

#[derive(Debug, Clone)]
pub struct CreateFeatureCommand {
    pub actor: UserId,
    pub draft: FeatureDraft,
}

pub struct CreateFeatureHandler {
    reader: Arc<dyn CatalogReader>,
    repository: Arc<dyn CatalogRepository>,
    audit: Arc<dyn AuditLog>,
}

impl CreateFeatureHandler {
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

    pub async fn handle(&self, cmd: CreateFeatureCommand) -> Result<Feature, SalesError> {
        cmd.draft.validate()?;
        ensure_category(self.reader.as_ref(), cmd.draft.category_id).await?;

        let feature = Feature::create(cmd.draft)?;
        self.repository.save_feature(&feature).await?;

        tracing::info!(feature_id = %feature.id, kind = feature.kind.type_name(), "Feature created");
        self.audit.record(
            AuditEntry::new(AuditAction::Create, ENTITY, feature.id, json!(feature)).by(&cmd.actor),
        );
        Ok(feature)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateFeatureCommand {
    pub actor: UserId,
    pub feature_id: FeatureId,
    pub draft: FeatureDraft,
}

pub struct UpdateFeatureHandler {
    reader: Arc<dyn CatalogReader>,
    repository: Arc<dyn CatalogRepository>,
    audit: Arc<dyn AuditLog>,
}

impl UpdateFeatureHandler {
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

    pub async fn handle(&self, cmd: UpdateFeatureCommand) -> Result<Feature, SalesError> {
        let mut feature = self
            .reader
            .get_feature(&cmd.feature_id)
            .await?
            .ok_or_else(|| SalesError::not_found("feature", cmd.feature_id))?;
        if feature.category_id != cmd.draft.category_id {
            ensure_category(self.reader.as_ref(), cmd.draft.category_id).await?;
        }

        feature.apply(cmd.draft)?;
        self.repository.update_feature(&feature).await?;

        self.audit.record(
            AuditEntry::new(AuditAction::Update, ENTITY, feature.id, json!(feature)).by(&cmd.actor),
        );
        Ok(feature)
    }
}

#[derive(Debug, Clone)]
pub struct DeleteFeatureCommand {
    pub actor: UserId,
    pub feature_id: FeatureId,
}

pub struct DeleteFeatureHandler {
    reader: Arc<dyn CatalogReader>,
    repository: Arc<dyn CatalogRepository>,
    audit: Arc<dyn AuditLog>,
}

impl DeleteFeatureHandler {
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

    /// Soft delete. Existing orders keep their frozen values.
    pub async fn handle(&self, cmd: DeleteFeatureCommand) -> Result<(), SalesError> {
        let mut feature = self
            .reader
            .get_feature(&cmd.feature_id)
            .await?
            .ok_or_else(|| SalesError::not_found("feature", cmd.feature_id))?;

        feature.soft_delete();
        self.repository.update_feature(&feature).await?;

        self.audit.record(
            AuditEntry::new(AuditAction::Delete, ENTITY, feature.id, json!({ "slug": feature.slug }))
                .by(&cmd.actor),
        );
        Ok(())
    }
}

/// Admin listing of every live feature.
pub struct ListFeaturesHandler {
    reader: Arc<dyn CatalogReader>,
}

impl ListFeaturesHandler {
    pub fn new(reader: Arc<dyn CatalogReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(&self) -> Result<Vec<Feature>, SalesError> {
        Ok(self.reader.list_features().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_fixtures::{user, Fixture};
    use crate::domain::catalog::FeatureKind;
    use crate::domain::foundation::Money;

    fn draft(category_id: CategoryId, kind: FeatureKind) -> FeatureDraft {
        FeatureDraft {
            category_id,
            name: "Backups".to_string(),
            slug: "backups".to_string(),
            description: None,
            kind,
            default_value: None,
            base_price: Money::from_major(2),
            is_customizable: true,
            is_active: true,
            display_order: 3,
        }
    }

    #[tokio::test]
    async fn creates_feature_in_existing_category() {
        let fx = Fixture::new().await;
        let handler = CreateFeatureHandler::new(fx.store.clone(), fx.store.clone(), fx.audit.clone());

        let feature = handler
            .handle(CreateFeatureCommand {
                actor: user("admin"),
                draft: draft(fx.category.id, FeatureKind::Boolean),
            })
            .await
            .unwrap();

        assert_eq!(feature.slug, "backups");
        assert_eq!(fx.audit.entries()[0].entity_type, "Feature");
    }

    #[tokio::test]
    async fn empty_dropdown_is_rejected() {
        let fx = Fixture::new().await;
        let handler = CreateFeatureHandler::new(fx.store.clone(), fx.store.clone(), fx.audit.clone());

        let result = handler
            .handle(CreateFeatureCommand {
                actor: user("admin"),
                draft: draft(fx.category.id, FeatureKind::Dropdown { options: vec![] }),
            })
            .await;

        assert!(matches!(result, Err(SalesError::ValidationFailed { .. })));
    }

    #[tokio::test]
    async fn unknown_category_is_not_found() {
        let fx = Fixture::new().await;
        let handler = CreateFeatureHandler::new(fx.store.clone(), fx.store.clone(), fx.audit.clone());

        let result = handler
            .handle(CreateFeatureCommand {
                actor: user("admin"),
                draft: draft(CategoryId::new(), FeatureKind::Text),
            })
            .await;

        assert!(matches!(result, Err(SalesError::NotFound { resource: "category", .. })));
    }

    #[tokio::test]
    async fn deleted_feature_leaves_listing() {
        let fx = Fixture::new().await;
        DeleteFeatureHandler::new(fx.store.clone(), fx.store.clone(), fx.audit.clone())
            .handle(DeleteFeatureCommand {
                actor: user("admin"),
                feature_id: fx.dedicated_ip.id,
            })
            .await
            .unwrap();

        let features = ListFeaturesHandler::new(fx.store.clone()).handle().await.unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id, fx.storage.id);
    }
}
