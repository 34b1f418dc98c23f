//! Category administration: create, update, soft delete.

use std::sync::Arc;

use serde_json::json;

use crate::domain::catalog::Category;
use crate::domain::foundation::{CategoryId, UserId};
use crate::domain::SalesError;
use crate::ports::{AuditAction, AuditEntry, AuditLog, CatalogReader, CatalogRepository};

const ENTITY: &str = "Category";

/// Editable category fields.
#[derive(Debug, Clone)]
pub struct CategoryFields {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub display_order: i32,
}

#[derive(Debug, Clone)]
pub struct CreateCategoryCommand {
    pub actor: UserId,
    pub fields: CategoryFields,
}

pub struct CreateCategoryHandler {
    repository: Arc<dyn CatalogRepository>,
    audit: Arc<dyn AuditLog>,
}

impl CreateCategoryHandler {
    pub fn new(repository: Arc<dyn CatalogRepository>, audit: Arc<dyn AuditLog>) -> Self {
        Self { repository, audit }
    }

    pub async fn handle(&self, cmd: CreateCategoryCommand) -> Result<Category, SalesError> {
        let f = cmd.fields;
        let mut category = Category::new(f.name, f.slug, f.description, f.display_order)?;
        category.is_active = f.is_active;
        self.repository.save_category(&category).await?;

        tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
        self.audit.record(
            AuditEntry::new(AuditAction::Create, ENTITY, category.id, json!(category)).by(&cmd.actor),
        );
        Ok(category)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateCategoryCommand {
    pub actor: UserId,
    pub category_id: CategoryId,
    pub fields: CategoryFields,
}

pub struct UpdateCategoryHandler {
    reader: Arc<dyn CatalogReader>,
    repository: Arc<dyn CatalogRepository>,
    audit: Arc<dyn AuditLog>,
}

impl UpdateCategoryHandler {
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

    pub async fn handle(&self, cmd: UpdateCategoryCommand) -> Result<Category, SalesError> {
        let mut category = self
            .reader
            .get_category(&cmd.category_id)
            .await?
            .ok_or_else(|| SalesError::not_found("category", cmd.category_id))?;

        let f = cmd.fields;
        category.apply(f.name, f.slug, f.description, f.is_active, f.display_order)?;
        self.repository.update_category(&category).await?;

        self.audit.record(
            AuditEntry::new(AuditAction::Update, ENTITY, category.id, json!(category)).by(&cmd.actor),
        );
        Ok(category)
    }
}

#[derive(Debug, Clone)]
pub struct DeleteCategoryCommand {
    pub actor: UserId,
    pub category_id: CategoryId,
}

pub struct DeleteCategoryHandler {
    reader: Arc<dyn CatalogReader>,
    repository: Arc<dyn CatalogRepository>,
    audit: Arc<dyn AuditLog>,
}

impl DeleteCategoryHandler {
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

    pub async fn handle(&self, cmd: DeleteCategoryCommand) -> Result<(), SalesError> {
        let mut category = self
            .reader
            .get_category(&cmd.category_id)
            .await?
            .ok_or_else(|| SalesError::not_found("category", cmd.category_id))?;

        category.soft_delete();
        self.repository.update_category(&category).await?;

        self.audit.record(
            AuditEntry::new(AuditAction::Delete, ENTITY, category.id, json!({ "slug": category.slug }))
                .by(&cmd.actor),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_fixtures::{user, Fixture};

    fn fields(slug: &str) -> CategoryFields {
        CategoryFields {
            name: "VPS".to_string(),
            slug: slug.to_string(),
            description: None,
            is_active: true,
            display_order: 2,
        }
    }

    #[tokio::test]
    async fn create_persists_and_audits() {
        let fx = Fixture::new().await;
        let handler = CreateCategoryHandler::new(fx.store.clone(), fx.audit.clone());

        let category = handler
            .handle(CreateCategoryCommand {
                actor: user("admin"),
                fields: fields("vps"),
            })
            .await
            .unwrap();

        assert!(fx.store.get_category(&category.id).await.unwrap().is_some());
        let entries = fx.audit.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::Create);
        assert_eq!(entries[0].entity_type, "Category");
    }

    #[tokio::test]
    async fn duplicate_slug_is_a_conflict() {
        let fx = Fixture::new().await;
        let handler = CreateCategoryHandler::new(fx.store.clone(), fx.audit.clone());

        let result = handler
            .handle(CreateCategoryCommand {
                actor: user("admin"),
                fields: fields("shared-hosting"),
            })
            .await;

        assert!(matches!(result, Err(SalesError::Conflict(_))));
        assert!(fx.audit.entries().is_empty());
    }

    #[tokio::test]
    async fn delete_hides_category() {
        let fx = Fixture::new().await;
        DeleteCategoryHandler::new(fx.store.clone(), fx.store.clone(), fx.audit.clone())
            .handle(DeleteCategoryCommand {
                actor: user("admin"),
                category_id: fx.category.id,
            })
            .await
            .unwrap();

        assert!(fx.store.get_category(&fx.category.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_unknown_category_is_not_found() {
        let fx = Fixture::new().await;
        let result = UpdateCategoryHandler::new(fx.store.clone(), fx.store.clone(), fx.audit.clone())
            .handle(UpdateCategoryCommand {
                actor: user("admin"),
                category_id: CategoryId::new(),
                fields: fields("vps"),
            })
            .await;
        assert!(matches!(result, Err(SalesError::NotFound { .. })));
    }
}
