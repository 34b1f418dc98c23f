//! Customization limit administration.
//!
//! Admins set per-user ceilings on customizable features. Reconfiguring a
//! limit never resets what the user has already consumed.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;

use crate::domain::customization::CustomizationLimit;
use crate::domain::foundation::{FeatureId, LimitId, UserId};
use crate::domain::SalesError;
use crate::ports::{AuditAction, AuditEntry, AuditLog, CatalogReader, LimitRepository};

const ENTITY: &str = "CustomizationLimit";

async fn ensure_customizable(catalog: &dyn CatalogReader, feature_id: FeatureId) -> Result<(), SalesError> {
    match catalog.get_feature(&feature_id).await? {
        Some(f) if f.is_customizable => Ok(()),
        Some(_) => Err(SalesError::validation("feature_id", "feature is not customizable")),
        None => Err(SalesError::not_found("feature", feature_id)),
    }
}

#[derive(Debug, Clone)]
pub struct SetLimitCommand {
    pub actor: UserId,
    pub user_id: UserId,
    pub feature_id: FeatureId,
    pub max_value: Decimal,
    /// Defaults to enforced.
    pub is_enforced: Option<bool>,
}

pub struct SetLimitHandler {
    catalog: Arc<dyn CatalogReader>,
    limits: Arc<dyn LimitRepository>,
    audit: Arc<dyn AuditLog>,
}

impl SetLimitHandler {
    pub fn new(
        catalog: Arc<dyn CatalogReader>,
        limits: Arc<dyn LimitRepository>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            catalog,
            limits,
            audit,
        }
    }

    /// Creates or reconfigures the (user, feature) limit.
    pub async fn handle(&self, cmd: SetLimitCommand) -> Result<CustomizationLimit, SalesError> {
        ensure_customizable(self.catalog.as_ref(), cmd.feature_id).await?;
        let draft = CustomizationLimit::new(
            cmd.user_id,
            cmd.feature_id,
            cmd.max_value,
            cmd.is_enforced.unwrap_or(true),
        )?;
        let stored = self.limits.upsert_limit(&draft).await?;

        let action = if stored.id == draft.id {
            AuditAction::Create
        } else {
            AuditAction::Update
        };
        self.audit
            .record(AuditEntry::new(action, ENTITY, stored.id, json!(stored)).by(&cmd.actor));
        Ok(stored)
    }
}

#[derive(Debug, Clone)]
pub struct RemoveLimitCommand {
    pub actor: UserId,
    pub user_id: UserId,
    pub limit_id: LimitId,
}

pub struct RemoveLimitHandler {
    limits: Arc<dyn LimitRepository>,
    audit: Arc<dyn AuditLog>,
}

impl RemoveLimitHandler {
    pub fn new(limits: Arc<dyn LimitRepository>, audit: Arc<dyn AuditLog>) -> Self {
        Self { limits, audit }
    }

    /// The limit must belong to the named user.
    pub async fn handle(&self, cmd: RemoveLimitCommand) -> Result<(), SalesError> {
        let limit = self
            .limits
            .find_by_id(&cmd.limit_id)
            .await?
            .filter(|l| l.user_id == cmd.user_id)
            .ok_or_else(|| SalesError::not_found("limit", cmd.limit_id))?;

        self.limits.delete_limit(&limit.id).await?;
        self.audit.record(
            AuditEntry::new(
                AuditAction::Delete,
                ENTITY,
                limit.id,
                json!({ "user_id": limit.user_id, "feature_id": limit.feature_id }),
            )
            .by(&cmd.actor),
        );
        Ok(())
    }
}

pub struct ListLimitsHandler {
    limits: Arc<dyn LimitRepository>,
}

impl ListLimitsHandler {
    pub fn new(limits: Arc<dyn LimitRepository>) -> Self {
        Self { limits }
    }

    pub async fn handle(&self, user_id: &UserId) -> Result<Vec<CustomizationLimit>, SalesError> {
        Ok(self.limits.list_for_user(user_id).await?)
    }
}

#[derive(Debug, Clone)]
pub struct BulkSetLimitsCommand {
    pub actor: UserId,
    pub user_ids: Vec<UserId>,
    pub feature_id: FeatureId,
    pub max_value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkSetLimitsResult {
    pub updated: usize,
}

pub struct BulkSetLimitsHandler {
    catalog: Arc<dyn CatalogReader>,
    limits: Arc<dyn LimitRepository>,
    audit: Arc<dyn AuditLog>,
}

impl BulkSetLimitsHandler {
    pub fn new(
        catalog: Arc<dyn CatalogReader>,
        limits: Arc<dyn LimitRepository>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            catalog,
            limits,
            audit,
        }
    }

    /// Applies one enforced ceiling to many users.
    pub async fn handle(&self, cmd: BulkSetLimitsCommand) -> Result<BulkSetLimitsResult, SalesError> {
        if cmd.user_ids.is_empty() {
            return Err(SalesError::validation("user_ids", "at least one user is required"));
        }
        ensure_customizable(self.catalog.as_ref(), cmd.feature_id).await?;

        let mut updated = 0;
        for user_id in cmd.user_ids {
            let draft = CustomizationLimit::new(user_id, cmd.feature_id, cmd.max_value, true)?;
            let stored = self.limits.upsert_limit(&draft).await?;
            self.audit.record(
                AuditEntry::new(AuditAction::Update, ENTITY, stored.id, json!(stored)).by(&cmd.actor),
            );
            updated += 1;
        }

        tracing::info!(feature_id = %cmd.feature_id, updated, "Bulk customization limits set");
        Ok(BulkSetLimitsResult { updated })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_fixtures::{user, Fixture};

    fn set(fx: &Fixture, u: &UserId, max: i64, enforced: Option<bool>) -> SetLimitCommand {
        SetLimitCommand {
            actor: user("admin"),
            user_id: u.clone(),
            feature_id: fx.storage.id,
            max_value: Decimal::from(max),
            is_enforced: enforced,
        }
    }

    #[tokio::test]
    async fn set_defaults_to_enforced() {
        let fx = Fixture::new().await;
        let handler = SetLimitHandler::new(fx.store.clone(), fx.store.clone(), fx.audit.clone());

        let limit = handler.handle(set(&fx, &user("u1"), 50, None)).await.unwrap();

        assert!(limit.is_enforced);
        assert_eq!(fx.audit.entries()[0].action, AuditAction::Create);
    }

    #[tokio::test]
    async fn reconfigure_keeps_consumption() {
        let fx = Fixture::new().await;
        let u = user("u1");
        fx.limit_storage(&u, 20, 12).await;
        let handler = SetLimitHandler::new(fx.store.clone(), fx.store.clone(), fx.audit.clone());

        let limit = handler.handle(set(&fx, &u, 40, Some(false))).await.unwrap();

        assert_eq!(limit.current_value, Decimal::from(12));
        assert_eq!(limit.max_value, Decimal::from(40));
        assert!(!limit.is_enforced);
        assert_eq!(fx.audit.entries()[0].action, AuditAction::Update);
    }

    #[tokio::test]
    async fn negative_max_is_rejected() {
        let fx = Fixture::new().await;
        let handler = SetLimitHandler::new(fx.store.clone(), fx.store.clone(), fx.audit.clone());

        let result = handler.handle(set(&fx, &user("u1"), -1, None)).await;

        assert!(matches!(result, Err(SalesError::ValidationFailed { .. })));
    }

    #[tokio::test]
    async fn remove_requires_matching_user() {
        let fx = Fixture::new().await;
        let owner = user("u1");
        let limit = fx.limit_storage(&owner, 20, 0).await;
        let handler = RemoveLimitHandler::new(fx.store.clone(), fx.audit.clone());

        let wrong_user = handler
            .handle(RemoveLimitCommand {
                actor: user("admin"),
                user_id: user("u2"),
                limit_id: limit.id,
            })
            .await;
        assert!(matches!(wrong_user, Err(SalesError::NotFound { .. })));

        handler
            .handle(RemoveLimitCommand {
                actor: user("admin"),
                user_id: owner.clone(),
                limit_id: limit.id,
            })
            .await
            .unwrap();
        assert!(ListLimitsHandler::new(fx.store.clone())
            .handle(&owner)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn bulk_set_applies_to_every_user() {
        let fx = Fixture::new().await;
        let handler = BulkSetLimitsHandler::new(fx.store.clone(), fx.store.clone(), fx.audit.clone());

        let result = handler
            .handle(BulkSetLimitsCommand {
                actor: user("admin"),
                user_ids: vec![user("a"), user("b"), user("c")],
                feature_id: fx.storage.id,
                max_value: Decimal::from(100),
            })
            .await
            .unwrap();

        assert_eq!(result.updated, 3);
        let b = ListLimitsHandler::new(fx.store.clone()).handle(&user("b")).await.unwrap();
        assert!(b[0].is_enforced);
    }
}
