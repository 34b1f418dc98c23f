//! Quota ledger port.
//!
//! The ledger is the only hot shared state in the system. Every mutation
//! of `current_value` must be serialized per `(user, feature)`.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::customization::CustomizationLimit;
use crate::domain::foundation::{DomainError, FeatureId, LimitId, UserId};

#[async_trait]
pub trait LimitRepository: Send + Sync {
    /// Quota row for one user and feature.
    async fn get_limit(
        &self,
        user_id: &UserId,
        feature_id: &FeatureId,
    ) -> Result<Option<CustomizationLimit>, DomainError>;

    async fn find_by_id(&self, id: &LimitId) -> Result<Option<CustomizationLimit>, DomainError>;

    /// Every quota row the user has.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<CustomizationLimit>, DomainError>;

    /// Inserts, or updates `max_value` and `is_enforced` of the existing
    /// `(user, feature)` row. Consumption is never reset.
    ///
    /// Returns the row as stored.
    async fn upsert_limit(&self, limit: &CustomizationLimit) -> Result<CustomizationLimit, DomainError>;

    /// # Errors
    ///
    /// - `LimitNotFound` if no such row
    async fn delete_limit(&self, id: &LimitId) -> Result<(), DomainError>;

    /// Atomically checks and consumes quota.
    ///
    /// A missing row is a no-op returning `None`.
    ///
    /// # Errors
    ///
    /// - `LimitExceeded` if the row is enforced and would overflow; the
    ///   row is left unchanged
    async fn increment_usage(
        &self,
        user_id: &UserId,
        feature_id: &FeatureId,
        amount: Decimal,
    ) -> Result<Option<CustomizationLimit>, DomainError>;
}
