//! Quota ledger and order ports over `customization_limits` and `orders`.
//!
//! Order creation and quota consumption share one transaction: the order
//! row is inserted, each touched quota row is locked `FOR UPDATE`, every
//! quota is checked, and only then are the increments written.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::customization::CustomizationLimit;
use crate::domain::foundation::{
    DomainError, ErrorCode, FeatureId, LimitId, OrderId, PackageId, UserId,
};
use crate::domain::ordering::{Order, OrderStatus};
use crate::ports::{LimitRepository, OrderFilter, OrderRepository, OrderStats, QuotaConsumption};

use super::{
    commit, count, corrupt, db_error, money, not_found, parse_column, timestamp, user_id,
    write_error, PostgresSalesStore,
};

const LIMIT_COLUMNS: &str = "id, user_id, feature_id, max_value, current_value, is_enforced, \
     created_at, updated_at";

const ORDER_COLUMNS: &str = "id, user_id, package_id, order_number, customization_data, \
     subtotal, tax_amount, total_amount, billing_cycle, status, notes, custom_fields, \
     created_at, updated_at, deleted_at";

#[derive(Debug, sqlx::FromRow)]
struct LimitRow {
    id: Uuid,
    user_id: String,
    feature_id: Uuid,
    max_value: Decimal,
    current_value: Decimal,
    is_enforced: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LimitRow> for CustomizationLimit {
    type Error = DomainError;

    fn try_from(row: LimitRow) -> Result<Self, Self::Error> {
        if row.current_value.is_sign_negative() {
            return Err(corrupt("current_value", row.current_value));
        }
        Ok(CustomizationLimit {
            id: LimitId::from_uuid(row.id),
            user_id: user_id(row.user_id)?,
            feature_id: FeatureId::from_uuid(row.feature_id),
            max_value: row.max_value,
            current_value: row.current_value,
            is_enforced: row.is_enforced,
            created_at: timestamp(row.created_at),
            updated_at: timestamp(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: String,
    package_id: Uuid,
    order_number: String,
    customization_data: Json<BTreeMap<FeatureId, Value>>,
    subtotal: Decimal,
    tax_amount: Decimal,
    total_amount: Decimal,
    billing_cycle: String,
    status: String,
    notes: Option<String>,
    custom_fields: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: OrderId::from_uuid(row.id),
            user_id: user_id(row.user_id)?,
            package_id: PackageId::from_uuid(row.package_id),
            order_number: row.order_number,
            customization_data: row.customization_data.0,
            subtotal: money("subtotal", row.subtotal)?,
            tax_amount: money("tax_amount", row.tax_amount)?,
            total_amount: money("total_amount", row.total_amount)?,
            billing_cycle: parse_column("billing_cycle", &row.billing_cycle)?,
            status: parse_column("status", &row.status)?,
            notes: row.notes,
            custom_fields: row.custom_fields,
            created_at: timestamp(row.created_at),
            updated_at: timestamp(row.updated_at),
            deleted_at: row.deleted_at.map(timestamp),
        })
    }
}

/// Locks the `(user, feature)` quota row for the rest of the transaction.
async fn lock_limit(
    conn: &mut PgConnection,
    user_id: &UserId,
    feature_id: &FeatureId,
) -> Result<Option<CustomizationLimit>, DomainError> {
    let row: Option<LimitRow> = sqlx::query_as(&format!(
        "SELECT {} FROM customization_limits WHERE user_id = $1 AND feature_id = $2 FOR UPDATE",
        LIMIT_COLUMNS
    ))
    .bind(user_id.as_str())
    .bind(feature_id.as_uuid())
    .fetch_optional(conn)
    .await
    .map_err(|e| db_error("lock customization limit", e))?;

    row.map(CustomizationLimit::try_from).transpose()
}

/// Locks the order row and writes its new status, refusing a status the
/// stored one cannot lead to.
pub(super) async fn write_order_status(conn: &mut PgConnection, order: &Order) -> Result<(), DomainError> {
    let stored: Option<String> = sqlx::query_scalar(
        "SELECT status FROM orders WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
    )
    .bind(order.id.as_uuid())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| db_error("lock order", e))?;

    let stored: OrderStatus = match stored {
        Some(raw) => parse_column("status", &raw)?,
        None => return Err(not_found(ErrorCode::OrderNotFound, order.id)),
    };
    order.ensure_replaces(stored)?;

    sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
        .bind(order.id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.updated_at.as_datetime())
        .execute(&mut *conn)
        .await
        .map_err(|e| db_error("update order status", e))?;
    Ok(())
}

async fn write_limit(conn: &mut PgConnection, limit: &CustomizationLimit) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        UPDATE customization_limits SET
            max_value = $2,
            current_value = $3,
            is_enforced = $4,
            updated_at = $5
        WHERE id = $1
        "#,
    )
    .bind(limit.id.as_uuid())
    .bind(limit.max_value)
    .bind(limit.current_value)
    .bind(limit.is_enforced)
    .bind(limit.updated_at.as_datetime())
    .execute(conn)
    .await
    .map_err(|e| db_error("update customization limit", e))?;
    Ok(())
}

#[async_trait]
impl LimitRepository for PostgresSalesStore {
    async fn get_limit(
        &self,
        user_id: &UserId,
        feature_id: &FeatureId,
    ) -> Result<Option<CustomizationLimit>, DomainError> {
        let row: Option<LimitRow> = sqlx::query_as(&format!(
            "SELECT {} FROM customization_limits WHERE user_id = $1 AND feature_id = $2",
            LIMIT_COLUMNS
        ))
        .bind(user_id.as_str())
        .bind(feature_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch customization limit", e))?;

        row.map(CustomizationLimit::try_from).transpose()
    }

    async fn find_by_id(&self, id: &LimitId) -> Result<Option<CustomizationLimit>, DomainError> {
        let row: Option<LimitRow> = sqlx::query_as(&format!(
            "SELECT {} FROM customization_limits WHERE id = $1",
            LIMIT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch customization limit", e))?;

        row.map(CustomizationLimit::try_from).transpose()
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<CustomizationLimit>, DomainError> {
        let rows: Vec<LimitRow> = sqlx::query_as(&format!(
            "SELECT {} FROM customization_limits WHERE user_id = $1 ORDER BY created_at",
            LIMIT_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list customization limits", e))?;

        rows.into_iter().map(CustomizationLimit::try_from).collect()
    }

    async fn upsert_limit(&self, limit: &CustomizationLimit) -> Result<CustomizationLimit, DomainError> {
        let mut tx = self.begin().await?;

        let inserted: Option<LimitRow> = sqlx::query_as(&format!(
            r#"
            INSERT INTO customization_limits (
                id, user_id, feature_id, max_value, current_value, is_enforced,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT ON CONSTRAINT customization_limits_user_feature_key DO NOTHING
            RETURNING {}
            "#,
            LIMIT_COLUMNS
        ))
        .bind(limit.id.as_uuid())
        .bind(limit.user_id.as_str())
        .bind(limit.feature_id.as_uuid())
        .bind(limit.max_value)
        .bind(limit.current_value)
        .bind(limit.is_enforced)
        .bind(limit.created_at.as_datetime())
        .bind(limit.updated_at.as_datetime())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("insert customization limit", e))?;

        let saved = match inserted {
            Some(row) => CustomizationLimit::try_from(row)?,
            None => {
                // Existing row keeps its id and consumption.
                let mut existing = lock_limit(&mut tx, &limit.user_id, &limit.feature_id)
                    .await?
                    .ok_or_else(|| DomainError::database("customization limit vanished during upsert"))?;
                existing.reconfigure(limit.max_value, limit.is_enforced)?;
                write_limit(&mut tx, &existing).await?;
                existing
            }
        };

        commit(tx).await?;
        Ok(saved)
    }

    async fn delete_limit(&self, id: &LimitId) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM customization_limits WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete customization limit", e))?;

        if result.rows_affected() == 0 {
            return Err(not_found(ErrorCode::LimitNotFound, id));
        }
        Ok(())
    }

    async fn increment_usage(
        &self,
        user_id: &UserId,
        feature_id: &FeatureId,
        amount: Decimal,
    ) -> Result<Option<CustomizationLimit>, DomainError> {
        let mut tx = self.begin().await?;
        let Some(mut limit) = lock_limit(&mut tx, user_id, feature_id).await? else {
            return Ok(None);
        };
        limit.consume(amount)?;
        write_limit(&mut tx, &limit).await?;
        commit(tx).await?;
        Ok(Some(limit))
    }
}

#[async_trait]
impl OrderRepository for PostgresSalesStore {
    async fn create_with_consumption(
        &self,
        order: &Order,
        consumption: &[QuotaConsumption],
    ) -> Result<(), DomainError> {
        let mut tx = self.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, package_id, order_number, customization_data, subtotal,
                tax_amount, total_amount, billing_cycle, status, notes, custom_fields,
                created_at, updated_at, deleted_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_str())
        .bind(order.package_id.as_uuid())
        .bind(&order.order_number)
        .bind(Json(&order.customization_data))
        .bind(order.subtotal.to_decimal())
        .bind(order.tax_amount.to_decimal())
        .bind(order.total_amount.to_decimal())
        .bind(order.billing_cycle.as_str())
        .bind(order.status.as_str())
        .bind(&order.notes)
        .bind(&order.custom_fields)
        .bind(order.created_at.as_datetime())
        .bind(order.updated_at.as_datetime())
        .bind(order.deleted_at.as_ref().map(|t| *t.as_datetime()))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            write_error("save order", e, |constraint: &str| {
                (constraint == "orders_order_number_key")
                    .then(|| format!("order number '{}' is taken", order.order_number))
            })
        })?;

        // Lock in feature order so concurrent checkouts cannot deadlock.
        let mut items: Vec<&QuotaConsumption> = consumption.iter().collect();
        items.sort_by_key(|item| item.feature_id);

        let mut locked = Vec::with_capacity(items.len());
        for item in items {
            if let Some(limit) = lock_limit(&mut tx, &order.user_id, &item.feature_id).await? {
                // Dropping the transaction rolls back the order insert.
                if !limit.can_add_more(item.amount) {
                    return Err(limit.violation(item.amount).into());
                }
                locked.push((limit, item.amount));
            }
        }
        for (mut limit, amount) in locked {
            limit.consume(amount)?;
            write_limit(&mut tx, &limit).await?;
        }

        commit(tx).await
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE id = $1 AND deleted_at IS NULL",
            ORDER_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch order", e))?;

        row.map(Order::try_from).transpose()
    }

    async fn update_status(&self, order: &Order) -> Result<(), DomainError> {
        let mut tx = self.begin().await?;
        write_order_status(&mut tx, order).await?;
        commit(tx).await
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, DomainError> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM orders WHERE deleted_at IS NULL",
            ORDER_COLUMNS
        ));
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(user_id) = &filter.user_id {
            query.push(" AND user_id = ").push_bind(user_id.as_str().to_string());
        }
        query.push(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows: Vec<OrderRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list orders", e))?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn stats(&self) -> Result<OrderStats, DomainError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM orders WHERE deleted_at IS NULL GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("count orders", e))?;

        let mut stats = OrderStats::default();
        for (status, n) in rows {
            stats.add(parse_column("status", &status)?, count(n));
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::BillingCycle;
    use crate::domain::foundation::Money;
    use crate::domain::ordering::OrderStatus;
    use serde_json::json;

    fn limit_row(current: Decimal) -> LimitRow {
        let now = Utc::now();
        LimitRow {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            feature_id: Uuid::new_v4(),
            max_value: Decimal::from(100),
            current_value: current,
            is_enforced: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn limit_row_converts() {
        let limit = CustomizationLimit::try_from(limit_row(Decimal::from(40))).unwrap();
        assert_eq!(limit.user_id.as_str(), "user-1");
        assert_eq!(limit.remaining_capacity(), Decimal::from(60));
    }

    #[test]
    fn negative_consumption_is_corrupt() {
        assert!(CustomizationLimit::try_from(limit_row(Decimal::from(-1))).is_err());
    }

    #[test]
    fn order_row_converts() {
        let feature = FeatureId::new();
        let now = Utc::now();
        let row = OrderRow {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            package_id: Uuid::new_v4(),
            order_number: "2024070400001".to_string(),
            customization_data: Json(BTreeMap::from([(feature, json!(20))])),
            subtotal: Decimal::new(10400, 2),
            tax_amount: Decimal::new(1560, 2),
            total_amount: Decimal::new(11960, 2),
            billing_cycle: "monthly".to_string(),
            status: "pending".to_string(),
            notes: None,
            custom_fields: json!({}),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let order = Order::try_from(row).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.billing_cycle, BillingCycle::Monthly);
        assert_eq!(order.total_amount, Money::from_cents(11960));
        assert_eq!(order.customization_data.get(&feature), Some(&json!(20)));
    }
}
