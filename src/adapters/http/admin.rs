//! Administrator endpoints: catalog management, quota ledger, orders and
//! payments. Every handler requires [`RequireAdmin`].

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::json;

use crate::application::handlers::catalog::{
    BulkPackageActionCommand, CreateCategoryCommand, CreateFeatureCommand, CreatePackageCommand,
    DeleteCategoryCommand, DeleteFeatureCommand, DeletePackageCommand, GetPackageQuery,
    ListPackagesQuery, UpdateCategoryCommand, UpdateFeatureCommand, UpdatePackageCommand,
};
use crate::application::handlers::customization::{
    BulkSetLimitsCommand, RemoveLimitCommand, SetLimitCommand,
};
use crate::application::handlers::order::{CancelOrderCommand, GenerateInvoiceCommand};
use crate::application::handlers::payment::{RecordManualPaymentCommand, RefundPaymentCommand};
use crate::domain::foundation::{CategoryId, FeatureId, LimitId, OrderId, PackageId, PaymentId, UserId};
use crate::domain::SalesError;

use super::dto::{
    BulkLimitsRequest, BulkPackageRequest, CategoryRequest, FeatureRequest, InvoiceResponse,
    ManualPaymentRequest, OrderListParams, PackageRequest, PaymentListParams, SetLimitRequest,
};
use super::middleware::RequireAdmin;
use super::{ApiError, AppState};

/// Admin routes, mounted under `/api/admin`.
///
/// # Routes
///
/// ## Catalog
/// - `GET|POST /categories`, `PUT|DELETE /categories/:id`
/// - `GET|POST /features`, `PUT|DELETE /features/:id`
/// - `GET|POST /packages`, `GET|PUT|DELETE /packages/:id`, `POST /packages/bulk`
///
/// ## Quota ledger
/// - `GET|PUT /users/:user_id/limits`, `DELETE /users/:user_id/limits/:limit_id`
/// - `POST /limits/bulk`
///
/// ## Orders
/// - `GET /orders`, `GET /orders/:id`
/// - `POST /orders/:id/cancel`, `POST /orders/:id/invoice`
///
/// ## Payments
/// - `GET /payments`, `GET /payments/stats`, `GET /payments/:id`
/// - `POST /payments/:id/refund`, `POST /payments/manual`
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // Catalog
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/:id", put(update_category).delete(delete_category))
        .route("/features", get(list_features).post(create_feature))
        .route("/features/:id", put(update_feature).delete(delete_feature))
        .route("/packages", get(list_packages).post(create_package))
        .route("/packages/bulk", post(bulk_packages))
        .route(
            "/packages/:id",
            get(get_package).put(update_package).delete(delete_package),
        )
        // Quota ledger
        .route("/users/:user_id/limits", get(list_limits).put(set_limit))
        .route("/users/:user_id/limits/:limit_id", delete(remove_limit))
        .route("/limits/bulk", post(bulk_limits))
        // Orders
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/orders/:id/invoice", post(generate_invoice))
        // Payments
        .route("/payments", get(list_payments))
        .route("/payments/stats", get(payment_stats))
        .route("/payments/manual", post(record_manual_payment))
        .route("/payments/:id", get(get_payment))
        .route("/payments/:id/refund", post(refund_payment))
}

// ════════════════════════════════════════════════════════════════════════════════
// Categories
// ════════════════════════════════════════════════════════════════════════════════

pub async fn list_categories(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .catalog
        .list_categories()
        .await
        .map_err(SalesError::from)?;
    Ok(Json(json!({ "categories": categories })))
}

pub async fn create_category(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    body: Result<Json<CategoryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let category = state
        .create_category_handler()
        .handle(CreateCategoryCommand {
            actor,
            fields: request.into(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    id: Result<Path<CategoryId>, PathRejection>,
    body: Result<Json<CategoryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(category_id) = id?;
    let Json(request) = body?;
    let category = state
        .update_category_handler()
        .handle(UpdateCategoryCommand {
            actor,
            category_id,
            fields: request.into(),
        })
        .await?;
    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    id: Result<Path<CategoryId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(category_id) = id?;
    state
        .delete_category_handler()
        .handle(DeleteCategoryCommand { actor, category_id })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ════════════════════════════════════════════════════════════════════════════════
// Features
// ════════════════════════════════════════════════════════════════════════════════

pub async fn list_features(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<impl IntoResponse, ApiError> {
    let features = state.list_features_handler().handle().await?;
    Ok(Json(json!({ "features": features })))
}

pub async fn create_feature(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    body: Result<Json<FeatureRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let feature = state
        .create_feature_handler()
        .handle(CreateFeatureCommand {
            actor,
            draft: request.into(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(feature)))
}

pub async fn update_feature(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    id: Result<Path<FeatureId>, PathRejection>,
    body: Result<Json<FeatureRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(feature_id) = id?;
    let Json(request) = body?;
    let feature = state
        .update_feature_handler()
        .handle(UpdateFeatureCommand {
            actor,
            feature_id,
            draft: request.into(),
        })
        .await?;
    Ok(Json(feature))
}

pub async fn delete_feature(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    id: Result<Path<FeatureId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(feature_id) = id?;
    state
        .delete_feature_handler()
        .handle(DeleteFeatureCommand { actor, feature_id })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ════════════════════════════════════════════════════════════════════════════════
// Packages
// ════════════════════════════════════════════════════════════════════════════════

pub async fn list_packages(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .list_packages_handler()
        .handle(ListPackagesQuery {
            include_inactive: true,
        })
        .await?;
    Ok(Json(json!({ "categories": categories })))
}

pub async fn get_package(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    id: Result<Path<PackageId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(package_id) = id?;
    let details = state
        .get_package_handler()
        .handle(GetPackageQuery {
            package_id,
            include_inactive: true,
        })
        .await?;
    Ok(Json(details))
}

pub async fn create_package(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    body: Result<Json<PackageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let package = state
        .create_package_handler()
        .handle(CreatePackageCommand {
            actor,
            draft: request.into(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(package)))
}

pub async fn update_package(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    id: Result<Path<PackageId>, PathRejection>,
    body: Result<Json<PackageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(package_id) = id?;
    let Json(request) = body?;
    let package = state
        .update_package_handler()
        .handle(UpdatePackageCommand {
            actor,
            package_id,
            draft: request.into(),
        })
        .await?;
    Ok(Json(package))
}

pub async fn delete_package(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    id: Result<Path<PackageId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(package_id) = id?;
    state
        .delete_package_handler()
        .handle(DeletePackageCommand { actor, package_id })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_packages(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    body: Result<Json<BulkPackageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let result = state
        .bulk_package_handler()
        .handle(BulkPackageActionCommand {
            actor,
            action: request.action,
            package_ids: request.package_ids,
        })
        .await?;
    Ok(Json(result))
}

// ════════════════════════════════════════════════════════════════════════════════
// Quota ledger
// ════════════════════════════════════════════════════════════════════════════════

pub async fn list_limits(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    user: Result<Path<UserId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(user_id) = user?;
    let limits = state.list_limits_handler().handle(&user_id).await?;
    Ok(Json(json!({ "user_id": user_id, "limits": limits })))
}

pub async fn set_limit(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    user: Result<Path<UserId>, PathRejection>,
    body: Result<Json<SetLimitRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(user_id) = user?;
    let Json(request) = body?;
    let limit = state
        .set_limit_handler()
        .handle(SetLimitCommand {
            actor,
            user_id,
            feature_id: request.feature_id,
            max_value: request.max_value,
            is_enforced: request.is_enforced,
        })
        .await?;
    Ok(Json(limit))
}

pub async fn remove_limit(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    ids: Result<Path<(UserId, LimitId)>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path((user_id, limit_id)) = ids?;
    state
        .remove_limit_handler()
        .handle(RemoveLimitCommand {
            actor,
            user_id,
            limit_id,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_limits(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    body: Result<Json<BulkLimitsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let result = state
        .bulk_limits_handler()
        .handle(BulkSetLimitsCommand {
            actor,
            user_ids: request.user_ids,
            feature_id: request.feature_id,
            max_value: request.max_value,
        })
        .await?;
    Ok(Json(result))
}

// ════════════════════════════════════════════════════════════════════════════════
// Orders
// ════════════════════════════════════════════════════════════════════════════════

pub async fn list_orders(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    params: Result<Query<OrderListParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params?;
    let listing = state.list_orders_handler().handle(params.into()).await?;
    Ok(Json(listing))
}

pub async fn get_order(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    id: Result<Path<OrderId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(order_id) = id?;
    let details = state.get_order_handler().handle(&order_id).await?;
    Ok(Json(details))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    id: Result<Path<OrderId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(order_id) = id?;
    let order = state
        .cancel_order_handler()
        .handle(CancelOrderCommand { actor, order_id })
        .await?;
    Ok(Json(order))
}

pub async fn generate_invoice(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    id: Result<Path<OrderId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(order_id) = id?;
    let result = state
        .generate_invoice_handler()
        .handle(GenerateInvoiceCommand { actor, order_id })
        .await?;
    let status = if result.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let response = InvoiceResponse {
        created: result.created,
        invoice: result.invoice,
    };
    Ok((status, Json(response)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Payments
// ════════════════════════════════════════════════════════════════════════════════

pub async fn list_payments(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    params: Result<Query<PaymentListParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params?;
    let payments = state.list_payments_handler().handle(params.into()).await?;
    Ok(Json(json!({ "payments": payments })))
}

pub async fn payment_stats(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<impl IntoResponse, ApiError> {
    let dashboard = state.payment_stats_handler().handle().await?;
    Ok(Json(dashboard))
}

pub async fn get_payment(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    id: Result<Path<PaymentId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(payment_id) = id?;
    let payment = state.get_payment_handler().handle(&payment_id).await?;
    Ok(Json(payment))
}

pub async fn refund_payment(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    id: Result<Path<PaymentId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(payment_id) = id?;
    let result = state
        .refund_payment_handler()
        .handle(RefundPaymentCommand { actor, payment_id })
        .await?;
    Ok(Json(json!({ "payment": result.payment, "order": result.order })))
}

pub async fn record_manual_payment(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    body: Result<Json<ManualPaymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let payment = state
        .manual_payment_handler()
        .handle(RecordManualPaymentCommand {
            actor,
            order_id: request.order_id,
            gateway: request.gateway,
            transaction_id: request.transaction_id,
            reference_id: request.reference_id,
            status: request.status,
            currency: state.payment_options.currency.clone(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}
