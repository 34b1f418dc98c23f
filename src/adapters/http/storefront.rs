//! Customer-facing endpoints: catalog browsing, customization, checkout
//! and payment.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::application::handlers::catalog::{GetPackageQuery, ListPackagesQuery};
use crate::application::handlers::checkout::ProcessCheckoutCommand;
use crate::application::handlers::customization::{
    CalculatePriceQuery, PreviewCustomizationCommand, ValidateCustomizationQuery,
};
use crate::application::handlers::payment::ProcessPaymentCommand;
use crate::domain::foundation::{OrderId, PackageId};

use super::dto::{
    CheckoutRequest, CheckoutResponse, CustomizationRequest, PaymentRequest, PaymentResponse,
};
use super::middleware::RequireUser;
use super::{ApiError, AppState};

/// Storefront routes, mounted under `/api`.
///
/// # Routes
///
/// ## Public
/// - `GET /packages` - Active packages grouped by category
/// - `GET /packages/:id` - One active package with its features
/// - `POST /packages/:id/price` - Price a customization
///
/// ## Customer (require `X-User-Id`)
/// - `POST /packages/:id/customize` - Preview, failing on the first quota breach
/// - `POST /packages/:id/validate` - Every problem, keyed by request index
/// - `POST /checkout` - Create a pending order
/// - `GET /payment/:order_id` - Order with its payment attempts
/// - `POST /payment/:order_id` - Attempt a payment
pub fn storefront_routes() -> Router<AppState> {
    Router::new()
        .route("/packages", get(list_packages))
        .route("/packages/:id", get(get_package))
        .route("/packages/:id/price", post(calculate_price))
        .route("/packages/:id/customize", post(preview_customization))
        .route("/packages/:id/validate", post(validate_customization))
        .route("/checkout", post(checkout))
        .route("/payment/:order_id", get(get_order_payment).post(process_payment))
}

/// GET /api/packages
pub async fn list_packages(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .list_packages_handler()
        .handle(ListPackagesQuery::default())
        .await?;
    Ok(Json(json!({ "categories": categories })))
}

/// GET /api/packages/:id
pub async fn get_package(
    State(state): State<AppState>,
    id: Result<Path<PackageId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(package_id) = id?;
    let details = state
        .get_package_handler()
        .handle(GetPackageQuery {
            package_id,
            include_inactive: false,
        })
        .await?;
    Ok(Json(details))
}

/// POST /api/packages/:id/price
pub async fn calculate_price(
    State(state): State<AppState>,
    id: Result<Path<PackageId>, PathRejection>,
    body: Result<Json<CustomizationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(package_id) = id?;
    let Json(request) = body?;
    let breakdown = state
        .calculate_price_handler()
        .handle(CalculatePriceQuery {
            package_id,
            customization: request.customization,
        })
        .await?;
    Ok(Json(breakdown))
}

/// POST /api/packages/:id/customize
pub async fn preview_customization(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    id: Result<Path<PackageId>, PathRejection>,
    body: Result<Json<CustomizationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(package_id) = id?;
    let Json(request) = body?;
    let preview = state
        .preview_customization_handler()
        .handle(PreviewCustomizationCommand {
            user_id,
            package_id,
            customization: request.customization,
            billing_cycle: request.billing_cycle,
        })
        .await?;
    Ok(Json(preview))
}

/// POST /api/packages/:id/validate
///
/// Always 200 when the package exists; the body says whether it is valid.
pub async fn validate_customization(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    id: Result<Path<PackageId>, PathRejection>,
    body: Result<Json<CustomizationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(package_id) = id?;
    let Json(request) = body?;
    let validation = state
        .validate_customization_handler()
        .handle(ValidateCustomizationQuery {
            user_id,
            package_id,
            customization: request.customization,
        })
        .await?;
    Ok(Json(validation))
}

/// POST /api/checkout
pub async fn checkout(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let result = state
        .checkout_handler()
        .handle(ProcessCheckoutCommand {
            user_id,
            package_id: request.package_id,
            customization: request.customization,
            billing_cycle: request.billing_cycle,
            custom_fields: request.custom_fields.unwrap_or_else(|| json!({})),
        })
        .await?;

    let response = CheckoutResponse {
        success: true,
        order_id: result.order.id,
        order_number: result.order.order_number,
        total_amount: result.order.total_amount,
        payment_url: result.payment_url,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/payment/:order_id
pub async fn get_order_payment(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    id: Result<Path<OrderId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(order_id) = id?;
    let view = state
        .order_payment_handler()
        .handle(&user_id, &order_id)
        .await?;
    Ok(Json(view))
}

/// POST /api/payment/:order_id
pub async fn process_payment(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    id: Result<Path<OrderId>, PathRejection>,
    body: Result<Json<PaymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(order_id) = id?;
    let Json(request) = body?;
    let result = state
        .process_payment_handler()
        .handle(ProcessPaymentCommand {
            user_id,
            order_id,
            gateway: request.gateway,
            input: request.input.unwrap_or_else(|| json!({})),
        })
        .await?;

    // Declines come back as errors; a pending redirect is still a success.
    let response = PaymentResponse {
        success: true,
        payment_id: result.payment.id,
        status: result.payment.status,
        redirect_url: result.redirect_url,
    };
    Ok(Json(response))
}
