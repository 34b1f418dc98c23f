//! Mapping of use-case errors onto HTTP responses.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::foundation::ValidationError;
use crate::domain::SalesError;

/// Error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// API error wrapping [`SalesError`].
#[derive(Debug)]
pub struct ApiError(pub SalesError);

impl From<SalesError> for ApiError {
    fn from(err: SalesError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(SalesError::validation("body", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(SalesError::validation("path", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(SalesError::validation("query", rejection.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            SalesError::NotFound { .. } => StatusCode::NOT_FOUND,
            SalesError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            SalesError::LimitExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            SalesError::InvalidState { .. } => StatusCode::CONFLICT,
            SalesError::GatewayFailure { .. } => StatusCode::PAYMENT_REQUIRED,
            SalesError::Conflict(_) => StatusCode::CONFLICT,
            SalesError::Forbidden(_) => StatusCode::FORBIDDEN,
            SalesError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = ErrorResponse::new(self.0.code().to_string(), self.0.message());
        match &self.0 {
            SalesError::ValidationFailed { field, .. } => {
                body = body.with_details(json!({ "field": field }));
            }
            SalesError::LimitExceeded {
                feature_id,
                requested,
                remaining,
            } => {
                body = body.with_details(json!({
                    "feature_id": feature_id,
                    "requested": requested,
                    "remaining": remaining,
                }));
            }
            SalesError::InvalidState { current, attempted } => {
                body = body.with_details(json!({ "current": current, "attempted": attempted }));
            }
            SalesError::Infrastructure(msg) => {
                tracing::error!(error = %msg, "Request failed");
                body.message = "Internal server error".to_string();
            }
            _ => {}
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::FeatureId;
    use rust_decimal::Decimal;

    #[test]
    fn status_codes_follow_error_kind() {
        let cases = [
            (SalesError::not_found("order", "x"), StatusCode::NOT_FOUND),
            (SalesError::validation("name", "empty"), StatusCode::BAD_REQUEST),
            (SalesError::invalid_state("completed", "cancel"), StatusCode::CONFLICT),
            (SalesError::gateway_failure("stripe", "declined"), StatusCode::PAYMENT_REQUIRED),
            (SalesError::conflict("slug taken"), StatusCode::CONFLICT),
            (SalesError::forbidden("not yours"), StatusCode::FORBIDDEN),
            (SalesError::infrastructure("db down"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }

    #[test]
    fn limit_exceeded_is_unprocessable() {
        let err = SalesError::LimitExceeded {
            feature_id: FeatureId::new(),
            requested: Decimal::from(10),
            remaining: Decimal::from(3),
        };
        let response = ApiError(err).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn error_response_omits_empty_details() {
        let json = serde_json::to_string(&ErrorResponse::new("NOT_FOUND", "gone")).unwrap();
        assert!(!json.contains("details"));
    }
}
