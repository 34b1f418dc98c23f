//! Use-case error type shared by catalog, checkout and payment handlers.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound | 404 |
//! | ValidationFailed | 400 |
//! | LimitExceeded | 422 |
//! | InvalidState | 409 |
//! | GatewayFailure | 402 |
//! | Conflict | 409 |
//! | Forbidden | 403 |
//! | Infrastructure | 500 |

use rust_decimal::Decimal;

use crate::domain::customization::LimitViolation;
use crate::domain::foundation::{DomainError, ErrorCode, FeatureId, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SalesError {
    /// Entity does not exist or is soft-deleted.
    NotFound { resource: &'static str, id: String },

    /// Request shape or value failed validation.
    ValidationFailed { field: String, message: String },

    /// An enforced customization quota would overflow.
    LimitExceeded {
        feature_id: FeatureId,
        requested: Decimal,
        remaining: Decimal,
    },

    /// Status transition not allowed from the current state.
    InvalidState { current: String, attempted: String },

    /// The gateway declined, errored or timed out.
    ///
    /// The failed payment row is written before this is returned.
    GatewayFailure { gateway: String, reason: String },

    /// Unique-key race lost.
    Conflict(String),

    /// Caller does not own the resource.
    Forbidden(String),

    Infrastructure(String),
}

impl SalesError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        SalesError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SalesError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        SalesError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn gateway_failure(gateway: impl Into<String>, reason: impl Into<String>) -> Self {
        SalesError::GatewayFailure {
            gateway: gateway.into(),
            reason: reason.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        SalesError::Conflict(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        SalesError::Forbidden(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        SalesError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SalesError::NotFound { resource, .. } => match *resource {
                "category" => ErrorCode::CategoryNotFound,
                "feature" => ErrorCode::FeatureNotFound,
                "package" => ErrorCode::PackageNotFound,
                "order" => ErrorCode::OrderNotFound,
                "payment" => ErrorCode::PaymentNotFound,
                "invoice" => ErrorCode::InvoiceNotFound,
                _ => ErrorCode::LimitNotFound,
            },
            SalesError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            SalesError::LimitExceeded { .. } => ErrorCode::LimitExceeded,
            SalesError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            SalesError::GatewayFailure { .. } => ErrorCode::PaymentFailed,
            SalesError::Conflict(_) => ErrorCode::Conflict,
            SalesError::Forbidden(_) => ErrorCode::Forbidden,
            SalesError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-facing message.
    pub fn message(&self) -> String {
        match self {
            SalesError::NotFound { resource, id } => format!("{} not found: {}", capitalize(resource), id),
            SalesError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            SalesError::LimitExceeded { .. } => "Customization limit exceeded.".to_string(),
            SalesError::InvalidState { current, attempted } => {
                format!("Cannot {} while {}", attempted, current)
            }
            SalesError::GatewayFailure { reason, .. } => format!("Payment failed: {}", reason),
            SalesError::Conflict(msg) => format!("Conflict: {}", msg),
            SalesError::Forbidden(msg) => msg.clone(),
            SalesError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Only storage hiccups and lost unique-key races are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SalesError::Infrastructure(_) | SalesError::Conflict(_))
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl std::fmt::Display for SalesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for SalesError {}

impl From<ValidationError> for SalesError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidTransition { from, to } => SalesError::InvalidState {
                current: from.to_lowercase(),
                attempted: format!("move to {}", to.to_lowercase()),
            },
            other => SalesError::ValidationFailed {
                field: other.field().to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl From<LimitViolation> for SalesError {
    fn from(v: LimitViolation) -> Self {
        SalesError::LimitExceeded {
            feature_id: v.feature_id,
            requested: v.requested,
            remaining: v.remaining,
        }
    }
}

impl From<DomainError> for SalesError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::Conflict => SalesError::Conflict(err.message),
            ErrorCode::ValidationFailed => SalesError::ValidationFailed {
                field: err.detail("field").unwrap_or("unknown").to_string(),
                message: err.message,
            },
            ErrorCode::LimitExceeded => {
                let parse = |key: &str| {
                    err.detail(key)
                        .and_then(|v| v.parse::<Decimal>().ok())
                        .unwrap_or(Decimal::ZERO)
                };
                match err.detail("feature_id").and_then(|v| v.parse::<FeatureId>().ok()) {
                    Some(feature_id) => SalesError::LimitExceeded {
                        feature_id,
                        requested: parse("requested"),
                        remaining: parse("remaining"),
                    },
                    None => SalesError::Infrastructure(err.to_string()),
                }
            }
            ErrorCode::InvalidStateTransition => SalesError::InvalidState {
                current: err.detail("current").unwrap_or("unknown").to_string(),
                attempted: err.message,
            },
            code if code.is_not_found() => SalesError::NotFound {
                resource: resource_for(code),
                id: err.detail("id").unwrap_or("unknown").to_string(),
            },
            _ => SalesError::Infrastructure(err.to_string()),
        }
    }
}

fn resource_for(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::CategoryNotFound => "category",
        ErrorCode::FeatureNotFound => "feature",
        ErrorCode::PackageNotFound => "package",
        ErrorCode::OrderNotFound => "order",
        ErrorCode::PaymentNotFound => "payment",
        ErrorCode::InvoiceNotFound => "invoice",
        _ => "limit",
    }
}

impl From<LimitViolation> for DomainError {
    fn from(v: LimitViolation) -> Self {
        DomainError::new(ErrorCode::LimitExceeded, "Customization limit exceeded.")
            .with_detail("feature_id", v.feature_id.to_string())
            .with_detail("requested", v.requested.to_string())
            .with_detail("remaining", v.remaining.to_string())
    }
}

impl From<SalesError> for DomainError {
    fn from(err: SalesError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
