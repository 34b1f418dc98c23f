//! Caller identity for axum.
//!
//! Authentication happens upstream. The gateway in front of this service
//! forwards the authenticated user in `X-User-Id` and their role in
//! `X-User-Role`; this module turns those headers into typed extractors.
//!
//! ```text
//! Request → identity_middleware → injects Caller into extensions
//!                                      ↓
//!                    Handler → RequireUser / RequireAdmin read from extensions
//! ```

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::adapters::http::error::ErrorResponse;
use crate::domain::foundation::UserId;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl Caller {
    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let user_id = headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| UserId::new(s.trim()).ok())?;
        let is_admin = headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|role| role.eq_ignore_ascii_case("admin"));
        Some(Self { user_id, is_admin })
    }
}

/// Injects [`Caller`] when identity headers are present.
///
/// Requests without them continue anonymously; extractors decide.
pub async fn identity_middleware(mut request: Request, next: Next) -> Response {
    if let Some(caller) = Caller::from_headers(request.headers()) {
        request.extensions_mut().insert(caller);
    }
    next.run(request).await
}

/// Requires an authenticated customer or admin.
#[derive(Debug, Clone)]
pub struct RequireUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .map(|c| RequireUser(c.user_id.clone()))
            .ok_or(IdentityRejection::Unauthenticated)
    }
}

/// Requires an authenticated admin.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Caller>() {
            Some(caller) if caller.is_admin => Ok(RequireAdmin(caller.user_id.clone())),
            Some(_) => Err(IdentityRejection::NotAdmin),
            None => Err(IdentityRejection::Unauthenticated),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityRejection {
    Unauthenticated,
    NotAdmin,
}

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            IdentityRejection::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("UNAUTHORIZED", "Authentication required"),
            ),
            IdentityRejection::NotAdmin => (
                StatusCode::FORBIDDEN,
                ErrorResponse::new("FORBIDDEN", "Administrator access required"),
            ),
        };
        (status, Json(body)).into_response()
    }
}
