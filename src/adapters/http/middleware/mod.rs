//! HTTP middleware and extractors.

mod identity;

pub use identity::{
    identity_middleware, Caller, IdentityRejection, RequireAdmin, RequireUser, USER_ID_HEADER,
    USER_ROLE_HEADER,
};
