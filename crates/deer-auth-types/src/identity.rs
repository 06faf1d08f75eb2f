//! Request-scoped identity and the extractors that read it.
//!
//! The authentication gate inserts an [`Identity`] into the request
//! extensions when the bearer token resolves to an active user. Handlers
//! never reach into the extensions directly; they ask for one of the
//! extractors below.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use http::request::Parts;

use deer_core::error::AppError;
use deer_domain::id::UserId;
use deer_domain::user::Role;

/// The authenticated caller, resolved from the persisted user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role.satisfies(Role::Admin)
    }
}

/// Any authenticated caller. Rejects anonymous requests with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

/// An authenticated caller holding `ADMIN`. 401 when anonymous, 403 otherwise.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Identity);

/// The caller's identity if there is one.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Identity>);

fn identity(parts: &Parts) -> Option<Identity> {
    parts.extensions.get::<Identity>().cloned()
}

// axum-core 0.5 declares `from_request_parts` as `fn -> impl Future + Send`;
// values are read synchronously and moved into a 'static block.
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let identity = identity(parts);
        async move { identity.map(Self).ok_or(AppError::Unauthorized) }
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let identity = identity(parts);
        async move {
            let identity = identity.ok_or(AppError::Unauthorized)?;
            if !identity.is_admin() {
                return Err(AppError::Forbidden);
            }
            Ok(Self(identity))
        }
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let identity = identity(parts);
        async move { Ok(Self(identity)) }
    }
}
