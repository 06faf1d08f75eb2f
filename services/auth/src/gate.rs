//! Authentication gate.
//!
//! Runs before routing on every request: resolves the bearer token to a
//! live user, consults the route policy, and on success attaches the
//! [`Identity`] to the request extensions for the handler extractors.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use deer_auth_types::identity::Identity;
use deer_auth_types::policy::RoutePolicy;
use deer_auth_types::token::{TokenService, bearer_token};

use crate::domain::repository::UserRepository;
use crate::error::AuthServiceError;
use crate::state::AppState;

/// Who the request is from, or `None` when it is anonymous.
///
/// A missing header, an invalid token, an unknown subject and a locked
/// account all yield `None`. Role and status come from the store, not the
/// token, so bans and demotions apply on the next request.
pub async fn resolve_identity<U: UserRepository>(
    tokens: &TokenService,
    users: &U,
    headers: &HeaderMap,
) -> Result<Option<Identity>, AuthServiceError> {
    let Some(token) = bearer_token(headers) else {
        return Ok(None);
    };
    let info = match tokens.validate(&token) {
        Ok(info) => info,
        Err(e) => {
            tracing::debug!(reason = %e, "bearer token rejected");
            return Ok(None);
        }
    };

    let Some(user) = users.find_by_id(info.user_id).await? else {
        return Ok(None);
    };
    if !user.status.can_authenticate() {
        tracing::debug!(user_id = %user.id, status = %user.status, "locked account presented a token");
        return Ok(None);
    }

    Ok(Some(Identity {
        user_id: user.id,
        username: user.username,
        role: user.role,
    }))
}

pub async fn run_gate<U: UserRepository>(
    tokens: &TokenService,
    users: &U,
    policy: &RoutePolicy,
    mut req: Request,
    next: Next,
) -> Response {
    let identity = match resolve_identity(tokens, users, req.headers()).await {
        Ok(identity) => identity,
        Err(e) => return e.into_response(),
    };
    if let Err(e) = policy.check(req.uri().path(), identity.as_ref()) {
        return e.into_response();
    }
    if let Some(identity) = identity {
        req.extensions_mut().insert(identity);
    }
    next.run(req).await
}

/// `axum::middleware::from_fn_with_state` entry point.
pub async fn authenticate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    run_gate(&state.tokens, &state.user_repo(), &state.policy, req, next).await
}
