use axum::extract::State;
use axum::http::StatusCode;
use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use deer_auth_types::policy::{Access, RoutePolicy};
use deer_core::error::AppError;
use deer_core::health::{check_database, healthz};
use deer_core::middleware::with_http_layers;
use deer_core::response::ApiResponse;
use deer_domain::user::Role;

use crate::gate::authenticate;
use crate::handlers::{
    admin::{get_user, update_user_status},
    auth::{login, logout, register, register_with_email, reset_password},
    user::{change_email, change_password, get_me, update_profile},
    verification::{send_email_change_code, send_reset_code, send_verification_code},
};
use crate::state::AppState;

/// Access table consulted by the gate. Order matters: first match wins.
pub fn route_policy() -> RoutePolicy {
    RoutePolicy::new()
        // Probes
        .rule("/healthz", Access::Public)
        .rule("/readyz", Access::Public)
        // Anonymous account flows
        .rule("/api/auth/login", Access::Public)
        .rule("/api/auth/register", Access::Public)
        .rule("/api/auth/register-with-email", Access::Public)
        .rule("/api/auth/send-verification-code", Access::Public)
        .rule("/api/auth/send-reset-code", Access::Public)
        .rule("/api/auth/reset-password", Access::Public)
        // Administration
        .rule("/api/admin/**", Access::Role(Role::Admin))
        // Everything else
        .rule("/**", Access::Authenticated)
}

async fn readyz(State(state): State<AppState>) -> ApiResponse<()> {
    check_database(&state.db).await
}

async fn not_found() -> AppError {
    AppError::NotFound
}

async fn method_not_allowed() -> ApiResponse<()> {
    ApiResponse::failure(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
}

pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Credentials
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/register", post(register))
        .route("/api/auth/register-with-email", post(register_with_email))
        .route("/api/auth/reset-password", post(reset_password))
        // Verification codes
        .route("/api/auth/send-verification-code", post(send_verification_code))
        .route("/api/auth/send-reset-code", post(send_reset_code))
        .route("/api/auth/send-email-change-code", post(send_email_change_code))
        // Current user
        .route("/api/auth/me", get(get_me))
        .route("/api/auth/profile", put(update_profile))
        .route("/api/user/password", put(change_password))
        .route("/api/user/email", put(change_email))
        // Admin
        .route("/api/admin/users/{id}", get(get_user))
        .route("/api/admin/users/{id}/status", put(update_user_status))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .with_state(state);
    with_http_layers(router)
}
