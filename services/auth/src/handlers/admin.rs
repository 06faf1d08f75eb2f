use axum::extract::{Path, State};
use serde::Deserialize;

use deer_auth_types::identity::AdminUser;
use deer_core::extract::Json;
use deer_core::response::ApiResponse;
use deer_domain::id::UserId;

use crate::error::AuthServiceError;
use crate::handlers::user::UserResponse;
use crate::state::AppState;
use crate::usecase::admin::{GetUserUseCase, UpdateUserStatusInput, UpdateUserStatusUseCase};

fn parse_user_id(raw: &str) -> Result<UserId, AuthServiceError> {
    raw.parse().map_err(|_| AuthServiceError::UserNotFound)
}

// ── GET /api/admin/users/{id} ────────────────────────────────────────────────

pub async fn get_user(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<UserResponse>, AuthServiceError> {
    let usecase = GetUserUseCase {
        users: state.user_repo(),
    };
    let user = usecase.execute(parse_user_id(&id)?).await?;
    Ok(ApiResponse::ok(user.into()))
}

// ── PUT /api/admin/users/{id}/status ─────────────────────────────────────────

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn update_user_status(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<ApiResponse<UserResponse>, AuthServiceError> {
    let usecase = UpdateUserStatusUseCase {
        users: state.user_repo(),
    };
    let user = usecase
        .execute(UpdateUserStatusInput {
            user_id: parse_user_id(&id)?,
            status: body.status,
        })
        .await?;
    tracing::info!(admin_id = %admin.user_id, target_id = %user.id, "admin changed user status");
    Ok(ApiResponse::with_message("user status updated", user.into()))
}
