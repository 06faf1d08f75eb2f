use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use deer_auth_types::identity::CurrentUser;
use deer_core::extract::Json;
use deer_core::response::ApiResponse;
use deer_domain::user::{Role, UserStatus};

use crate::domain::types::{ProfileUpdate, User};
use crate::error::AuthServiceError;
use crate::state::AppState;
use crate::usecase::account::{
    ChangeEmailInput, ChangeEmailUseCase, ChangePasswordInput, ChangePasswordUseCase,
    GetCurrentUserUseCase, UpdateProfileUseCase,
};

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub nickname: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub email_verified: bool,
    #[serde(serialize_with = "deer_core::serde::to_rfc3339_ms_opt")]
    pub last_login_time: Option<DateTime<Utc>>,
    #[serde(serialize_with = "deer_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "deer_core::serde::to_rfc3339_ms")]
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username,
            email: user.email,
            nickname: user.nickname,
            avatar_url: user.avatar_url,
            bio: user.bio,
            location: user.location,
            role: user.role,
            status: user.status,
            email_verified: user.email_verified,
            last_login_time: user.last_login_time,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// ── GET /api/auth/me ─────────────────────────────────────────────────────────

pub async fn get_me(
    CurrentUser(identity): CurrentUser,
    State(state): State<AppState>,
) -> Result<ApiResponse<UserResponse>, AuthServiceError> {
    let usecase = GetCurrentUserUseCase {
        users: state.user_repo(),
    };
    let user = usecase.execute(identity.user_id).await?;
    Ok(ApiResponse::ok(user.into()))
}

// ── PUT /api/auth/profile ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub nickname: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
}

pub async fn update_profile(
    CurrentUser(identity): CurrentUser,
    State(state): State<AppState>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<ApiResponse<UserResponse>, AuthServiceError> {
    let usecase = UpdateProfileUseCase {
        users: state.user_repo(),
    };
    let user = usecase
        .execute(
            identity.user_id,
            ProfileUpdate {
                nickname: body.nickname,
                bio: body.bio,
                avatar_url: body.avatar_url,
                location: body.location,
            },
        )
        .await?;
    Ok(ApiResponse::with_message("profile updated", user.into()))
}

// ── PUT /api/user/password ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

pub async fn change_password(
    CurrentUser(identity): CurrentUser,
    State(state): State<AppState>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<ApiResponse<()>, AuthServiceError> {
    let usecase = ChangePasswordUseCase {
        users: state.user_repo(),
    };
    usecase
        .execute(ChangePasswordInput {
            user_id: identity.user_id,
            old_password: body.old_password,
            new_password: body.new_password,
            confirm_password: body.confirm_password,
        })
        .await?;
    Ok(ApiResponse::message("password changed"))
}

// ── PUT /api/user/email ──────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChangeEmailRequest {
    pub email: String,
    pub verification_code: String,
}

pub async fn change_email(
    CurrentUser(identity): CurrentUser,
    State(state): State<AppState>,
    Json(body): Json<ChangeEmailRequest>,
) -> Result<ApiResponse<UserResponse>, AuthServiceError> {
    let usecase = ChangeEmailUseCase {
        users: state.user_repo(),
        codes: state.verification_code_repo(),
    };
    let user = usecase
        .execute(ChangeEmailInput {
            user_id: identity.user_id,
            email: body.email,
            verification_code: body.verification_code,
        })
        .await?;
    Ok(ApiResponse::with_message("email changed", user.into()))
}
