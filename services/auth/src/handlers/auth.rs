use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use deer_auth_types::identity::CurrentUser;
use deer_core::extract::Json;
use deer_core::response::ApiResponse;

use crate::error::AuthServiceError;
use crate::handlers::user::UserResponse;
use crate::state::AppState;
use crate::usecase::account::{
    LoginInput, LoginUseCase, RegisterInput, RegisterUseCase, RegisterWithEmailInput,
    RegisterWithEmailUseCase, ResetPasswordInput, ResetPasswordUseCase,
};

// ── POST /api/auth/login ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    #[serde(serialize_with = "deer_core::serde::to_rfc3339_ms")]
    pub expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, AuthServiceError> {
    let usecase = LoginUseCase {
        users: state.user_repo(),
        tokens: state.tokens.clone(),
    };
    let output = usecase
        .execute(LoginInput {
            username: body.username,
            password: body.password,
        })
        .await?;
    Ok(ApiResponse::with_message(
        "login successful",
        LoginResponse {
            token: output.token,
            token_type: "Bearer",
            expires_at: output.expires_at,
            user: output.user.into(),
        },
    ))
}

// ── POST /api/auth/register ──────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub nickname: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<ApiResponse<UserResponse>, AuthServiceError> {
    let usecase = RegisterUseCase {
        users: state.user_repo(),
    };
    let user = usecase
        .execute(RegisterInput {
            username: body.username,
            email: body.email,
            password: body.password,
            confirm_password: body.confirm_password,
            nickname: body.nickname,
        })
        .await?;
    Ok(ApiResponse::with_message("registration successful", user.into()))
}

// ── POST /api/auth/register-with-email ───────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterWithEmailRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub verification_code: String,
    pub nickname: Option<String>,
}

pub async fn register_with_email(
    State(state): State<AppState>,
    Json(body): Json<RegisterWithEmailRequest>,
) -> Result<ApiResponse<UserResponse>, AuthServiceError> {
    let usecase = RegisterWithEmailUseCase {
        users: state.user_repo(),
        codes: state.verification_code_repo(),
    };
    let user = usecase
        .execute(RegisterWithEmailInput {
            email: body.email,
            password: body.password,
            confirm_password: body.confirm_password,
            verification_code: body.verification_code,
            nickname: body.nickname,
        })
        .await?;
    Ok(ApiResponse::with_message("registration successful", user.into()))
}

// ── POST /api/auth/reset-password ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub new_password: String,
    pub confirm_password: String,
    pub verification_code: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<ApiResponse<()>, AuthServiceError> {
    let usecase = ResetPasswordUseCase {
        users: state.user_repo(),
        codes: state.verification_code_repo(),
    };
    usecase
        .execute(ResetPasswordInput {
            email: body.email,
            new_password: body.new_password,
            confirm_password: body.confirm_password,
            verification_code: body.verification_code,
        })
        .await?;
    Ok(ApiResponse::message("password reset successful"))
}

// ── POST /api/auth/logout ────────────────────────────────────────────────────

/// Tokens are stateless; the client discards its copy.
pub async fn logout(CurrentUser(identity): CurrentUser) -> ApiResponse<()> {
    tracing::info!(user_id = %identity.user_id, "user logged out");
    ApiResponse::message("logged out")
}
