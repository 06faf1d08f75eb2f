use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use deer_core::response::ApiResponse;

/// Auth service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("invalid email format")]
    InvalidEmail,
    #[error("verification code must be 6 digits")]
    InvalidCode,
    #[error("username must be 1-50 characters without surrounding whitespace")]
    InvalidUsername,
    #[error("password must be 6-128 characters")]
    InvalidPassword,
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("invalid user status")]
    InvalidStatus,
    #[error("nickname, location or avatar url is too long")]
    InvalidProfile,
    #[error("username already exists")]
    UsernameTaken,
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid or expired verification code")]
    InvalidVerificationCode,
    #[error("current password is incorrect")]
    WrongPassword,
    #[error("a code was sent recently, please wait before requesting another")]
    RateLimited,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("authentication required")]
    Unauthorized,
    #[error("insufficient permissions")]
    Forbidden,
    #[error("user not found")]
    UserNotFound,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AuthServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "INVALID_EMAIL",
            Self::InvalidCode => "INVALID_CODE",
            Self::InvalidUsername => "INVALID_USERNAME",
            Self::InvalidPassword => "INVALID_PASSWORD",
            Self::PasswordMismatch => "PASSWORD_MISMATCH",
            Self::InvalidStatus => "INVALID_STATUS",
            Self::InvalidProfile => "INVALID_PROFILE",
            Self::UsernameTaken => "USERNAME_TAKEN",
            Self::EmailTaken => "EMAIL_TAKEN",
            Self::InvalidVerificationCode => "INVALID_VERIFICATION_CODE",
            Self::WrongPassword => "WRONG_PASSWORD",
            Self::RateLimited => "RATE_LIMITED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidEmail
            | Self::InvalidCode
            | Self::InvalidUsername
            | Self::InvalidPassword
            | Self::PasswordMismatch
            | Self::InvalidStatus
            | Self::InvalidProfile
            | Self::UsernameTaken
            | Self::EmailTaken
            | Self::InvalidVerificationCode
            | Self::WrongPassword
            | Self::RateLimited => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthServiceError {
    fn into_response(self) -> Response {
        // Log 500s only; TraceLayer already records method/uri/status for all
        // requests. The anyhow chain is logged so the root cause is traceable.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = ?e, kind = "INTERNAL", "internal error");
        }
        ApiResponse::failure(self.status(), self.to_string()).into_response()
    }
}
