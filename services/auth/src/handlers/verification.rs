use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts, State};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use serde::Deserialize;

use deer_auth_types::identity::{CurrentUser, MaybeUser};
use deer_core::extract::Json;
use deer_core::response::ApiResponse;
use deer_domain::id::UserId;
use deer_domain::verification::CodePurpose;

use crate::error::AuthServiceError;
use crate::state::AppState;
use crate::usecase::verification::{IssueCodeInput, IssueCodeUseCase};

/// Best-effort client address: first `X-Forwarded-For` hop, then
/// `X-Real-IP`, then the socket peer. Header values that are not an IP
/// address (including the literal `unknown`) are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub Option<String>);

fn header_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next());
    let real_ip = headers.get("x-real-ip").and_then(|v| v.to_str().ok());

    [forwarded, real_ip]
        .into_iter()
        .flatten()
        .find_map(|ip| ip.trim().parse::<IpAddr>().ok())
        .map(|ip| ip.to_string())
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let ip = header_ip(&parts.headers).or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });
        async move { Ok(Self(ip)) }
    }
}

#[derive(Deserialize)]
pub struct SendCodeRequest {
    pub email: String,
}

async fn issue(
    state: &AppState,
    email: String,
    purpose: CodePurpose,
    ip_address: Option<String>,
    requested_by: Option<UserId>,
) -> Result<(), AuthServiceError> {
    tracing::debug!(%purpose, requested_by = ?requested_by, "verification code requested");
    let usecase = IssueCodeUseCase {
        codes: state.verification_code_repo(),
    };
    usecase
        .execute(IssueCodeInput {
            email,
            purpose,
            ip_address,
        })
        .await
}

// ── POST /api/auth/send-verification-code ────────────────────────────────────

pub async fn send_verification_code(
    MaybeUser(caller): MaybeUser,
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(body): Json<SendCodeRequest>,
) -> Result<ApiResponse<()>, AuthServiceError> {
    issue(
        &state,
        body.email,
        CodePurpose::Registration,
        ip,
        caller.map(|c| c.user_id),
    )
    .await?;
    Ok(ApiResponse::message("verification code sent"))
}

// ── POST /api/auth/send-reset-code ───────────────────────────────────────────

pub async fn send_reset_code(
    MaybeUser(caller): MaybeUser,
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(body): Json<SendCodeRequest>,
) -> Result<ApiResponse<()>, AuthServiceError> {
    issue(
        &state,
        body.email,
        CodePurpose::PasswordReset,
        ip,
        caller.map(|c| c.user_id),
    )
    .await?;
    Ok(ApiResponse::message("password reset code sent"))
}

// ── POST /api/auth/send-email-change-code ────────────────────────────────────

pub async fn send_email_change_code(
    CurrentUser(identity): CurrentUser,
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(body): Json<SendCodeRequest>,
) -> Result<ApiResponse<()>, AuthServiceError> {
    issue(
        &state,
        body.email,
        CodePurpose::EmailChange,
        ip,
        Some(identity.user_id),
    )
    .await?;
    Ok(ApiResponse::message("email change code sent"))
}
