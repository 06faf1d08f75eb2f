use axum::http::StatusCode;
use sea_orm::DatabaseConnection;

use crate::response::ApiResponse;

/// Handler for `GET /healthz`: liveness check.
pub async fn healthz() -> ApiResponse<()> {
    ApiResponse::message("ok")
}

/// Readiness probe body for services backed by Postgres.
pub async fn check_database(db: &DatabaseConnection) -> ApiResponse<()> {
    match db.ping().await {
        Ok(()) => ApiResponse::message("ready"),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            ApiResponse::failure(StatusCode::SERVICE_UNAVAILABLE, "database unavailable")
        }
    }
}
