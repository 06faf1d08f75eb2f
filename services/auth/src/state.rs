use std::sync::Arc;

use sea_orm::DatabaseConnection;

use deer_auth_types::policy::RoutePolicy;
use deer_auth_types::token::TokenService;

use crate::infra::db::{DbOutboxRepository, DbUserRepository, DbVerificationCodeRepository};
use crate::infra::mail::LogMailer;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub tokens: Arc<TokenService>,
    pub policy: Arc<RoutePolicy>,
    pub mail_from: String,
}

impl AppState {
    pub fn user_repo(&self) -> DbUserRepository {
        DbUserRepository {
            db: self.db.clone(),
        }
    }

    pub fn verification_code_repo(&self) -> DbVerificationCodeRepository {
        DbVerificationCodeRepository {
            db: self.db.clone(),
        }
    }

    pub fn outbox_repo(&self) -> DbOutboxRepository {
        DbOutboxRepository {
            db: self.db.clone(),
        }
    }

    pub fn mailer(&self) -> LogMailer {
        LogMailer {
            from: self.mail_from.clone(),
        }
    }
}
