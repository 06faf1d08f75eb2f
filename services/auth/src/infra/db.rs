use anyhow::{Context as _, anyhow};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr,
    TransactionError, TransactionTrait,
};
use uuid::Uuid;

use deer_auth_schema::{outbox_events, users, verification_codes};
use deer_domain::id::UserId;
use deer_domain::user::UserStatus;
use deer_domain::verification::{CodePurpose, CodeStatus};

use crate::domain::repository::{OutboxRepository, UserRepository, VerificationCodeRepository};
use crate::domain::types::{OutboxEvent, ProfileUpdate, StoredOutboxEvent, User, VerificationCode};
use crate::error::AuthServiceError;

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

// ── User repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserRepository {
    pub db: DatabaseConnection,
}

impl DbUserRepository {
    async fn find_one(
        &self,
        filter: impl sea_orm::sea_query::IntoCondition,
        what: &'static str,
    ) -> Result<Option<User>, AuthServiceError> {
        let model = users::Entity::find()
            .filter(filter)
            .one(&self.db)
            .await
            .context(what)?;
        model.map(user_from_model).transpose()
    }
}

impl UserRepository for DbUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AuthServiceError> {
        self.find_one(users::Column::Id.eq(id.0), "find user by id")
            .await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthServiceError> {
        self.find_one(users::Column::Username.eq(username), "find user by username")
            .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthServiceError> {
        self.find_one(users::Column::Email.eq(email), "find user by email")
            .await
    }

    async fn create(&self, user: &User) -> Result<(), AuthServiceError> {
        let result = users::ActiveModel {
            id: Set(user.id.0),
            username: Set(user.username.clone()),
            email: Set(user.email.clone()),
            password_hash: Set(user.password_hash.clone()),
            nickname: Set(user.nickname.clone()),
            avatar_url: Set(user.avatar_url.clone()),
            bio: Set(user.bio.clone()),
            location: Set(user.location.clone()),
            role: Set(user.role.as_str().to_owned()),
            status: Set(user.status.as_str().to_owned()),
            email_verified: Set(user.email_verified),
            last_login_time: Set(user.last_login_time),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
        }
        .insert(&self.db)
        .await;

        match result {
            Ok(_) => Ok(()),
            // Lost a race with a concurrent registration.
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(msg)) if msg.contains("email") => {
                    Err(AuthServiceError::EmailTaken)
                }
                Some(SqlErr::UniqueConstraintViolation(_)) => Err(AuthServiceError::UsernameTaken),
                _ => Err(anyhow::Error::new(e).context("create user").into()),
            },
        }
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), AuthServiceError> {
        users::Entity::update_many()
            .col_expr(users::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(users::Column::Id.eq(id.0))
            .exec(&self.db)
            .await
            .context("update user password")?;
        Ok(())
    }

    async fn update_email(&self, id: UserId, email: &str) -> Result<(), AuthServiceError> {
        let result = users::Entity::update_many()
            .col_expr(users::Column::Email, Expr::value(email))
            .col_expr(users::Column::EmailVerified, Expr::value(true))
            .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(users::Column::Id.eq(id.0))
            .exec(&self.db)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(AuthServiceError::EmailTaken),
            Err(e) => Err(anyhow::Error::new(e).context("update user email").into()),
        }
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<(), AuthServiceError> {
        let mut query = users::Entity::update_many()
            .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(users::Column::Id.eq(id.0));
        let fields = [
            (users::Column::Nickname, &update.nickname),
            (users::Column::Bio, &update.bio),
            (users::Column::AvatarUrl, &update.avatar_url),
            (users::Column::Location, &update.location),
        ];
        for (column, value) in fields {
            if let Some(value) = value {
                query = query.col_expr(column, Expr::value(value.clone()));
            }
        }
        query.exec(&self.db).await.context("update user profile")?;
        Ok(())
    }

    async fn update_status(
        &self,
        id: UserId,
        status: UserStatus,
    ) -> Result<bool, AuthServiceError> {
        let result = users::Entity::update_many()
            .col_expr(users::Column::Status, Expr::value(status.as_str()))
            .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(users::Column::Id.eq(id.0))
            .exec(&self.db)
            .await
            .context("update user status")?;
        Ok(result.rows_affected > 0)
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), AuthServiceError> {
        users::Entity::update_many()
            .col_expr(users::Column::LastLoginTime, Expr::value(at))
            .filter(users::Column::Id.eq(id.0))
            .exec(&self.db)
            .await
            .context("record user login")?;
        Ok(())
    }
}

fn user_from_model(model: users::Model) -> Result<User, AuthServiceError> {
    Ok(User {
        id: UserId(model.id),
        role: model
            .role
            .parse()
            .map_err(|e| anyhow!("user {}: {e}", model.id))?,
        status: model
            .status
            .parse()
            .map_err(|e| anyhow!("user {}: {e}", model.id))?,
        username: model.username,
        email: model.email,
        password_hash: model.password_hash,
        nickname: model.nickname,
        avatar_url: model.avatar_url,
        bio: model.bio,
        location: model.location,
        email_verified: model.email_verified,
        last_login_time: model.last_login_time,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

// ── Verification code repository ─────────────────────────────────────────────

#[derive(Clone)]
pub struct DbVerificationCodeRepository {
    pub db: DatabaseConnection,
}

impl VerificationCodeRepository for DbVerificationCodeRepository {
    async fn count_issued_since(
        &self,
        email: &str,
        purpose: CodePurpose,
        since: DateTime<Utc>,
    ) -> Result<u64, AuthServiceError> {
        let count = verification_codes::Entity::find()
            .filter(verification_codes::Column::Email.eq(email))
            .filter(verification_codes::Column::Purpose.eq(purpose.as_str()))
            .filter(verification_codes::Column::CreatedAt.gt(since))
            .count(&self.db)
            .await
            .context("count recent verification codes")?;
        Ok(count)
    }

    async fn replace_pending_with_outbox(
        &self,
        code: &VerificationCode,
        event: &OutboxEvent,
    ) -> Result<bool, AuthServiceError> {
        let result = self
            .db
            .transaction::<_, (), DbErr>(|txn| {
                let code = code.clone();
                let event = event.clone();
                Box::pin(async move {
                    expire_pending(txn, &code.email, code.purpose).await?;
                    insert_verification_code(txn, &code).await?;
                    insert_outbox_event(txn, &event).await?;
                    Ok(())
                })
            })
            .await;

        match result {
            Ok(()) => Ok(true),
            // Partial unique index on (email, purpose) WHERE status = 'PENDING'.
            Err(TransactionError::Transaction(e)) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(anyhow::Error::new(e)
                .context("replace pending verification code")
                .into()),
        }
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<u64, AuthServiceError> {
        let result = verification_codes::Entity::update_many()
            .col_expr(
                verification_codes::Column::Status,
                Expr::value(CodeStatus::Expired.as_str()),
            )
            .filter(verification_codes::Column::Status.eq(CodeStatus::Pending.as_str()))
            .filter(verification_codes::Column::ExpiresAt.lt(now))
            .exec(&self.db)
            .await
            .context("expire overdue verification codes")?;
        Ok(result.rows_affected)
    }

    async fn find_redeemable(
        &self,
        email: &str,
        code: &str,
        purpose: CodePurpose,
        now: DateTime<Utc>,
    ) -> Result<Option<VerificationCode>, AuthServiceError> {
        let model = verification_codes::Entity::find()
            .filter(verification_codes::Column::Email.eq(email))
            .filter(verification_codes::Column::Code.eq(code))
            .filter(verification_codes::Column::Purpose.eq(purpose.as_str()))
            .filter(verification_codes::Column::Status.eq(CodeStatus::Pending.as_str()))
            .filter(verification_codes::Column::ExpiresAt.gt(now))
            .order_by_desc(verification_codes::Column::CreatedAt)
            .one(&self.db)
            .await
            .context("find redeemable verification code")?;
        model.map(verification_code_from_model).transpose()
    }

    async fn mark_used(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AuthServiceError> {
        let result = verification_codes::Entity::update_many()
            .col_expr(
                verification_codes::Column::Status,
                Expr::value(CodeStatus::Used.as_str()),
            )
            .col_expr(verification_codes::Column::VerifiedAt, Expr::value(at))
            .filter(verification_codes::Column::Id.eq(id))
            .filter(verification_codes::Column::Status.eq(CodeStatus::Pending.as_str()))
            .exec(&self.db)
            .await
            .context("mark verification code used")?;
        Ok(result.rows_affected == 1)
    }
}

async fn expire_pending(
    txn: &DatabaseTransaction,
    email: &str,
    purpose: CodePurpose,
) -> Result<(), DbErr> {
    verification_codes::Entity::update_many()
        .col_expr(
            verification_codes::Column::Status,
            Expr::value(CodeStatus::Expired.as_str()),
        )
        .filter(verification_codes::Column::Email.eq(email))
        .filter(verification_codes::Column::Purpose.eq(purpose.as_str()))
        .filter(verification_codes::Column::Status.eq(CodeStatus::Pending.as_str()))
        .exec(txn)
        .await?;
    Ok(())
}

async fn insert_verification_code(
    txn: &DatabaseTransaction,
    code: &VerificationCode,
) -> Result<(), DbErr> {
    verification_codes::ActiveModel {
        id: Set(code.id),
        email: Set(code.email.clone()),
        code: Set(code.code.clone()),
        purpose: Set(code.purpose.as_str().to_owned()),
        status: Set(code.status.as_str().to_owned()),
        expires_at: Set(code.expires_at),
        created_at: Set(code.created_at),
        verified_at: Set(code.verified_at),
        ip_address: Set(code.ip_address.clone()),
    }
    .insert(txn)
    .await?;
    Ok(())
}

async fn insert_outbox_event(txn: &DatabaseTransaction, event: &OutboxEvent) -> Result<(), DbErr> {
    outbox_events::ActiveModel {
        id: Set(event.id),
        kind: Set(event.kind.clone()),
        payload: Set(event.payload.clone()),
        idempotency_key: Set(event.idempotency_key.clone()),
        attempts: Set(0),
        last_error: Set(None),
        created_at: Set(Utc::now()),
        processed_at: Set(None),
        failed_at: Set(None),
    }
    .insert(txn)
    .await?;
    Ok(())
}

fn verification_code_from_model(
    model: verification_codes::Model,
) -> Result<VerificationCode, AuthServiceError> {
    Ok(VerificationCode {
        id: model.id,
        purpose: model
            .purpose
            .parse()
            .map_err(|e| anyhow!("verification code {}: {e}", model.id))?,
        status: model
            .status
            .parse()
            .map_err(|e| anyhow!("verification code {}: {e}", model.id))?,
        email: model.email,
        code: model.code,
        expires_at: model.expires_at,
        created_at: model.created_at,
        verified_at: model.verified_at,
        ip_address: model.ip_address,
    })
}

// ── Outbox repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOutboxRepository {
    pub db: DatabaseConnection,
}

impl OutboxRepository for DbOutboxRepository {
    async fn fetch_undelivered(
        &self,
        limit: u64,
    ) -> Result<Vec<StoredOutboxEvent>, AuthServiceError> {
        let models = outbox_events::Entity::find()
            .filter(outbox_events::Column::ProcessedAt.is_null())
            .filter(outbox_events::Column::FailedAt.is_null())
            .order_by_asc(outbox_events::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .context("fetch undelivered outbox events")?;
        Ok(models
            .into_iter()
            .map(|m| StoredOutboxEvent {
                id: m.id,
                kind: m.kind,
                payload: m.payload,
                attempts: m.attempts,
                created_at: m.created_at,
            })
            .collect())
    }

    async fn mark_processed(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AuthServiceError> {
        outbox_events::Entity::update_many()
            .col_expr(outbox_events::Column::ProcessedAt, Expr::value(at))
            .col_expr(
                outbox_events::Column::Attempts,
                Expr::col(outbox_events::Column::Attempts).add(1),
            )
            .filter(outbox_events::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("mark outbox event processed")?;
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AuthServiceError> {
        outbox_events::Entity::update_many()
            .col_expr(outbox_events::Column::FailedAt, Expr::value(at))
            .col_expr(outbox_events::Column::LastError, Expr::value(error))
            .col_expr(
                outbox_events::Column::Attempts,
                Expr::col(outbox_events::Column::Attempts).add(1),
            )
            .filter(outbox_events::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("mark outbox event failed")?;
        Ok(())
    }
}
