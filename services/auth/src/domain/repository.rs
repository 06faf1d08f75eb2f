#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use deer_domain::id::UserId;
use deer_domain::user::UserStatus;
use deer_domain::verification::CodePurpose;

use crate::domain::types::{
    EmailMessage, OutboxEvent, ProfileUpdate, StoredOutboxEvent, User, VerificationCode,
};
use crate::error::AuthServiceError;

/// Credential store.
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AuthServiceError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthServiceError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthServiceError>;

    /// Insert a new user. A uniqueness clash surfaces as `UsernameTaken` or
    /// `EmailTaken`.
    async fn create(&self, user: &User) -> Result<(), AuthServiceError>;

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), AuthServiceError>;

    /// Replace the address and mark it verified.
    async fn update_email(&self, id: UserId, email: &str) -> Result<(), AuthServiceError>;

    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<(), AuthServiceError>;

    /// Returns `false` when no such user exists.
    async fn update_status(&self, id: UserId, status: UserStatus)
    -> Result<bool, AuthServiceError>;

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), AuthServiceError>;
}

/// Repository for email verification codes.
pub trait VerificationCodeRepository: Send + Sync {
    /// Count codes for (email, purpose) created after `since`, in any status.
    async fn count_issued_since(
        &self,
        email: &str,
        purpose: CodePurpose,
        since: DateTime<Utc>,
    ) -> Result<u64, AuthServiceError>;

    /// In one transaction: expire every PENDING code for the code's
    /// (email, purpose), insert `code` and insert `event`.
    ///
    /// Returns `false` if a concurrent issuance won the race for the single
    /// PENDING slot; nothing is written in that case.
    async fn replace_pending_with_outbox(
        &self,
        code: &VerificationCode,
        event: &OutboxEvent,
    ) -> Result<bool, AuthServiceError>;

    /// Move every PENDING code with `expires_at < now` to EXPIRED.
    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<u64, AuthServiceError>;

    /// A PENDING, unexpired code matching all three keys.
    async fn find_redeemable(
        &self,
        email: &str,
        code: &str,
        purpose: CodePurpose,
        now: DateTime<Utc>,
    ) -> Result<Option<VerificationCode>, AuthServiceError>;

    /// Conditional PENDING → USED. Returns `true` only if this call performed
    /// the transition.
    async fn mark_used(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AuthServiceError>;
}

/// Undelivered side of the transactional outbox.
pub trait OutboxRepository: Send + Sync {
    /// Oldest first, neither processed nor failed.
    async fn fetch_undelivered(
        &self,
        limit: u64,
    ) -> Result<Vec<StoredOutboxEvent>, AuthServiceError>;

    async fn mark_processed(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AuthServiceError>;

    async fn mark_failed(
        &self,
        id: Uuid,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AuthServiceError>;
}

/// Email transport port.
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()>;
}
