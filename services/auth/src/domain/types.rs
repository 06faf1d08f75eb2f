use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use deer_domain::id::UserId;
use deer_domain::user::{Role, UserStatus};
use deer_domain::verification::{CodePurpose, CodeStatus};

/// Persisted account as the auth service sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    /// argon2id PHC string. Never serialized.
    pub password_hash: String,
    pub nickname: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub email_verified: bool,
    pub last_login_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A fresh ACTIVE `USER` account.
    pub fn new(
        username: String,
        email: String,
        password_hash: String,
        nickname: Option<String>,
        email_verified: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            username,
            email,
            password_hash,
            nickname,
            avatar_url: None,
            bio: None,
            location: None,
            role: Role::User,
            status: UserStatus::Active,
            email_verified,
            last_login_time: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial profile update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub nickname: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.nickname.is_none()
            && self.bio.is_none()
            && self.avatar_url.is_none()
            && self.location.is_none()
    }
}

/// Six-digit email verification code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationCode {
    pub id: Uuid,
    pub email: String,
    pub code: String,
    pub purpose: CodePurpose,
    pub status: CodeStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
}

impl VerificationCode {
    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        self.status == CodeStatus::Pending && self.expires_at > now
    }
}

/// Outbox event for async delivery, written in the same transaction as the
/// state change that caused it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub idempotency_key: String,
}

/// Undelivered outbox row as read back by the relay.
#[derive(Debug, Clone)]
pub struct StoredOutboxEvent {
    pub id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

/// Rendered email handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbox kind for verification emails.
pub const VERIFICATION_EMAIL_EVENT: &str = "verification_code_issued";

/// Verification code time-to-live in seconds.
pub const CODE_TTL_SECS: i64 = 300;

/// Minimum spacing between two codes for the same (email, purpose).
pub const CODE_RATE_LIMIT_SECS: i64 = 60;

/// Codes are drawn uniformly from this inclusive range, so they never have
/// a leading zero.
pub const CODE_RANGE: std::ops::RangeInclusive<u32> = 100_000..=999_999;

/// Maximum number of outbox events the relay handles per poll.
pub const OUTBOX_BATCH_SIZE: u64 = 32;
