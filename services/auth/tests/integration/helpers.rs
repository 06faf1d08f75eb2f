#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use deer_auth::domain::repository::{
    Mailer, OutboxRepository, UserRepository, VerificationCodeRepository,
};
use deer_auth::domain::types::{
    EmailMessage, OutboxEvent, ProfileUpdate, StoredOutboxEvent, User, VerificationCode,
};
use deer_auth::error::AuthServiceError;
use deer_auth::usecase::password::hash_password;
use deer_domain::id::UserId;
use deer_domain::user::{Role, UserStatus};
use deer_domain::verification::{CodePurpose, CodeStatus};

pub const PASSWORD: &str = "correct-horse";

/// An ACTIVE user whose password is [`PASSWORD`].
pub async fn user(username: &str, email: &str, role: Role) -> User {
    let mut user = User::new(
        username.to_owned(),
        email.to_owned(),
        hash_password(PASSWORD).await.unwrap(),
        None,
        false,
    );
    user.role = role;
    user
}

// ── MockUserRepo ─────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockUserRepo {
    pub users: Arc<Mutex<Vec<User>>>,
}

impl MockUserRepo {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users: Arc::new(Mutex::new(users)),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns a shared handle to the internal user list for post-execution inspection.
    pub fn users_handle(&self) -> Arc<Mutex<Vec<User>>> {
        Arc::clone(&self.users)
    }

    pub fn get(&self, id: UserId) -> Option<User> {
        self.users.lock().unwrap().iter().find(|u| u.id == id).cloned()
    }

    fn modify(&self, id: UserId, f: impl FnOnce(&mut User)) -> bool {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                f(user);
                user.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

impl UserRepository for MockUserRepo {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AuthServiceError> {
        Ok(self.get(id))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthServiceError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthServiceError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create(&self, user: &User) -> Result<(), AuthServiceError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.username == user.username) {
            return Err(AuthServiceError::UsernameTaken);
        }
        if users.iter().any(|u| u.email == user.email) {
            return Err(AuthServiceError::EmailTaken);
        }
        users.push(user.clone());
        Ok(())
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), AuthServiceError> {
        self.modify(id, |u| u.password_hash = password_hash.to_owned());
        Ok(())
    }

    async fn update_email(&self, id: UserId, email: &str) -> Result<(), AuthServiceError> {
        self.modify(id, |u| {
            u.email = email.to_owned();
            u.email_verified = true;
        });
        Ok(())
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<(), AuthServiceError> {
        let update = update.clone();
        self.modify(id, |u| {
            if update.nickname.is_some() {
                u.nickname = update.nickname;
            }
            if update.bio.is_some() {
                u.bio = update.bio;
            }
            if update.avatar_url.is_some() {
                u.avatar_url = update.avatar_url;
            }
            if update.location.is_some() {
                u.location = update.location;
            }
        });
        Ok(())
    }

    async fn update_status(
        &self,
        id: UserId,
        status: UserStatus,
    ) -> Result<bool, AuthServiceError> {
        Ok(self.modify(id, |u| u.status = status))
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), AuthServiceError> {
        self.modify(id, |u| u.last_login_time = Some(at));
        Ok(())
    }
}

// ── MockCodeRepo ─────────────────────────────────────────────────────────────

/// In-memory code store. Issuance holds the lock for the whole
/// expire-insert-outbox sequence, standing in for the DB transaction.
#[derive(Clone, Default)]
pub struct MockCodeRepo {
    pub codes: Arc<Mutex<Vec<VerificationCode>>>,
    pub outbox: Arc<Mutex<Vec<OutboxEvent>>>,
    /// When set, the next issuance behaves as if it lost the race for the
    /// PENDING slot.
    pub lose_next_race: Arc<AtomicBool>,
}

impl MockCodeRepo {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns a shared handle to the internal code list for post-execution inspection.
    pub fn codes_handle(&self) -> Arc<Mutex<Vec<VerificationCode>>> {
        Arc::clone(&self.codes)
    }

    pub fn outbox_handle(&self) -> Arc<Mutex<Vec<OutboxEvent>>> {
        Arc::clone(&self.outbox)
    }

    /// The newest code for (email, purpose), whatever its status.
    pub fn latest(&self, email: &str, purpose: CodePurpose) -> VerificationCode {
        self.codes
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.email == email && c.purpose == purpose)
            .max_by_key(|c| c.created_at)
            .cloned()
            .expect("a code was issued")
    }

    /// Shift every code's timestamps into the past, as if `secs` had elapsed.
    pub fn age_all(&self, secs: i64) {
        for code in self.codes.lock().unwrap().iter_mut() {
            code.created_at -= Duration::seconds(secs);
            code.expires_at -= Duration::seconds(secs);
        }
    }

    pub fn insert(&self, code: VerificationCode) {
        self.codes.lock().unwrap().push(code);
    }
}

impl VerificationCodeRepository for MockCodeRepo {
    async fn count_issued_since(
        &self,
        email: &str,
        purpose: CodePurpose,
        since: DateTime<Utc>,
    ) -> Result<u64, AuthServiceError> {
        Ok(self
            .codes
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.email == email && c.purpose == purpose && c.created_at > since)
            .count() as u64)
    }

    async fn replace_pending_with_outbox(
        &self,
        code: &VerificationCode,
        event: &OutboxEvent,
    ) -> Result<bool, AuthServiceError> {
        if self.lose_next_race.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }
        let mut codes = self.codes.lock().unwrap();
        for existing in codes.iter_mut().filter(|c| {
            c.email == code.email && c.purpose == code.purpose && c.status == CodeStatus::Pending
        }) {
            existing.status = CodeStatus::Expired;
        }
        codes.push(code.clone());
        self.outbox.lock().unwrap().push(event.clone());
        Ok(true)
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<u64, AuthServiceError> {
        let mut expired = 0;
        for code in self
            .codes
            .lock()
            .unwrap()
            .iter_mut()
            .filter(|c| c.status == CodeStatus::Pending && c.expires_at < now)
        {
            code.status = CodeStatus::Expired;
            expired += 1;
        }
        Ok(expired)
    }

    async fn find_redeemable(
        &self,
        email: &str,
        code: &str,
        purpose: CodePurpose,
        now: DateTime<Utc>,
    ) -> Result<Option<VerificationCode>, AuthServiceError> {
        Ok(self
            .codes
            .lock()
            .unwrap()
            .iter()
            .find(|c| {
                c.email == email && c.code == code && c.purpose == purpose && c.is_redeemable_at(now)
            })
            .cloned())
    }

    async fn mark_used(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AuthServiceError> {
        let mut codes = self.codes.lock().unwrap();
        match codes
            .iter_mut()
            .find(|c| c.id == id && c.status == CodeStatus::Pending)
        {
            Some(code) => {
                code.status = CodeStatus::Used;
                code.verified_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ── MockOutboxRepo ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OutboxRow {
    pub event: StoredOutboxEvent,
    pub processed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[derive(Clone, Default)]
pub struct MockOutboxRepo {
    pub rows: Arc<Mutex<Vec<OutboxRow>>>,
}

impl MockOutboxRepo {
    pub fn new(events: Vec<OutboxEvent>) -> Self {
        let base = Utc::now();
        let rows = events
            .into_iter()
            .enumerate()
            .map(|(i, e)| OutboxRow {
                event: StoredOutboxEvent {
                    id: e.id,
                    kind: e.kind,
                    payload: e.payload,
                    attempts: 0,
                    created_at: base + Duration::milliseconds(i as i64),
                },
                processed_at: None,
                failed_at: None,
                last_error: None,
            })
            .collect();
        Self {
            rows: Arc::new(Mutex::new(rows)),
        }
    }

    pub fn rows_handle(&self) -> Arc<Mutex<Vec<OutboxRow>>> {
        Arc::clone(&self.rows)
    }
}

impl OutboxRepository for MockOutboxRepo {
    async fn fetch_undelivered(
        &self,
        limit: u64,
    ) -> Result<Vec<StoredOutboxEvent>, AuthServiceError> {
        let mut pending: Vec<StoredOutboxEvent> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.processed_at.is_none() && r.failed_at.is_none())
            .map(|r| r.event.clone())
            .collect();
        pending.sort_by_key(|e| e.created_at);
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn mark_processed(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AuthServiceError> {
        if let Some(row) = self.rows.lock().unwrap().iter_mut().find(|r| r.event.id == id) {
            row.processed_at = Some(at);
            row.event.attempts += 1;
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AuthServiceError> {
        if let Some(row) = self.rows.lock().unwrap().iter_mut().find(|r| r.event.id == id) {
            row.failed_at = Some(at);
            row.last_error = Some(error.to_owned());
            row.event.attempts += 1;
        }
        Ok(())
    }
}

// ── MockMailer ───────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockMailer {
    pub sent: Arc<Mutex<Vec<EmailMessage>>>,
    /// Deliveries to this address fail.
    pub reject_to: Option<String>,
}

impl MockMailer {
    pub fn rejecting(address: &str) -> Self {
        Self {
            reject_to: Some(address.to_owned()),
            ..Self::default()
        }
    }

    pub fn sent_handle(&self) -> Arc<Mutex<Vec<EmailMessage>>> {
        Arc::clone(&self.sent)
    }
}

impl Mailer for MockMailer {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        if self.reject_to.as_deref() == Some(message.to.as_str()) {
            anyhow::bail!("mailbox unavailable: {}", message.to);
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}
