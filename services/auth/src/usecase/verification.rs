//! Email verification codes: issue, redeem, sweep.
//!
//! Per (email, purpose) a code moves `PENDING → USED | EXPIRED` and at most
//! one code is PENDING at any time. Expiry is lazy: overdue codes are moved
//! to EXPIRED at redemption time and by the periodic sweep.

use chrono::{DateTime, Duration, Utc};
use rand::RngExt;
use uuid::Uuid;

use deer_domain::validate::{is_valid_code, is_valid_email};
use deer_domain::verification::{CodePurpose, CodeStatus};

use crate::domain::repository::VerificationCodeRepository;
use crate::domain::types::{
    CODE_RANGE, CODE_RATE_LIMIT_SECS, CODE_TTL_SECS, EmailMessage, OutboxEvent,
    VERIFICATION_EMAIL_EVENT, VerificationCode,
};
use crate::error::AuthServiceError;

pub fn generate_code() -> String {
    rand::rng().random_range(CODE_RANGE).to_string()
}

/// Subject and body for a code of the given purpose.
pub fn render_email(to: &str, purpose: CodePurpose, code: &str) -> EmailMessage {
    let (subject, action) = match purpose {
        CodePurpose::Registration => ("Deer registration verification code", "finish signing up"),
        CodePurpose::PasswordReset => ("Deer password reset verification code", "reset your password"),
        CodePurpose::EmailChange => ("Deer email change verification code", "confirm your new email address"),
    };
    let minutes = CODE_TTL_SECS / 60;
    EmailMessage {
        to: to.to_owned(),
        subject: subject.to_owned(),
        body: format!(
            "Your verification code is {code}.\n\n\
             Use it to {action}. It is valid for {minutes} minutes.\n\n\
             If you did not request this code, you can ignore this email."
        ),
    }
}

// ── Issue ────────────────────────────────────────────────────────────────────

pub struct IssueCodeInput {
    pub email: String,
    pub purpose: CodePurpose,
    pub ip_address: Option<String>,
}

pub struct IssueCodeUseCase<V: VerificationCodeRepository> {
    pub codes: V,
}

impl<V: VerificationCodeRepository> IssueCodeUseCase<V> {
    pub async fn execute(&self, input: IssueCodeInput) -> Result<(), AuthServiceError> {
        // 1. Validate before touching the store
        if !is_valid_email(&input.email) {
            return Err(AuthServiceError::InvalidEmail);
        }

        // 2. One code per minute per (email, purpose)
        let now = Utc::now();
        let window_start = now - Duration::seconds(CODE_RATE_LIMIT_SECS);
        let recent = self
            .codes
            .count_issued_since(&input.email, input.purpose, window_start)
            .await?;
        if recent > 0 {
            return Err(AuthServiceError::RateLimited);
        }

        // 3. New PENDING code + its email, written together
        let code = VerificationCode {
            id: Uuid::new_v4(),
            email: input.email,
            code: generate_code(),
            purpose: input.purpose,
            status: CodeStatus::Pending,
            expires_at: now + Duration::seconds(CODE_TTL_SECS),
            created_at: now,
            verified_at: None,
            ip_address: input.ip_address,
        };
        let message = render_email(&code.email, code.purpose, &code.code);
        let event = OutboxEvent {
            id: Uuid::new_v4(),
            kind: VERIFICATION_EMAIL_EVENT.to_owned(),
            payload: serde_json::to_value(&message)
                .map_err(|e| AuthServiceError::Internal(e.into()))?,
            idempotency_key: format!("{VERIFICATION_EMAIL_EVENT}:{}", code.id),
        };

        // 4. Losing the race for the PENDING slot reads as a rate limit
        if !self.codes.replace_pending_with_outbox(&code, &event).await? {
            return Err(AuthServiceError::RateLimited);
        }

        tracing::info!(
            code_id = %code.id,
            purpose = %code.purpose,
            ip_address = code.ip_address.as_deref().unwrap_or("-"),
            "verification code issued"
        );
        Ok(())
    }
}

// ── Redeem ───────────────────────────────────────────────────────────────────

pub struct RedeemCodeInput {
    pub email: String,
    pub code: String,
    pub purpose: CodePurpose,
}

/// Consume a PENDING code. `Ok(false)` covers every miss (wrong code, wrong
/// purpose, expired, already used) without saying which.
pub async fn redeem_code<V: VerificationCodeRepository>(
    codes: &V,
    input: &RedeemCodeInput,
) -> Result<bool, AuthServiceError> {
    if !is_valid_email(&input.email) {
        return Err(AuthServiceError::InvalidEmail);
    }
    if !is_valid_code(&input.code) {
        return Err(AuthServiceError::InvalidCode);
    }

    let now = Utc::now();
    codes.expire_overdue(now).await?;

    let Some(found) = codes
        .find_redeemable(&input.email, &input.code, input.purpose, now)
        .await?
    else {
        tracing::debug!(purpose = %input.purpose, "verification code rejected");
        return Ok(false);
    };

    let redeemed = codes.mark_used(found.id, now).await?;
    if redeemed {
        tracing::info!(code_id = %found.id, purpose = %input.purpose, "verification code redeemed");
    }
    Ok(redeemed)
}

pub struct RedeemCodeUseCase<V: VerificationCodeRepository> {
    pub codes: V,
}

impl<V: VerificationCodeRepository> RedeemCodeUseCase<V> {
    pub async fn execute(&self, input: RedeemCodeInput) -> Result<bool, AuthServiceError> {
        redeem_code(&self.codes, &input).await
    }
}

// ── Sweep ────────────────────────────────────────────────────────────────────

pub struct SweepExpiredCodesUseCase<V: VerificationCodeRepository> {
    pub codes: V,
}

impl<V: VerificationCodeRepository> SweepExpiredCodesUseCase<V> {
    /// Returns how many codes moved to EXPIRED.
    pub async fn execute(&self, now: DateTime<Utc>) -> Result<u64, AuthServiceError> {
        let expired = self.codes.expire_overdue(now).await?;
        if expired > 0 {
            tracing::info!(expired, "expired overdue verification codes");
        }
        Ok(expired)
    }
}
