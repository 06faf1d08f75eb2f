use std::sync::atomic::Ordering;

use chrono::{Duration, Utc};
use uuid::Uuid;

use deer_auth::domain::types::{EmailMessage, VERIFICATION_EMAIL_EVENT, VerificationCode};
use deer_auth::error::AuthServiceError;
use deer_auth::usecase::verification::{
    IssueCodeInput, IssueCodeUseCase, RedeemCodeInput, RedeemCodeUseCase, SweepExpiredCodesUseCase,
};
use deer_domain::verification::{CodePurpose, CodeStatus};

use crate::helpers::MockCodeRepo;

const EMAIL: &str = "a@b.com";

async fn issue(repo: &MockCodeRepo, email: &str, purpose: CodePurpose) -> Result<(), AuthServiceError> {
    IssueCodeUseCase { codes: repo.clone() }
        .execute(IssueCodeInput {
            email: email.to_owned(),
            purpose,
            ip_address: Some("203.0.113.7".to_owned()),
        })
        .await
}

async fn redeem(repo: &MockCodeRepo, email: &str, code: &str, purpose: CodePurpose) -> Result<bool, AuthServiceError> {
    RedeemCodeUseCase { codes: repo.clone() }
        .execute(RedeemCodeInput {
            email: email.to_owned(),
            code: code.to_owned(),
            purpose,
        })
        .await
}

fn pending_code(email: &str, code: &str, purpose: CodePurpose) -> VerificationCode {
    let now = Utc::now();
    VerificationCode {
        id: Uuid::new_v4(),
        email: email.to_owned(),
        code: code.to_owned(),
        purpose,
        status: CodeStatus::Pending,
        expires_at: now + Duration::seconds(300),
        created_at: now,
        verified_at: None,
        ip_address: None,
    }
}

#[tokio::test]
async fn should_issue_pending_code_with_five_minute_ttl() {
    let repo = MockCodeRepo::empty();

    issue(&repo, EMAIL, CodePurpose::Registration).await.unwrap();

    let code = repo.latest(EMAIL, CodePurpose::Registration);
    assert_eq!(code.status, CodeStatus::Pending);
    assert_eq!(code.code.len(), 6);
    assert!(code.code.chars().all(|c| c.is_ascii_digit()));
    assert_eq!((code.expires_at - code.created_at).num_seconds(), 300);
    assert_eq!(code.ip_address.as_deref(), Some("203.0.113.7"));
}

#[tokio::test]
async fn should_write_email_to_outbox_with_the_code() {
    let repo = MockCodeRepo::empty();

    issue(&repo, EMAIL, CodePurpose::PasswordReset).await.unwrap();

    let code = repo.latest(EMAIL, CodePurpose::PasswordReset);
    let outbox = repo.outbox_handle();
    let events = outbox.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, VERIFICATION_EMAIL_EVENT);
    assert_eq!(events[0].idempotency_key, format!("{VERIFICATION_EMAIL_EVENT}:{}", code.id));
    let message: EmailMessage = serde_json::from_value(events[0].payload.clone()).unwrap();
    assert_eq!(message.to, EMAIL);
    assert!(message.body.contains(&code.code));
}

#[tokio::test]
async fn should_redeem_code_exactly_once() {
    let repo = MockCodeRepo::empty();
    repo.insert(pending_code(EMAIL, "482193", CodePurpose::Registration));

    assert!(redeem(&repo, EMAIL, "482193", CodePurpose::Registration).await.unwrap());
    assert!(!redeem(&repo, EMAIL, "482193", CodePurpose::Registration).await.unwrap());

    let code = repo.latest(EMAIL, CodePurpose::Registration);
    assert_eq!(code.status, CodeStatus::Used);
    assert!(code.verified_at.is_some());
}

#[tokio::test]
async fn should_redeem_freshly_issued_code() {
    let repo = MockCodeRepo::empty();
    issue(&repo, EMAIL, CodePurpose::Registration).await.unwrap();
    let code = repo.latest(EMAIL, CodePurpose::Registration).code;

    assert!(redeem(&repo, EMAIL, &code, CodePurpose::Registration).await.unwrap());
}

#[tokio::test]
async fn should_reject_second_issue_within_a_minute() {
    let repo = MockCodeRepo::empty();
    issue(&repo, EMAIL, CodePurpose::Registration).await.unwrap();

    let err = issue(&repo, EMAIL, CodePurpose::Registration).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::RateLimited));
    assert_eq!(repo.codes_handle().lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_rate_limit_per_purpose_and_email() {
    let repo = MockCodeRepo::empty();
    issue(&repo, EMAIL, CodePurpose::Registration).await.unwrap();

    issue(&repo, EMAIL, CodePurpose::PasswordReset).await.unwrap();
    issue(&repo, "other@b.com", CodePurpose::Registration).await.unwrap();
}

#[tokio::test]
async fn should_invalidate_previous_code_when_reissued() {
    let repo = MockCodeRepo::empty();
    issue(&repo, EMAIL, CodePurpose::Registration).await.unwrap();
    let first = repo.latest(EMAIL, CodePurpose::Registration);
    repo.age_all(61);

    issue(&repo, EMAIL, CodePurpose::Registration).await.unwrap();
    let second = repo.latest(EMAIL, CodePurpose::Registration);
    assert_ne!(first.id, second.id);

    // Only the newest code is PENDING.
    let pending = repo
        .codes_handle()
        .lock()
        .unwrap()
        .iter()
        .filter(|c| c.status == CodeStatus::Pending)
        .count();
    assert_eq!(pending, 1);

    if first.code != second.code {
        assert!(!redeem(&repo, EMAIL, &first.code, CodePurpose::Registration).await.unwrap());
    }
    assert!(redeem(&repo, EMAIL, &second.code, CodePurpose::Registration).await.unwrap());
}

#[tokio::test]
async fn should_report_lost_issuance_race_as_rate_limited() {
    let repo = MockCodeRepo::empty();
    repo.lose_next_race.store(true, Ordering::SeqCst);

    let err = issue(&repo, EMAIL, CodePurpose::Registration).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::RateLimited));
    assert!(repo.outbox_handle().lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_not_redeem_expired_code_without_sweep() {
    let repo = MockCodeRepo::empty();
    repo.insert(pending_code(EMAIL, "482193", CodePurpose::Registration));
    repo.age_all(301);

    assert!(!redeem(&repo, EMAIL, "482193", CodePurpose::Registration).await.unwrap());
    assert_eq!(repo.latest(EMAIL, CodePurpose::Registration).status, CodeStatus::Expired);
}

#[tokio::test]
async fn should_not_redeem_code_for_another_purpose() {
    let repo = MockCodeRepo::empty();
    repo.insert(pending_code(EMAIL, "482193", CodePurpose::Registration));

    assert!(!redeem(&repo, EMAIL, "482193", CodePurpose::PasswordReset).await.unwrap());
    assert!(!redeem(&repo, "x@b.com", "482193", CodePurpose::Registration).await.unwrap());
    assert!(!redeem(&repo, EMAIL, "111111", CodePurpose::Registration).await.unwrap());
    // Misses leave the real code redeemable.
    assert!(redeem(&repo, EMAIL, "482193", CodePurpose::Registration).await.unwrap());
}

#[tokio::test]
async fn should_reject_malformed_email_before_store_access() {
    let repo = MockCodeRepo::empty();

    let err = issue(&repo, "not-an-email", CodePurpose::Registration).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::InvalidEmail));
    let err = redeem(&repo, "a@b", "123456", CodePurpose::Registration).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::InvalidEmail));
    assert!(repo.codes_handle().lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_reject_malformed_code() {
    let repo = MockCodeRepo::empty();
    for bad in ["12345", "1234567", "12a456", ""] {
        let err = redeem(&repo, EMAIL, bad, CodePurpose::Registration).await.unwrap_err();
        assert!(matches!(err, AuthServiceError::InvalidCode), "{bad}");
    }
}

#[tokio::test]
async fn should_sweep_only_overdue_pending_codes() {
    let repo = MockCodeRepo::empty();
    repo.insert(pending_code("old@b.com", "111111", CodePurpose::Registration));
    repo.age_all(400);
    repo.insert(pending_code("new@b.com", "222222", CodePurpose::Registration));

    let swept = SweepExpiredCodesUseCase { codes: repo.clone() }
        .execute(Utc::now())
        .await
        .unwrap();

    assert_eq!(swept, 1);
    assert_eq!(repo.latest("old@b.com", CodePurpose::Registration).status, CodeStatus::Expired);
    assert_eq!(repo.latest("new@b.com", CodePurpose::Registration).status, CodeStatus::Pending);
}
