use deer_auth::error::AuthServiceError;
use deer_auth::usecase::admin::{GetUserUseCase, UpdateUserStatusInput, UpdateUserStatusUseCase};
use deer_domain::id::UserId;
use deer_domain::user::{Role, UserStatus};

use crate::helpers::{MockUserRepo, user};

#[tokio::test]
async fn should_ban_user_case_insensitively() {
    let deer = user("deer", "deer@example.com", Role::User).await;
    let users = MockUserRepo::new(vec![deer.clone()]);

    let updated = UpdateUserStatusUseCase { users: users.clone() }
        .execute(UpdateUserStatusInput {
            user_id: deer.id,
            status: "banned".into(),
        })
        .await
        .unwrap();

    assert_eq!(updated.status, UserStatus::Banned);
    assert_eq!(users.get(deer.id).unwrap().status, UserStatus::Banned);
}

#[tokio::test]
async fn should_reject_unknown_status() {
    let deer = user("deer", "deer@example.com", Role::User).await;
    let err = UpdateUserStatusUseCase {
        users: MockUserRepo::new(vec![deer.clone()]),
    }
    .execute(UpdateUserStatusInput {
        user_id: deer.id,
        status: "deleted".into(),
    })
    .await
    .unwrap_err();
    assert!(matches!(err, AuthServiceError::InvalidStatus));
}

#[tokio::test]
async fn should_report_missing_user() {
    let err = UpdateUserStatusUseCase {
        users: MockUserRepo::empty(),
    }
    .execute(UpdateUserStatusInput {
        user_id: UserId::new(),
        status: "ACTIVE".into(),
    })
    .await
    .unwrap_err();
    assert!(matches!(err, AuthServiceError::UserNotFound));

    let err = GetUserUseCase {
        users: MockUserRepo::empty(),
    }
    .execute(UserId::new())
    .await
    .unwrap_err();
    assert!(matches!(err, AuthServiceError::UserNotFound));
}
