use std::sync::Arc;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::routing::get;
use axum::Router;
use axum_test::TestServer;
use chrono::{Duration, Utc};

use deer_auth::gate::run_gate;
use deer_auth::router::route_policy;
use deer_auth_types::identity::{AdminUser, CurrentUser, MaybeUser};
use deer_domain::id::UserId;
use deer_domain::user::{Role, UserStatus};
use deer_testing::auth::{MockAuth, test_token_service};

use crate::helpers::{MockUserRepo, user};

async fn admin_probe(AdminUser(identity): AdminUser) -> String {
    format!("admin:{}", identity.username)
}

async fn me_probe(CurrentUser(identity): CurrentUser) -> String {
    identity.username
}

async fn login_probe(MaybeUser(identity): MaybeUser) -> String {
    match identity {
        Some(identity) => format!("known:{}", identity.username),
        None => "anonymous".to_owned(),
    }
}

/// The production route policy and gate in front of probe handlers, backed
/// by an in-memory user store.
fn server(users: &MockUserRepo) -> TestServer {
    let tokens = Arc::new(test_token_service());
    let policy = Arc::new(route_policy());
    let users = users.clone();

    let app = Router::new()
        .route("/api/admin/users/{id}", get(admin_probe))
        .route("/api/auth/me", get(me_probe))
        .route("/api/auth/login", get(login_probe))
        .layer(middleware::from_fn(move |req: Request, next: Next| {
            let tokens = Arc::clone(&tokens);
            let policy = Arc::clone(&policy);
            let users = users.clone();
            async move { run_gate(&tokens, &users, &policy, req, next).await }
        }));
    TestServer::new(app).unwrap()
}

fn bearer(user_id: UserId, role: Role) -> String {
    MockAuth::new(user_id, role).token(&test_token_service())
}

#[tokio::test]
async fn should_let_admin_through_with_resolved_identity() {
    let admin = user("warden", "warden@example.com", Role::Admin).await;
    let users = MockUserRepo::new(vec![admin.clone()]);

    let response = server(&users)
        .get("/api/admin/users/42")
        .authorization_bearer(bearer(admin.id, Role::Admin))
        .await;

    response.assert_status_ok();
    response.assert_text("admin:warden");
}

#[tokio::test]
async fn should_forbid_non_admin_on_admin_routes() {
    let deer = user("deer", "deer@example.com", Role::User).await;
    let users = MockUserRepo::new(vec![deer.clone()]);

    let response = server(&users)
        .get("/api/admin/users/42")
        .authorization_bearer(bearer(deer.id, Role::User))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn should_reject_anonymous_on_protected_routes() {
    let server = server(&MockUserRepo::empty());

    server
        .get("/api/admin/users/42")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .get("/api/auth/me")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn should_answer_unknown_routes_with_unauthorized_when_anonymous() {
    let deer = user("deer", "deer@example.com", Role::User).await;
    let users = MockUserRepo::new(vec![deer.clone()]);
    let server = server(&users);

    server
        .get("/api/nowhere")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .get("/api/nowhere")
        .authorization_bearer(bearer(deer.id, Role::User))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn should_serve_public_routes_anonymously() {
    let response = server(&MockUserRepo::empty()).get("/api/auth/login").await;

    response.assert_status_ok();
    response.assert_text("anonymous");
}

#[tokio::test]
async fn should_treat_invalid_tokens_as_anonymous() {
    let deer = user("deer", "deer@example.com", Role::User).await;
    let users = MockUserRepo::new(vec![deer.clone()]);
    let server = server(&users);

    let expired = test_token_service()
        .issue_at(deer.id, Role::User, Utc::now() - Duration::hours(2))
        .unwrap()
        .token;
    for token in [expired, "not-a-jwt".to_owned()] {
        server
            .get("/api/auth/login")
            .authorization_bearer(&token)
            .await
            .assert_text("anonymous");
        server
            .get("/api/auth/me")
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn should_treat_unknown_subject_as_anonymous() {
    let server = server(&MockUserRepo::empty());

    server
        .get("/api/auth/me")
        .authorization_bearer(bearer(UserId::new(), Role::User))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn should_lock_out_banned_user_on_next_request() {
    let deer = user("deer", "deer@example.com", Role::User).await;
    let users = MockUserRepo::new(vec![deer.clone()]);
    let server = server(&users);
    let token = bearer(deer.id, Role::User);

    server
        .get("/api/auth/me")
        .authorization_bearer(&token)
        .await
        .assert_text("deer");

    users.users_handle().lock().unwrap()[0].status = UserStatus::Banned;

    server
        .get("/api/auth/me")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn should_use_stored_role_over_token_claim() {
    let demoted = user("warden", "warden@example.com", Role::User).await;
    let users = MockUserRepo::new(vec![demoted.clone()]);

    // Token still claims ADMIN from before the demotion.
    server(&users)
        .get("/api/admin/users/42")
        .authorization_bearer(bearer(demoted.id, Role::Admin))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}
