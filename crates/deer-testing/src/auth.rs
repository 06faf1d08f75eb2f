//! Bearer-token helpers for integration tests.
//!
//! Tokens are signed with the same [`TokenService`] the service under test
//! validates with, so requests pass the gate exactly like real clients.

use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue};

use deer_auth_types::token::TokenService;
use deer_domain::id::UserId;
use deer_domain::user::Role;

pub const TEST_JWT_SECRET: &str = "deer-test-secret";
pub const TEST_JWT_TTL_SECS: u64 = 3600;

pub fn test_token_service() -> TokenService {
    TokenService::new(TEST_JWT_SECRET, TEST_JWT_TTL_SECS)
}

/// Identity a test request claims to be.
pub struct MockAuth {
    pub user_id: UserId,
    pub role: Role,
}

impl MockAuth {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// A token signed by `tokens` for this identity.
    pub fn token(&self, tokens: &TokenService) -> String {
        tokens
            .issue(self.user_id, self.role)
            .expect("signing a test token")
            .token
    }

    /// `Authorization: Bearer ...` headers for this identity.
    pub fn headers(&self, tokens: &TokenService) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token(tokens)))
                .expect("token is a valid header value"),
        );
        map
    }
}
