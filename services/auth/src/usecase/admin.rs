use deer_domain::id::UserId;
use deer_domain::user::UserStatus;

use crate::domain::repository::UserRepository;
use crate::domain::types::User;
use crate::error::AuthServiceError;

pub struct GetUserUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> GetUserUseCase<U> {
    pub async fn execute(&self, user_id: UserId) -> Result<User, AuthServiceError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthServiceError::UserNotFound)
    }
}

pub struct UpdateUserStatusInput {
    pub user_id: UserId,
    /// Status name, case-insensitive.
    pub status: String,
}

/// Ban, deactivate or reactivate an account. The gate re-reads status on
/// every request, so the change applies from the target's next request.
pub struct UpdateUserStatusUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> UpdateUserStatusUseCase<U> {
    pub async fn execute(&self, input: UpdateUserStatusInput) -> Result<User, AuthServiceError> {
        let status: UserStatus = input
            .status
            .parse()
            .map_err(|_| AuthServiceError::InvalidStatus)?;

        if !self.users.update_status(input.user_id, status).await? {
            return Err(AuthServiceError::UserNotFound);
        }
        tracing::info!(user_id = %input.user_id, status = %status, "user status updated");

        self.users
            .find_by_id(input.user_id)
            .await?
            .ok_or(AuthServiceError::UserNotFound)
    }
}
