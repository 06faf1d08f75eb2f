use std::sync::Arc;

use chrono::{DateTime, Utc};

use deer_auth_types::token::TokenService;
use deer_domain::id::UserId;
use deer_domain::validate::{
    AVATAR_URL_MAX_LEN, LOCATION_MAX_LEN, NICKNAME_MAX_LEN, fits_len, is_valid_code,
    is_valid_email, is_valid_password, is_valid_username,
};
use deer_domain::verification::CodePurpose;

use crate::domain::repository::{UserRepository, VerificationCodeRepository};
use crate::domain::types::{ProfileUpdate, User};
use crate::error::AuthServiceError;
use crate::usecase::password::{UNKNOWN_USER_DIGEST, hash_password, verify_password};
use crate::usecase::verification::{RedeemCodeInput, redeem_code};

fn check_new_password(password: &str, confirm: &str) -> Result<(), AuthServiceError> {
    if !is_valid_password(password) {
        return Err(AuthServiceError::InvalidPassword);
    }
    if password != confirm {
        return Err(AuthServiceError::PasswordMismatch);
    }
    Ok(())
}

fn check_profile(update: &ProfileUpdate) -> Result<(), AuthServiceError> {
    let fits = fits_len(update.nickname.as_deref(), NICKNAME_MAX_LEN)
        && fits_len(update.location.as_deref(), LOCATION_MAX_LEN)
        && fits_len(update.avatar_url.as_deref(), AVATAR_URL_MAX_LEN);
    if !fits {
        return Err(AuthServiceError::InvalidProfile);
    }
    Ok(())
}

fn check_nickname(nickname: Option<&str>) -> Result<(), AuthServiceError> {
    if !fits_len(nickname, NICKNAME_MAX_LEN) {
        return Err(AuthServiceError::InvalidProfile);
    }
    Ok(())
}

async fn ensure_available<U: UserRepository>(
    users: &U,
    username: &str,
    email: &str,
) -> Result<(), AuthServiceError> {
    if users.find_by_username(username).await?.is_some() {
        return Err(AuthServiceError::UsernameTaken);
    }
    if users.find_by_email(email).await?.is_some() {
        return Err(AuthServiceError::EmailTaken);
    }
    Ok(())
}

async fn consume_code<V: VerificationCodeRepository>(
    codes: &V,
    email: &str,
    code: &str,
    purpose: CodePurpose,
) -> Result<(), AuthServiceError> {
    let input = RedeemCodeInput {
        email: email.to_owned(),
        code: code.to_owned(),
        purpose,
    };
    if !redeem_code(codes, &input).await? {
        return Err(AuthServiceError::InvalidVerificationCode);
    }
    Ok(())
}

// ── Login ────────────────────────────────────────────────────────────────────

pub struct LoginInput {
    /// Username or email address.
    pub username: String,
    pub password: String,
}

#[derive(Debug)]
pub struct LoginOutput {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

pub struct LoginUseCase<U: UserRepository> {
    pub users: U,
    pub tokens: Arc<TokenService>,
}

impl<U: UserRepository> LoginUseCase<U> {
    pub async fn execute(&self, input: LoginInput) -> Result<LoginOutput, AuthServiceError> {
        let user = match self.users.find_by_username(&input.username).await? {
            Some(user) => Some(user),
            None => self.users.find_by_email(&input.username).await?,
        };
        // Unknown user, wrong password and locked account look the same,
        // including in how long they take.
        let Some(mut user) = user else {
            verify_password(&input.password, UNKNOWN_USER_DIGEST).await;
            return Err(AuthServiceError::InvalidCredentials);
        };

        if !verify_password(&input.password, &user.password_hash).await
            || !user.status.can_authenticate()
        {
            return Err(AuthServiceError::InvalidCredentials);
        }

        let now = Utc::now();
        self.users.record_login(user.id, now).await?;
        user.last_login_time = Some(now);

        let issued = self
            .tokens
            .issue(user.id, user.role)
            .map_err(|e| AuthServiceError::Internal(e.into()))?;

        tracing::info!(user_id = %user.id, "user logged in");
        Ok(LoginOutput {
            token: issued.token,
            expires_at: issued.expires_at,
            user,
        })
    }
}

// ── Register ─────────────────────────────────────────────────────────────────

pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub nickname: Option<String>,
}

pub struct RegisterUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> RegisterUseCase<U> {
    pub async fn execute(&self, input: RegisterInput) -> Result<User, AuthServiceError> {
        if !is_valid_username(&input.username) {
            return Err(AuthServiceError::InvalidUsername);
        }
        if !is_valid_email(&input.email) {
            return Err(AuthServiceError::InvalidEmail);
        }
        check_new_password(&input.password, &input.confirm_password)?;
        check_nickname(input.nickname.as_deref())?;
        ensure_available(&self.users, &input.username, &input.email).await?;

        let password_hash = hash_password(&input.password).await?;
        let user = User::new(
            input.username,
            input.email,
            password_hash,
            input.nickname,
            false,
        );
        self.users.create(&user).await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }
}

// ── Register with email code ─────────────────────────────────────────────────

pub struct RegisterWithEmailInput {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub verification_code: String,
    pub nickname: Option<String>,
}

pub struct RegisterWithEmailUseCase<U: UserRepository, V: VerificationCodeRepository> {
    pub users: U,
    pub codes: V,
}

impl<U: UserRepository, V: VerificationCodeRepository> RegisterWithEmailUseCase<U, V> {
    pub async fn execute(&self, input: RegisterWithEmailInput) -> Result<User, AuthServiceError> {
        if !is_valid_email(&input.email) {
            return Err(AuthServiceError::InvalidEmail);
        }
        // The address doubles as the username.
        if !is_valid_username(&input.email) {
            return Err(AuthServiceError::InvalidUsername);
        }
        check_new_password(&input.password, &input.confirm_password)?;
        if !is_valid_code(&input.verification_code) {
            return Err(AuthServiceError::InvalidCode);
        }
        check_nickname(input.nickname.as_deref())?;

        // Conflicts first, so a doomed registration does not burn the code.
        ensure_available(&self.users, &input.email, &input.email).await?;
        consume_code(
            &self.codes,
            &input.email,
            &input.verification_code,
            CodePurpose::Registration,
        )
        .await?;

        let nickname = input
            .nickname
            .filter(|n| !n.trim().is_empty())
            .or_else(|| {
                input
                    .email
                    .split('@')
                    .next()
                    .map(|local| local.chars().take(NICKNAME_MAX_LEN).collect())
            });
        let password_hash = hash_password(&input.password).await?;
        let user = User::new(
            input.email.clone(),
            input.email,
            password_hash,
            nickname,
            true,
        );
        self.users.create(&user).await?;

        tracing::info!(user_id = %user.id, "user registered with verified email");
        Ok(user)
    }
}

// ── Reset password ───────────────────────────────────────────────────────────

pub struct ResetPasswordInput {
    pub email: String,
    pub new_password: String,
    pub confirm_password: String,
    pub verification_code: String,
}

pub struct ResetPasswordUseCase<U: UserRepository, V: VerificationCodeRepository> {
    pub users: U,
    pub codes: V,
}

impl<U: UserRepository, V: VerificationCodeRepository> ResetPasswordUseCase<U, V> {
    pub async fn execute(&self, input: ResetPasswordInput) -> Result<(), AuthServiceError> {
        if !is_valid_email(&input.email) {
            return Err(AuthServiceError::InvalidEmail);
        }
        check_new_password(&input.new_password, &input.confirm_password)?;
        consume_code(
            &self.codes,
            &input.email,
            &input.verification_code,
            CodePurpose::PasswordReset,
        )
        .await?;

        let user = self
            .users
            .find_by_email(&input.email)
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;
        let password_hash = hash_password(&input.new_password).await?;
        self.users.update_password(user.id, &password_hash).await?;

        tracing::info!(user_id = %user.id, "password reset");
        Ok(())
    }
}

// ── Current user ─────────────────────────────────────────────────────────────

pub struct GetCurrentUserUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> GetCurrentUserUseCase<U> {
    pub async fn execute(&self, user_id: UserId) -> Result<User, AuthServiceError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthServiceError::UserNotFound)
    }
}

pub struct UpdateProfileUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> UpdateProfileUseCase<U> {
    pub async fn execute(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, AuthServiceError> {
        check_profile(&update)?;
        if !update.is_empty() {
            self.users.update_profile(user_id, &update).await?;
        }
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthServiceError::UserNotFound)
    }
}

// ── Change password ──────────────────────────────────────────────────────────

pub struct ChangePasswordInput {
    pub user_id: UserId,
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

pub struct ChangePasswordUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> ChangePasswordUseCase<U> {
    pub async fn execute(&self, input: ChangePasswordInput) -> Result<(), AuthServiceError> {
        check_new_password(&input.new_password, &input.confirm_password)?;
        let user = self
            .users
            .find_by_id(input.user_id)
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;
        if !verify_password(&input.old_password, &user.password_hash).await {
            return Err(AuthServiceError::WrongPassword);
        }

        let password_hash = hash_password(&input.new_password).await?;
        self.users.update_password(user.id, &password_hash).await?;
        tracing::info!(user_id = %user.id, "password changed");
        Ok(())
    }
}

// ── Change email ─────────────────────────────────────────────────────────────

pub struct ChangeEmailInput {
    pub user_id: UserId,
    pub email: String,
    pub verification_code: String,
}

pub struct ChangeEmailUseCase<U: UserRepository, V: VerificationCodeRepository> {
    pub users: U,
    pub codes: V,
}

impl<U: UserRepository, V: VerificationCodeRepository> ChangeEmailUseCase<U, V> {
    pub async fn execute(&self, input: ChangeEmailInput) -> Result<User, AuthServiceError> {
        if !is_valid_email(&input.email) {
            return Err(AuthServiceError::InvalidEmail);
        }
        if !is_valid_code(&input.verification_code) {
            return Err(AuthServiceError::InvalidCode);
        }
        let owner = self.users.find_by_email(&input.email).await?;
        if owner.is_some_and(|owner| owner.id != input.user_id) {
            return Err(AuthServiceError::EmailTaken);
        }
        consume_code(
            &self.codes,
            &input.email,
            &input.verification_code,
            CodePurpose::EmailChange,
        )
        .await?;

        self.users.update_email(input.user_id, &input.email).await?;
        tracing::info!(user_id = %input.user_id, "email changed");
        self.users
            .find_by_id(input.user_id)
            .await?
            .ok_or(AuthServiceError::UserNotFound)
    }
}
