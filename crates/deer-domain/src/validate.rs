//! Input validators applied before any store access.
//!
//! Each returns `true` when the value is acceptable; callers map `false` to
//! their own validation error.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum stored length of an email address (`users.email`).
pub const EMAIL_MAX_LEN: usize = 100;

/// Maximum stored length of a username (`users.username`).
pub const USERNAME_MAX_LEN: usize = 50;

/// Accepted password length range, in characters.
pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 128;

/// Maximum stored lengths of the optional profile columns.
pub const NICKNAME_MAX_LEN: usize = 50;
pub const LOCATION_MAX_LEN: usize = 100;
pub const AVATAR_URL_MAX_LEN: usize = 500;

/// Number of digits in a verification code.
pub const CODE_LEN: usize = 6;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9+_.-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("static email regex")
});

/// Structural `local@domain.tld` check.
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= EMAIL_MAX_LEN && EMAIL_RE.is_match(email)
}

/// Exactly six ASCII digits.
pub fn is_valid_code(code: &str) -> bool {
    code.len() == CODE_LEN && code.bytes().all(|b| b.is_ascii_digit())
}

pub fn is_valid_username(username: &str) -> bool {
    let trimmed = username.trim();
    !trimmed.is_empty() && trimmed == username && username.chars().count() <= USERNAME_MAX_LEN
}

/// An optional profile value fits its column. `None` always fits.
pub fn fits_len(value: Option<&str>, max: usize) -> bool {
    value.is_none_or(|v| v.chars().count() <= max)
}

pub fn is_valid_password(password: &str) -> bool {
    let len = password.chars().count();
    (PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len)
}
