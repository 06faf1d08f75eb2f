//! Static route-access policy.
//!
//! Patterns are path templates split on `/`: a literal segment matches
//! itself, `*` matches exactly one segment and a trailing `**` matches any
//! remainder (including none). Rules are tried in order and the first match
//! wins; a path no rule matches requires authentication.

use deer_core::error::AppError;
use deer_domain::user::Role;

use crate::identity::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Role(Role),
}

#[derive(Debug, Clone)]
pub struct Rule {
    pattern: String,
    access: Access,
}

impl Rule {
    pub fn new(pattern: impl Into<String>, access: Access) -> Self {
        Self {
            pattern: pattern.into(),
            access,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        let mut pattern = segments(&self.pattern);
        let mut path = segments(path);
        loop {
            match (pattern.next(), path.next()) {
                (Some("**"), _) => return true,
                (Some(p), Some(s)) if p == "*" || p == s => {}
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Default)]
pub struct RoutePolicy {
    rules: Vec<Rule>,
}

impl RoutePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, pattern: impl Into<String>, access: Access) -> Self {
        self.rules.push(Rule::new(pattern, access));
        self
    }

    pub fn access_for(&self, path: &str) -> Access {
        self.rules
            .iter()
            .find(|rule| rule.matches(path))
            .map(|rule| rule.access)
            .unwrap_or(Access::Authenticated)
    }

    /// Decide whether `identity` may reach `path`.
    pub fn check(&self, path: &str, identity: Option<&Identity>) -> Result<(), AppError> {
        match (self.access_for(path), identity) {
            (Access::Public, _) => Ok(()),
            (_, None) => Err(AppError::Unauthorized),
            (Access::Authenticated, Some(_)) => Ok(()),
            (Access::Role(required), Some(identity)) if identity.role.satisfies(required) => Ok(()),
            (Access::Role(_), Some(_)) => Err(AppError::Forbidden),
        }
    }
}
