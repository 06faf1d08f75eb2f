use std::fmt;

use serde::Deserialize;

use deer_core::config::Config;
use deer_core::tracing::LogFormat;

/// Auth service configuration loaded from environment variables
/// (field `jwt_ttl_secs` ↔ `JWT_TTL_SECS`).
#[derive(Deserialize)]
pub struct AuthConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// HMAC secret for signing bearer tokens.
    pub jwt_secret: String,
    /// Token lifetime (default 86400).
    #[serde(default = "default_jwt_ttl_secs")]
    pub jwt_ttl_secs: u64,
    /// TCP port to listen on (default 3112).
    #[serde(default = "default_auth_port")]
    pub auth_port: u16,
    /// Sender address on verification emails.
    #[serde(default = "default_mail_from")]
    pub mail_from: String,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default = "default_code_sweep_interval_secs")]
    pub code_sweep_interval_secs: u64,
    #[serde(default = "default_outbox_poll_interval_secs")]
    pub outbox_poll_interval_secs: u64,
    /// Apply pending migrations before serving.
    #[serde(default)]
    pub run_migrations: bool,
}

impl Config for AuthConfig {}

fn default_jwt_ttl_secs() -> u64 {
    86_400
}

fn default_auth_port() -> u16 {
    3112
}

fn default_mail_from() -> String {
    "no-reply@deer.local".to_owned()
}

fn default_code_sweep_interval_secs() -> u64 {
    60
}

fn default_outbox_poll_interval_secs() -> u64 {
    5
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("database_url", &"<redacted>")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_ttl_secs", &self.jwt_ttl_secs)
            .field("auth_port", &self.auth_port)
            .field("mail_from", &self.mail_from)
            .field("log_format", &self.log_format)
            .field("code_sweep_interval_secs", &self.code_sweep_interval_secs)
            .field("outbox_poll_interval_secs", &self.outbox_poll_interval_secs)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}
