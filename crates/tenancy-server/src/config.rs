//! Server configuration
//!
//! Layered with figment: struct defaults, then `tenancy.toml` (or the file
//! given with `--config`), then `TENANCY_*` environment variables.
//!
//! ```text
//!   tenancy.toml:   [session]
//!                   backend = "redis"
//!
//!   env var:        TENANCY_SESSION__BACKEND=redis   (double underscore = nesting)
//! ```

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use tenancy_org::ServiceConfig;

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "tenancy.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TENANCY_";

/// Longest accepted session lifetime (one year).
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Longest accepted invitation lifetime (ten years).
pub const MAX_INVITATION_TTL_DAYS: u32 = 3650;

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub invitations: InvitationConfig,
    #[serde(default)]
    pub service: ServiceTuning,
}

/// Listener settings (`[server]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// `development` logs human-readable lines; anything else logs JSON.
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
        }
    }
}

/// Store settings (`[database]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `memory` for the in-process store, otherwise a `sqlite://` URL
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// Whether the in-process store is selected.
    pub fn is_memory(&self) -> bool {
        self.url.eq_ignore_ascii_case("memory")
    }
}

/// Session store selection.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    #[default]
    Memory,
    Redis,
}

/// Session settings (`[session]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub backend: SessionBackend,
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::default(),
            ttl_secs: default_session_ttl_secs(),
            redis_url: default_redis_url(),
            cookie_name: default_cookie_name(),
        }
    }
}

impl SessionConfig {
    /// Session lifetime, falling back to the default for values
    /// [`Config::validate`] would reject.
    pub fn ttl(&self) -> chrono::Duration {
        i64::try_from(self.ttl_secs)
            .ok()
            .filter(|_| (1..=MAX_SESSION_TTL_SECS).contains(&self.ttl_secs))
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or_else(tenancy_auth::default_session_ttl)
    }
}

/// Invitation settings (`[invitations]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvitationConfig {
    #[serde(default = "default_invitation_ttl_days")]
    pub ttl_days: u32,
}

impl Default for InvitationConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_invitation_ttl_days(),
        }
    }
}

/// Service tuning (`[service]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceTuning {
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

impl Default for ServiceTuning {
    fn default() -> Self {
        Self {
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_environment() -> String {
    "development".to_string()
}
fn default_database_url() -> String {
    "memory".to_string()
}
fn default_max_connections() -> u32 {
    5
}
fn default_session_ttl_secs() -> u64 {
    tenancy_auth::session::DEFAULT_SESSION_TTL_SECS as u64
}
fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}
fn default_cookie_name() -> String {
    "session_id".to_string()
}
fn default_invitation_ttl_days() -> u32 {
    tenancy_org::invitation::INVITATION_EXPIRY_DAYS as u32
}
fn default_operation_timeout_ms() -> u64 {
    5000
}

impl Config {
    /// Figment layering defaults, the config file and `TENANCY_*` env vars.
    ///
    /// A missing config file is not an error.
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate the configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Config = Self::figment(path)
            .extract()
            .context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.session.cookie_name.is_empty() {
            anyhow::bail!("session.cookie_name must not be empty");
        }
        if !(1..=MAX_SESSION_TTL_SECS).contains(&self.session.ttl_secs) {
            anyhow::bail!(
                "session.ttl_secs must be between 1 and {MAX_SESSION_TTL_SECS}, got {}",
                self.session.ttl_secs
            );
        }
        if !(1..=MAX_INVITATION_TTL_DAYS).contains(&self.invitations.ttl_days) {
            anyhow::bail!(
                "invitations.ttl_days must be between 1 and {MAX_INVITATION_TTL_DAYS}, got {}",
                self.invitations.ttl_days
            );
        }
        if self.service.operation_timeout_ms == 0 {
            anyhow::bail!("service.operation_timeout_ms must be at least 1");
        }
        if !self.database.is_memory() && !self.database.url.starts_with("sqlite:") {
            anyhow::bail!(
                "database.url must be `memory` or a sqlite URL, got `{}`",
                self.database.url
            );
        }
        Ok(())
    }

    /// Whether human-readable development logging is selected.
    pub fn is_development(&self) -> bool {
        self.server.environment.eq_ignore_ascii_case("development")
    }

    /// Listener address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .with_context(|| {
                format!(
                    "Invalid listen address {}:{}",
                    self.server.host, self.server.port
                )
            })
    }

    /// Organization service tunables derived from this configuration.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            invitation_ttl: chrono::Duration::days(i64::from(self.invitations.ttl_days)),
            operation_timeout: std::time::Duration::from_millis(self.service.operation_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert!(config.database.is_memory());
        assert_eq!(config.session.backend, SessionBackend::Memory);
        assert_eq!(config.session.cookie_name, "session_id");
        assert_eq!(config.session.ttl_secs, 86_400);
        assert_eq!(config.invitations.ttl_days, 7);
        assert!(config.is_development());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_and_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "tenancy.toml",
                r#"
                [server]
                port = 9000
                environment = "production"

                [database]
                url = "sqlite://tenancy.db"
                "#,
            )?;
            jail.set_env("TENANCY_SERVER__PORT", "9100");
            jail.set_env("TENANCY_SESSION__BACKEND", "redis");
            jail.set_env("TENANCY_INVITATIONS__TTL_DAYS", "3");

            let config = Config::load(None).map_err(|e| e.to_string())?;
            assert_eq!(config.server.port, 9100);
            assert!(!config.is_development());
            assert_eq!(config.database.url, "sqlite://tenancy.db");
            assert_eq!(config.session.backend, SessionBackend::Redis);
            assert_eq!(
                config.service_config().invitation_ttl,
                chrono::Duration::days(3)
            );
            Ok(())
        });
    }

    #[test]
    fn test_rejects_out_of_range_ttls() {
        for ttl_secs in [0, MAX_SESSION_TTL_SECS + 1, u64::MAX] {
            let mut config = Config::default();
            config.session.ttl_secs = ttl_secs;
            assert!(config.validate().is_err(), "ttl_secs = {ttl_secs}");
            assert_eq!(config.session.ttl(), tenancy_auth::default_session_ttl());
        }

        for ttl_days in [0, MAX_INVITATION_TTL_DAYS + 1, u32::MAX] {
            let mut config = Config::default();
            config.invitations.ttl_days = ttl_days;
            assert!(config.validate().is_err(), "ttl_days = {ttl_days}");
        }

        let mut config = Config::default();
        config.session.ttl_secs = MAX_SESSION_TTL_SECS;
        config.invitations.ttl_days = MAX_INVITATION_TTL_DAYS;
        assert!(config.validate().is_ok());
        assert_eq!(config.session.ttl(), chrono::Duration::days(365));
    }

    #[test]
    fn test_rejects_unknown_database() {
        let mut config = Config::default();
        config.database.url = "postgres://localhost/db".to_string();
        assert!(config.validate().is_err());
    }
}
