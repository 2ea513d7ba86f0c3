use std::time::Duration;

use chrono::Duration as ChronoDuration;
use gatekeep_core::login_token::{
    LoginPolicy, DEFAULT_LOGIN_TOKEN_TTL_MINS, DEFAULT_MAX_ACTIVE, DEFAULT_MIN_GAP_SECS,
};
use gatekeep_core::session::{SessionPolicy, DEFAULT_GRACE_DAYS, DEFAULT_SESSION_TTL_DAYS};
use gatekeep_db::PoolSettings;

use crate::auth::password::PasswordPolicy;
use crate::auth::token::TokenConfig;
use crate::mail::MailConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the two secrets have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Token signing configuration.
    pub token: TokenConfig,
    /// Login token lifetime and abuse controls.
    pub login: LoginPolicy,
    /// Session lifetime and grace window.
    pub session: SessionPolicy,
    /// Reject login requests whose IP or device cannot be determined.
    pub require_client_fingerprint: bool,
    /// Admin password rules and hashing cost.
    pub password: PasswordPolicy,
    /// AES-256 key for settings secrets stored in the database.
    pub settings_key: EncryptionKey,
    /// Login email delivery.
    pub mail: MailConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                 |
    /// |------------------------------|-------------------------|
    /// | `HOST`                       | `0.0.0.0`               |
    /// | `PORT`                       | `3000`                  |
    /// | `CORS_ORIGINS`               | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                    |
    /// | `LOGIN_TOKEN_TTL_MINS`       | `10`                    |
    /// | `LOGIN_MAX_ACTIVE`           | `3`                     |
    /// | `LOGIN_MIN_GAP_SECS`         | `60`                    |
    /// | `SESSION_TTL_DAYS`           | `30`                    |
    /// | `SESSION_GRACE_DAYS`         | `3`                     |
    /// | `REQUIRE_CLIENT_FINGERPRINT` | `false`                 |
    /// | `SETTINGS_ENCRYPTION_KEY`    | **required**            |
    ///
    /// Token, password and mail settings are read by [`TokenConfig::from_env`],
    /// [`PasswordPolicy::from_env`] and [`MailConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_or("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", 30);

        let login = LoginPolicy {
            ttl: ChronoDuration::minutes(env_or("LOGIN_TOKEN_TTL_MINS", DEFAULT_LOGIN_TOKEN_TTL_MINS)),
            max_active: env_or("LOGIN_MAX_ACTIVE", DEFAULT_MAX_ACTIVE),
            min_gap: ChronoDuration::seconds(env_or("LOGIN_MIN_GAP_SECS", DEFAULT_MIN_GAP_SECS)),
        };
        assert!(login.max_active > 0, "LOGIN_MAX_ACTIVE must be positive");

        let session = SessionPolicy {
            ttl: ChronoDuration::days(env_or("SESSION_TTL_DAYS", DEFAULT_SESSION_TTL_DAYS)),
            grace: ChronoDuration::days(env_or("SESSION_GRACE_DAYS", DEFAULT_GRACE_DAYS)),
        };

        let require_client_fingerprint: bool = env_or("REQUIRE_CLIENT_FINGERPRINT", false);

        let settings_key = EncryptionKey::from_hex(
            &std::env::var("SETTINGS_ENCRYPTION_KEY")
                .expect("SETTINGS_ENCRYPTION_KEY must be set in the environment"),
        )
        .expect("SETTINGS_ENCRYPTION_KEY must be 64 hex characters");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            token: TokenConfig::from_env(),
            login,
            session,
            require_client_fingerprint,
            password: PasswordPolicy::from_env(),
            settings_key,
            mail: MailConfig::from_env(),
        }
    }
}

/// Database connection settings, read separately so the server config stays
/// usable without a database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool: PoolSettings,
}

impl DatabaseConfig {
    /// | Env Var                   | Default      |
    /// |---------------------------|--------------|
    /// | `DATABASE_URL`            | **required** |
    /// | `DB_MAX_CONNECTIONS`      | `20`         |
    /// | `DB_ACQUIRE_TIMEOUT_SECS` | `5`          |
    /// | `DB_IDLE_TIMEOUT_SECS`    | `30`         |
    /// | `DB_MAX_LIFETIME_SECS`    | `300`        |
    /// | `DB_STATEMENT_TIMEOUT_MS` | `5000`       |
    pub fn from_env() -> Self {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let defaults = PoolSettings::default();

        let pool = PoolSettings {
            max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
            acquire_timeout: Duration::from_secs(env_or(
                "DB_ACQUIRE_TIMEOUT_SECS",
                defaults.acquire_timeout.as_secs(),
            )),
            idle_timeout: Duration::from_secs(env_or(
                "DB_IDLE_TIMEOUT_SECS",
                defaults.idle_timeout.as_secs(),
            )),
            max_lifetime: Duration::from_secs(env_or(
                "DB_MAX_LIFETIME_SECS",
                defaults.max_lifetime.as_secs(),
            )),
            statement_timeout: Duration::from_millis(env_or(
                "DB_STATEMENT_TIMEOUT_MS",
                defaults.statement_timeout.as_millis() as u64,
            )),
        };

        Self { url, pool }
    }
}

/// A 256-bit key. `Debug` never prints the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey(pub [u8; 32]);

impl EncryptionKey {
    pub fn from_hex(value: &str) -> Result<Self, String> {
        let bytes = hex::decode(value.trim()).map_err(|e| e.to_string())?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| format!("expected 32 bytes, got {}", b.len()))?;
        Ok(Self(key))
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

/// Read and parse an environment variable, falling back to `default` when
/// unset. Panics on unparseable values so misconfiguration fails fast.
pub(crate) fn env_or<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} has an invalid value '{raw}': {e}")),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encryption_key_parses_64_hex_chars() {
        let key = EncryptionKey::from_hex(&"ab".repeat(32)).unwrap();
        assert_eq!(key.0, [0xab; 32]);
    }

    #[test]
    fn encryption_key_rejects_wrong_length_and_garbage() {
        assert!(EncryptionKey::from_hex(&"ab".repeat(31)).is_err());
        assert!(EncryptionKey::from_hex("zz").is_err());
    }

    #[test]
    fn encryption_key_debug_is_redacted() {
        let key = EncryptionKey([7; 32]);
        assert_eq!(format!("{key:?}"), "EncryptionKey([REDACTED])");
    }

    #[test]
    fn env_or_falls_back_when_unset() {
        let value: u64 = env_or("GATEKEEP_TEST_SURELY_UNSET_VARIABLE", 42);
        assert_eq!(value, 42);
    }
}
