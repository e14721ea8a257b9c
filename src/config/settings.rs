//! Environment-variable settings loader.
//!
//! The env surface is the operational contract: required Telegram credentials,
//! optional SSE binding and API key, and connection tuning passed through to
//! the client layer. Missing or malformed required variables fail startup.

use thiserror::Error;

const ENV_API_ID: &str = "TELEGRAM_API_ID";
const ENV_API_HASH: &str = "TELEGRAM_API_HASH";
const ENV_SESSION_STRING: &str = "TELEGRAM_SESSION_STRING";
const ENV_HOST: &str = "TELEGRAM_MCP_HOST";
const ENV_PORT: &str = "TELEGRAM_MCP_PORT";
const ENV_SSE_API_KEY: &str = "TELEGRAM_MCP_SSE_API_KEY";
const ENV_TIMEOUT: &str = "TELEGRAM_TIMEOUT";
const ENV_RETRY_DELAY: &str = "TELEGRAM_RETRY_DELAY";
const ENV_CONNECTION_RETRIES: &str = "TELEGRAM_CONNECTION_RETRIES";

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3001
}
fn default_connect_timeout_secs() -> u64 {
    30
}
fn default_retry_delay_secs() -> u64 {
    1
}
fn default_connection_retries() -> u32 {
    5
}

/// Settings load error. Startup aborts on any of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    /// A variable is set but cannot be parsed.
    #[error("invalid value for {name}: {reason}")]
    InvalidVar {
        /// Environment variable name.
        name: &'static str,
        /// Why parsing failed.
        reason: String,
    },
}

/// Runtime settings resolved from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Telegram application id (from my.telegram.org).
    pub api_id: i32,
    /// Telegram application hash.
    pub api_hash: String,
    /// Opaque session credential; held in memory only, never written to disk.
    pub session_string: String,
    /// SSE listen host.
    pub host: String,
    /// SSE listen port.
    pub port: u16,
    /// Optional bearer token guarding the SSE/MCP routes.
    pub sse_api_key: Option<String>,
    /// Per-attempt connect timeout, seconds.
    pub connect_timeout_secs: u64,
    /// Delay between connect attempts, seconds.
    pub retry_delay_secs: u64,
    /// Connect attempts before giving up.
    pub connection_retries: u32,
}

impl Settings {
    /// Load settings from the process environment.
    ///
    /// # Errors
    /// Returns `ConfigError` when a required variable is missing or any value
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an injectable lookup (used by tests).
    ///
    /// Values are trimmed; empty strings count as unset.
    ///
    /// # Errors
    /// Same contract as [`Settings::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &'static str| -> Option<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |name: &'static str| get(name).ok_or(ConfigError::MissingVar(name));

        let api_id = parse_var(ENV_API_ID, require(ENV_API_ID)?)?;
        let api_hash = require(ENV_API_HASH)?;
        let session_string = require(ENV_SESSION_STRING)?;

        let host = get(ENV_HOST).unwrap_or_else(default_host);
        let port = match get(ENV_PORT) {
            Some(raw) => parse_var(ENV_PORT, raw)?,
            None => default_port(),
        };
        let sse_api_key = get(ENV_SSE_API_KEY);

        let connect_timeout_secs = match get(ENV_TIMEOUT) {
            Some(raw) => parse_var(ENV_TIMEOUT, raw)?,
            None => default_connect_timeout_secs(),
        };
        let retry_delay_secs = match get(ENV_RETRY_DELAY) {
            Some(raw) => parse_var(ENV_RETRY_DELAY, raw)?,
            None => default_retry_delay_secs(),
        };
        let connection_retries = match get(ENV_CONNECTION_RETRIES) {
            Some(raw) => parse_var(ENV_CONNECTION_RETRIES, raw)?,
            None => default_connection_retries(),
        };

        Ok(Self {
            api_id,
            api_hash,
            session_string,
            host,
            port,
            sse_api_key,
            connect_timeout_secs,
            retry_delay_secs,
            connection_retries,
        })
    }

    /// `host:port` string for the SSE listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Load only the application credentials. The interactive login flow runs
    /// before a session string exists, so it needs just these two.
    ///
    /// # Errors
    /// Returns `ConfigError` when either credential is missing or the id
    /// fails to parse.
    pub fn login_credentials_from_env() -> Result<(i32, String), ConfigError> {
        let get = |name: &'static str| -> Option<String> {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let api_id = parse_var(
            ENV_API_ID,
            get(ENV_API_ID).ok_or(ConfigError::MissingVar(ENV_API_ID))?,
        )?;
        let api_hash = get(ENV_API_HASH).ok_or(ConfigError::MissingVar(ENV_API_HASH))?;
        Ok((api_id, api_hash))
    }
}

fn parse_var<T>(name: &'static str, raw: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::InvalidVar {
        name,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn required() -> HashMap<String, String> {
        env(&[
            ("TELEGRAM_API_ID", "12345"),
            ("TELEGRAM_API_HASH", "abcdef0123456789"),
            ("TELEGRAM_SESSION_STRING", "c2Vzc2lvbg=="),
        ])
    }

    fn load(vars: &HashMap<String, String>) -> Result<Settings, ConfigError> {
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_optional_vars_absent() {
        let settings = load(&required()).expect("settings");
        assert_eq!(settings.api_id, 12345);
        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.port, 3001);
        assert!(settings.sse_api_key.is_none());
        assert_eq!(settings.connect_timeout_secs, 30);
        assert_eq!(settings.retry_delay_secs, 1);
        assert_eq!(settings.connection_retries, 5);
    }

    #[test]
    fn missing_required_var_is_reported_by_name() {
        let mut vars = required();
        vars.remove("TELEGRAM_SESSION_STRING");
        let err = load(&vars).expect_err("should fail");
        assert!(err.to_string().contains("TELEGRAM_SESSION_STRING"));
    }

    #[test]
    fn empty_required_var_counts_as_missing() {
        let mut vars = required();
        vars.insert("TELEGRAM_API_HASH".to_string(), "   ".to_string());
        let err = load(&vars).expect_err("should fail");
        assert!(matches!(err, ConfigError::MissingVar("TELEGRAM_API_HASH")));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut vars = required();
        vars.insert("TELEGRAM_MCP_PORT".to_string(), "not-a-port".to_string());
        let err = load(&vars).expect_err("should fail");
        assert!(err.to_string().contains("TELEGRAM_MCP_PORT"));
    }

    #[test]
    fn overrides_and_api_key_are_picked_up() {
        let mut vars = required();
        vars.insert("TELEGRAM_MCP_HOST".to_string(), "127.0.0.1".to_string());
        vars.insert("TELEGRAM_MCP_PORT".to_string(), "8000".to_string());
        vars.insert(
            "TELEGRAM_MCP_SSE_API_KEY".to_string(),
            "secret-token".to_string(),
        );
        vars.insert("TELEGRAM_CONNECTION_RETRIES".to_string(), "2".to_string());
        let settings = load(&vars).expect("settings");
        assert_eq!(settings.bind_addr(), "127.0.0.1:8000");
        assert_eq!(settings.sse_api_key.as_deref(), Some("secret-token"));
        assert_eq!(settings.connection_retries, 2);
    }

    #[test]
    fn values_are_trimmed() {
        let mut vars = required();
        vars.insert("TELEGRAM_API_ID".to_string(), " 777 ".to_string());
        let settings = load(&vars).expect("settings");
        assert_eq!(settings.api_id, 777);
    }
}
