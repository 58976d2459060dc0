//! Session configuration via environment variables.
//!
//! Selects the storage engine, the fixed-window max-age and the session
//! cookie attributes. Validation happens once, when the session manager is
//! built.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant, SystemTime};

/// Lowest accepted session max-age (30 minutes).
pub const MIN_MAX_AGE_SECS: u64 = 1800;

/// Which storage engine backs the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Local,
    DynamoDb,
}

impl FromStr for EngineKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" | "memory" => Ok(EngineKind::Local),
            "dynamodb" | "remote" => Ok(EngineKind::DynamoDb),
            other => Err(ConfigError::UnknownEngine(other.into())),
        }
    }
}

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        };
        f.write_str(s)
    }
}

impl FromStr for SameSite {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            "none" => Ok(SameSite::None),
            _ => Err(ConfigError::InvalidValue {
                key: "SESSION_SAME_SITE".into(),
                value: s.into(),
            }),
        }
    }
}

/// Attributes of the cookie carrying the session ID.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub path: String,
    pub domain: Option<String>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: "l42_session".into(),
            path: "/".into(),
            domain: None,
            http_only: true,
            secure: false,
            same_site: SameSite::Lax,
        }
    }
}

/// Session layer configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub engine: EngineKind,
    pub max_age: Duration,
    pub cookie: CookieSettings,
    /// Namespace prefix for remote-engine keys.
    pub key_prefix: String,
    pub remote_timeout: Duration,
    pub sweep_interval: Duration,
    pub dynamodb_table: String,
    pub dynamodb_endpoint: String,
    pub port: u16,
}

impl SessionConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// Unset variables fall back to [`SessionConfig::default`]; set but
    /// unparsable ones are an error.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let cookie_defaults = CookieSettings::default();

        let engine = match lookup("SESSION_ENGINE") {
            Some(v) => v.parse()?,
            None => defaults.engine,
        };
        let same_site = match lookup("SESSION_SAME_SITE") {
            Some(v) => v.parse()?,
            None => cookie_defaults.same_site,
        };

        Ok(Self {
            engine,
            max_age: Duration::from_secs(parse_or(
                &lookup,
                "SESSION_MAX_AGE",
                defaults.max_age.as_secs(),
            )?),
            cookie: CookieSettings {
                name: lookup("SESSION_COOKIE_NAME").unwrap_or(cookie_defaults.name),
                path: lookup("SESSION_COOKIE_PATH").unwrap_or(cookie_defaults.path),
                domain: lookup("SESSION_COOKIE_DOMAIN").filter(|d| !d.is_empty()),
                http_only: lookup("SESSION_HTTP_ONLY")
                    .map(|v| parse_flag(&v))
                    .unwrap_or(cookie_defaults.http_only),
                secure: lookup("SESSION_HTTPS_ONLY")
                    .map(|v| parse_flag(&v))
                    .unwrap_or(cookie_defaults.secure),
                same_site,
            },
            key_prefix: lookup("SESSION_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            remote_timeout: Duration::from_millis(parse_or(
                &lookup,
                "SESSION_REMOTE_TIMEOUT_MS",
                defaults.remote_timeout.as_millis() as u64,
            )?),
            sweep_interval: Duration::from_secs(parse_or(
                &lookup,
                "SESSION_SWEEP_INTERVAL_SECS",
                defaults.sweep_interval.as_secs(),
            )?),
            dynamodb_table: lookup("DYNAMODB_TABLE").unwrap_or(defaults.dynamodb_table),
            dynamodb_endpoint: lookup("DYNAMODB_ENDPOINT").unwrap_or_default(),
            port: parse_or(&lookup, "PORT", defaults.port)?,
        })
    }

    /// Reject settings the session layer cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_age.as_secs() < MIN_MAX_AGE_SECS {
            return Err(ConfigError::MaxAgeTooShort(self.max_age.as_secs()));
        }
        if SystemTime::now().checked_add(self.max_age).is_none()
            || Instant::now().checked_add(self.max_age).is_none()
        {
            return Err(ConfigError::MaxAgeTooLong(self.max_age.as_secs()));
        }
        if self.cookie.name.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "SESSION_COOKIE_NAME".into(),
                value: String::new(),
            });
        }
        Ok(())
    }

    /// Configuration for tests — local engine, minimum max-age.
    pub fn test_default() -> Self {
        Self::default()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Local,
            max_age: Duration::from_secs(MIN_MAX_AGE_SECS),
            cookie: CookieSettings::default(),
            key_prefix: "session:".into(),
            remote_timeout: Duration::from_secs(2),
            sweep_interval: Duration::from_secs(60),
            dynamodb_table: "l42_sessions".into(),
            dynamodb_endpoint: String::new(),
            port: 3001,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("session max-age must be at least 1800 seconds, got {0}")]
    MaxAgeTooShort(u64),

    #[error("session max-age of {0} seconds cannot be represented as an expiry time")]
    MaxAgeTooLong(u64),

    #[error("unknown session engine: {0}")]
    UnknownEngine(String),

    #[error("session engine construction failed: {0}")]
    Engine(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

fn parse_flag(v: &str) -> bool {
    v == "true" || v == "1" || v == "True"
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.into(),
            value: v,
        }),
        None => Ok(default),
    }
}
