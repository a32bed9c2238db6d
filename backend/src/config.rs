//! Application configuration.
//!
//! Values come from the environment (a `.env` file is loaded first when
//! present). Every variable is optional:
//!
//! | Variable                         | Default                 |
//! |----------------------------------|-------------------------|
//! | `GUESTLIST_API_URL`              | `http://localhost:8080` |
//! | `GUESTLIST_API_TOKEN`            | unset                   |
//! | `GUESTLIST_DEFAULT_SIDE`         | `mutual`                |
//! | `GUESTLIST_MAX_FILE_SIZE`        | 10 MiB                  |
//! | `GUESTLIST_ERROR_DISPLAY_LIMIT`  | `5`                     |
//! | `GUESTLIST_SESSION_TTL_MINUTES`  | `60`                    |
//! | `PORT`                           | `3000`                  |

use chrono::Duration;
use std::env;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::models::Side;

/// Guest API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Maximum upload size in bytes.
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Number of validation errors listed before "...and N more".
pub const DEFAULT_ERROR_DISPLAY_LIMIT: usize = 5;

/// Idle sessions are dropped after this many minutes.
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 60;

/// HTTP server port.
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq)]
pub struct ImportConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    pub default_side: Side,
    pub max_file_size: usize,
    pub error_display_limit: usize,
    pub session_ttl_minutes: i64,
    pub port: u16,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            default_side: Side::Mutual,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            error_display_limit: DEFAULT_ERROR_DISPLAY_LIMIT,
            session_ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
            port: DEFAULT_PORT,
        }
    }
}

impl ImportConfig {
    /// Idle time after which a session may be dropped.
    ///
    /// Out-of-range values (only possible when the field is set directly)
    /// clamp to at least one minute and at most the largest duration.
    pub fn session_ttl(&self) -> Duration {
        Duration::try_minutes(self.session_ttl_minutes.max(1)).unwrap_or(Duration::MAX)
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try loading .env file
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let default_side = match get("GUESTLIST_DEFAULT_SIDE") {
            Some(value) => Side::known(&value).ok_or_else(|| ConfigError::Invalid {
                key: "GUESTLIST_DEFAULT_SIDE",
                value: value.clone(),
                reason: "expected bride, groom or mutual".to_string(),
            })?,
            None => defaults.default_side,
        };

        let session_ttl_minutes = parse_number(
            get("GUESTLIST_SESSION_TTL_MINUTES"),
            "GUESTLIST_SESSION_TTL_MINUTES",
            defaults.session_ttl_minutes,
        )?;
        if session_ttl_minutes <= 0 || Duration::try_minutes(session_ttl_minutes).is_none() {
            return Err(ConfigError::Invalid {
                key: "GUESTLIST_SESSION_TTL_MINUTES",
                value: session_ttl_minutes.to_string(),
                reason: "expected a positive number of minutes".to_string(),
            });
        }

        Ok(Self {
            api_url: get("GUESTLIST_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            api_token: get("GUESTLIST_API_TOKEN"),
            default_side,
            max_file_size: parse_number(get("GUESTLIST_MAX_FILE_SIZE"), "GUESTLIST_MAX_FILE_SIZE", defaults.max_file_size)?,
            error_display_limit: parse_number(
                get("GUESTLIST_ERROR_DISPLAY_LIMIT"),
                "GUESTLIST_ERROR_DISPLAY_LIMIT",
                defaults.error_display_limit,
            )?,
            session_ttl_minutes,
            port: parse_number(get("PORT"), "PORT", defaults.port)?,
        })
    }
}

fn parse_number<T>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: v.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
