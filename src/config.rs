use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use thiserror::Error;

use crate::constants::MAX_DAYS_BACK;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Tracked account
    pub account_id: String,
    pub session_cookie: String,
    pub days_back: Option<u32>,

    // Upstream API
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub page_delay: Duration,
    pub post_delay: Duration,

    // Database
    pub database_path: PathBuf,

    // Static export
    pub export_dir: PathBuf,
    pub image_workers: usize,

    // Scheduler
    pub schedule_times: Vec<NaiveTime>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Tracked account
            account_id: env_or_default("WEIBO_UID", ""),
            session_cookie: env_or_default("WEIBO_COOKIE", ""),
            days_back: parse_env_optional_u32("WEIBO_DAYS")?,

            // Upstream API
            api_base_url: env_or_default("WEIBO_API_BASE", "https://m.weibo.cn"),
            request_timeout: Duration::from_secs(parse_env_u64("REQUEST_TIMEOUT_SECS", 30)?),
            page_delay: Duration::from_millis(parse_env_u64("PAGE_DELAY_MS", 2000)?),
            post_delay: Duration::from_millis(parse_env_u64("POST_DELAY_MS", 1000)?),

            // Database
            database_path: PathBuf::from(env_or_default(
                "DATABASE_PATH",
                "./data/weibo_data.sqlite",
            )),

            // Static export
            export_dir: PathBuf::from(env_or_default("EXPORT_DIR", "./static")),
            image_workers: parse_env_usize("IMAGE_WORKERS", 10)?,

            // Scheduler
            schedule_times: parse_schedule_times(&env_or_default("SCHEDULE_TIMES", "12:00,22:00"))?,
        })
    }

    /// Validate the settings every command relies on. Credentials are
    /// checked separately by [`Config::validate_credentials`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(days) = self.days_back {
            if !(1..=MAX_DAYS_BACK).contains(&days) {
                return Err(ConfigError::InvalidValue {
                    name: "WEIBO_DAYS".to_string(),
                    message: format!("must be between 1 and {MAX_DAYS_BACK}"),
                });
            }
        }
        if self.image_workers == 0 {
            return Err(ConfigError::InvalidValue {
                name: "IMAGE_WORKERS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.schedule_times.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "SCHEDULE_TIMES".to_string(),
                message: "must list at least one HH:MM time".to_string(),
            });
        }
        Ok(())
    }

    /// Validate the account and session needed to talk to the upstream API.
    ///
    /// # Errors
    ///
    /// Returns an error if the account id or session cookie is empty.
    pub fn validate_credentials(&self) -> Result<(), ConfigError> {
        if self.account_id.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar("WEIBO_UID".to_string()));
        }
        if self.session_cookie.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar("WEIBO_COOKIE".to_string()));
        }
        Ok(())
    }

    /// A complete configuration for tests, with no pacing delays.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            account_id: "1000000001".to_string(),
            session_cookie: "SUB=test-session".to_string(),
            days_back: None,
            api_base_url: "http://127.0.0.1:9".to_string(),
            request_timeout: Duration::from_secs(5),
            page_delay: Duration::ZERO,
            post_delay: Duration::ZERO,
            database_path: PathBuf::from("./data/test.sqlite"),
            export_dir: PathBuf::from("./static"),
            image_workers: 4,
            schedule_times: vec![NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default()],
        }
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_optional_u32(name: &str) -> Result<Option<u32>, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map(Some).map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(None),
    }
}

fn parse_schedule_times(value: &str) -> Result<Vec<NaiveTime>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| ConfigError::InvalidValue {
                name: "SCHEDULE_TIMES".to_string(),
                message: format!("expected HH:MM, got '{s}'"),
            })
        })
        .collect()
}
