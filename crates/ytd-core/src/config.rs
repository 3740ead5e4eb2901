//! Environment-driven configuration (§6), parsed once at startup and failing
//! fast on invalid values, sourced entirely from the process environment.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fully resolved runtime configuration for the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_key: Option<String>,
    pub require_api_key: bool,
    pub storage_dir: PathBuf,
    pub file_retention_hours: u64,
    pub workers: u32,
    pub max_concurrent_downloads: u32,
    pub queue_bound: u32,
    pub rate_limit_rps: u32,
    pub rate_limit_burst: u32,
    pub default_timeout_sec: u64,
    pub progress_timeout_sec: u64,
    pub max_content_length: u64,
    pub allowed_domains: Vec<String>,
    pub cookie_encryption_key: Option<String>,
    pub webhook_enable: bool,
    pub webhook_timeout_sec: u64,
    pub webhook_max_retries: u32,
    pub webhook_secret: Option<String>,
    pub log_level: String,
    pub public_base_url: Option<String>,
    pub port: u16,
    pub job_purge_interval_sec: u64,
    pub job_retention_sec: u64,
}

/// A configuration value failed validation at startup.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidInteger { name: &'static str, value: String },

    #[error("{name} must be a valid boolean, got {value:?}")]
    InvalidBool { name: &'static str, value: String },

    #[error("COOKIE_ENCRYPTION_KEY must be 64 hex characters (32 bytes), got {0} characters")]
    InvalidKeyLength(usize),

    #[error("WORKERS must be >= 1, got {0}")]
    NoWorkers(u32),

    #[error("MAX_CONCURRENT_DOWNLOADS must be >= WORKERS ({workers}), got {value}")]
    ConcurrencyBelowWorkers { workers: u32, value: u32 },
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env_string(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidInteger { name, value: raw }),
    }
}

fn env_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env_string(name) {
        None => Ok(default),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidBool { name, value: raw }),
        },
    }
}

impl Config {
    /// Load configuration from the process environment, applying the
    /// defaults listed in §6 and rejecting inconsistent values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let workers = env_parsed("WORKERS", 2u32)?;
        if workers == 0 {
            return Err(ConfigError::NoWorkers(workers));
        }

        let max_concurrent_downloads = env_parsed("MAX_CONCURRENT_DOWNLOADS", workers)?;
        if max_concurrent_downloads < workers {
            return Err(ConfigError::ConcurrencyBelowWorkers {
                workers,
                value: max_concurrent_downloads,
            });
        }

        let cookie_encryption_key = env_string("COOKIE_ENCRYPTION_KEY");
        if let Some(ref key) = cookie_encryption_key {
            if key.len() != 64 {
                return Err(ConfigError::InvalidKeyLength(key.len()));
            }
        }

        let allowed_domains = env_string("ALLOWED_DOMAINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_ascii_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            api_key: env_string("API_KEY"),
            require_api_key: env_bool("REQUIRE_API_KEY", false)?,
            storage_dir: env_string("STORAGE_DIR")
                .map_or_else(|| PathBuf::from("./storage"), PathBuf::from),
            file_retention_hours: env_parsed("FILE_RETENTION_HOURS", 24u64)?,
            workers,
            max_concurrent_downloads,
            queue_bound: env_parsed("QUEUE_BOUND", 64u32)?,
            rate_limit_rps: env_parsed("RATE_LIMIT_RPS", 5u32)?,
            rate_limit_burst: env_parsed("RATE_LIMIT_BURST", 10u32)?,
            default_timeout_sec: env_parsed("DEFAULT_TIMEOUT_SEC", 3600u64)?,
            progress_timeout_sec: env_parsed("PROGRESS_TIMEOUT_SEC", 120u64)?,
            max_content_length: env_parsed("MAX_CONTENT_LENGTH", 10 * 1024 * 1024u64)?,
            allowed_domains,
            cookie_encryption_key,
            webhook_enable: env_bool("WEBHOOK_ENABLE", true)?,
            webhook_timeout_sec: env_parsed("WEBHOOK_TIMEOUT_SEC", 10u64)?,
            webhook_max_retries: env_parsed("WEBHOOK_MAX_RETRIES", 3u32)?,
            webhook_secret: env_string("WEBHOOK_SECRET"),
            log_level: env_string("LOG_LEVEL").unwrap_or_else(|| "warn".to_string()),
            public_base_url: env_string("PUBLIC_BASE_URL"),
            port: env_parsed("PORT", 8080u16)?,
            job_purge_interval_sec: env_parsed("JOB_PURGE_INTERVAL_SEC", 300u64)?,
            job_retention_sec: env_parsed("JOB_RETENTION_SEC", 24 * 3600u64)?,
        })
    }

    #[must_use]
    pub fn cookies_dir(&self) -> PathBuf {
        self.storage_dir.join("cookies")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_concurrent_below_workers_is_rejected() {
        let err = ConfigError::ConcurrencyBelowWorkers {
            workers: 4,
            value: 2,
        };
        assert!(err.to_string().contains('4'));
    }

    #[test]
    fn zero_workers_is_rejected() {
        assert!(matches!(ConfigError::NoWorkers(0), ConfigError::NoWorkers(0)));
    }

    #[test]
    fn key_length_must_be_64_hex_chars() {
        let err = ConfigError::InvalidKeyLength(10);
        assert!(err.to_string().contains("64 hex"));
    }
}
