//! Configuration loading and representation.
//!
//! Everything is read once at startup and handed to constructors explicitly;
//! nothing is kept in process-global state.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use stocksync_inventory::SyncSettings;

pub const ENV_ACCESS_TOKEN: &str = "MOYSKLAD_TOKEN";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_BASE_URL: &str = "MOYSKLAD_BASE_URL";
pub const ENV_POLL_INTERVAL_SECS: &str = "SYNC_POLL_INTERVAL_SECS";
pub const ENV_PAGE_SIZE: &str = "SYNC_PAGE_SIZE";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "SYNC_HTTP_TIMEOUT_SECS";
pub const ENV_DB_MAX_CONNECTIONS: &str = "SYNC_DB_MAX_CONNECTIONS";

pub const DEFAULT_BASE_URL: &str = "https://api.moysklad.ru/api/remap/1.2";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(45 * 60);
pub const DEFAULT_PAGE_SIZE: u32 = 1;
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Fatal conditions that prevent the process from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{0} is not set")]
    MissingVar(&'static str),

    #[error("{name} has invalid value {value:?}: {reason}")]
    InvalidVar {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("database is unreachable: {0}")]
    Database(String),

    #[error("http client could not be built: {0}")]
    HttpClient(String),
}

/// Process configuration.
#[derive(Clone)]
pub struct SyncConfig {
    /// Bearer token of the remote service.
    pub access_token: String,
    pub database_url: String,
    pub base_url: String,
    pub poll_interval: Duration,
    /// Products fetched and reconciled per iteration of a pass.
    pub page_size: u32,
    pub http_timeout: Duration,
    pub db_max_connections: u32,
    pub settings: SyncSettings,
}

// Credentials stay out of logs.
impl core::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("access_token", &"<redacted>")
            .field("database_url", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("poll_interval", &self.poll_interval)
            .field("page_size", &self.page_size)
            .field("http_timeout", &self.http_timeout)
            .field("db_max_connections", &self.db_max_connections)
            .field("settings", &self.settings)
            .finish()
    }
}

impl SyncConfig {
    pub fn new(access_token: impl Into<String>, database_url: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            database_url: database_url.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            page_size: DEFAULT_PAGE_SIZE,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            settings: SyncSettings::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, StartupError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StartupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(StartupError::MissingVar(name))
        };

        let mut config = Self::new(required(ENV_ACCESS_TOKEN)?, required(ENV_DATABASE_URL)?);

        if let Some(base_url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            config.base_url = base_url_value(&base_url)?;
        }
        if let Some(secs) = positive(&lookup, ENV_POLL_INTERVAL_SECS)? {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(size) = positive(&lookup, ENV_PAGE_SIZE)? {
            config.page_size = narrow(ENV_PAGE_SIZE, size)?;
        }
        if let Some(secs) = positive(&lookup, ENV_HTTP_TIMEOUT_SECS)? {
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(max) = positive(&lookup, ENV_DB_MAX_CONNECTIONS)? {
            config.db_max_connections = narrow(ENV_DB_MAX_CONNECTIONS, max)?;
        }

        Ok(config)
    }
}

/// Optional strictly positive integer variable.
fn positive<F>(lookup: &F, name: &'static str) -> Result<Option<u64>, StartupError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };

    let value = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| StartupError::InvalidVar {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        })?;

    if value == 0 {
        return Err(StartupError::InvalidVar {
            name,
            value: raw,
            reason: "must be greater than zero".to_string(),
        });
    }

    Ok(Some(value))
}

/// Base URL of the remote service: absolute `http`/`https` URL with a host,
/// returned without a trailing slash.
pub fn base_url_value(raw: &str) -> Result<String, StartupError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = |reason: String| StartupError::InvalidVar {
        name: ENV_BASE_URL,
        value: raw.to_string(),
        reason,
    };

    let url = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }

    Ok(trimmed.to_string())
}

fn narrow(name: &'static str, value: u64) -> Result<u32, StartupError> {
    u32::try_from(value).map_err(|e| StartupError::InvalidVar {
        name,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
