//! Cache client configuration.

use cachet_core::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the cache client.
///
/// Consumed once by [`RedisCache::connect`](crate::RedisCache::connect); the
/// client copies out the values it needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Redis port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Password, if the server requires one.
    #[serde(default)]
    pub password: Option<String>,

    /// Database index.
    #[serde(default)]
    pub db: i64,

    /// TTL applied to stored keys when the caller supplies none.
    #[serde(default = "default_ttl")]
    pub default_ttl_secs: u64,

    /// Default timeout for blocking operations.
    #[serde(default = "default_blocking_timeout")]
    pub blocking_timeout_secs: u64,

    /// Connection establishment retry policy.
    #[serde(default)]
    pub retry: RetryConfig,

    /// JWT-mode flag, carried for callers that key sessions off tokens.
    #[serde(default)]
    pub jwt_mode: bool,

    /// Cookie-mode flag, carried for callers that key sessions off cookies.
    #[serde(default)]
    pub cookie_mode: bool,

    /// Cookie key name used when `cookie_mode` is set.
    #[serde(default)]
    pub cookie_key: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            password: None,
            db: 0,
            default_ttl_secs: default_ttl(),
            blocking_timeout_secs: default_blocking_timeout(),
            retry: RetryConfig::default(),
            jwt_mode: false,
            cookie_mode: false,
            cookie_key: String::new(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    6379
}

fn default_ttl() -> u64 {
    5
}

fn default_blocking_timeout() -> u64 {
    10
}

/// Retry policy for connection establishment.
///
/// `max_attempts: None` retries forever, blocking the first caller until the
/// server becomes reachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum connection attempts before giving up (`None` = unbounded).
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Delay between attempts in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: None,
            delay_ms: default_retry_delay(),
        }
    }
}

fn default_retry_delay() -> u64 {
    2000
}

impl RetryConfig {
    /// Returns the inter-attempt delay as a Duration.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl CacheConfig {
    /// Starts a builder pre-populated with the defaults.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder {
            config: CacheConfig::default(),
        }
    }

    /// Returns the `host:port` address.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the default key TTL as a Duration.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// Returns the blocking timeout as a Duration.
    pub fn blocking_timeout(&self) -> Duration {
        Duration::from_secs(self.blocking_timeout_secs)
    }

    /// Checks the record for values the client cannot operate with.
    pub fn validate(&self) -> CacheResult<()> {
        if self.host.is_empty() {
            return Err(CacheError::Configuration(
                "host must not be empty".to_string(),
            ));
        }
        if self.db < 0 {
            return Err(CacheError::Configuration(format!(
                "database index must not be negative, got {}",
                self.db
            )));
        }
        if self.default_ttl_secs == 0 {
            return Err(CacheError::Configuration(
                "default TTL must be at least 1 second".to_string(),
            ));
        }
        if self.blocking_timeout_secs == 0 {
            return Err(CacheError::Configuration(
                "blocking timeout must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }
}

/// Chained-setter builder for [`CacheConfig`].
///
/// Later calls override earlier ones; [`build`](Self::build) validates the
/// finished record.
#[derive(Debug, Clone)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    /// Overrides the host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Overrides the port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    /// Overrides the database index.
    #[must_use]
    pub fn db(mut self, db: i64) -> Self {
        self.config.db = db;
        self
    }

    /// Overrides the default key TTL.
    #[must_use]
    pub fn default_ttl_secs(mut self, secs: u64) -> Self {
        self.config.default_ttl_secs = secs;
        self
    }

    /// Overrides the blocking timeout.
    #[must_use]
    pub fn blocking_timeout_secs(mut self, secs: u64) -> Self {
        self.config.blocking_timeout_secs = secs;
        self
    }

    /// Bounds connection establishment to at most `attempts` tries.
    #[must_use]
    pub fn max_connect_attempts(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = Some(attempts);
        self
    }

    /// Overrides the delay between connection attempts.
    #[must_use]
    pub fn connect_retry_delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.retry.delay_ms = delay_ms;
        self
    }

    /// Marks the cache as holding JWT session material.
    #[must_use]
    pub fn jwt_mode(mut self) -> Self {
        self.config.jwt_mode = true;
        self
    }

    /// Marks the cache as holding cookie session material under `key`.
    #[must_use]
    pub fn cookie_key(mut self, key: impl Into<String>) -> Self {
        self.config.cookie_mode = true;
        self.config.cookie_key = key.into();
        self
    }

    /// Validates and returns the finished configuration.
    pub fn build(self) -> CacheResult<CacheConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
