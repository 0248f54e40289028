//! Redis-backed cache client with a lazily-established shared connection.

use crate::config::{CacheConfig, RetryConfig};
use crate::script;
use async_trait::async_trait;
use cachet_core::{CacheError, CacheResult};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo, Script};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, error, warn};

/// Cache operations over raw string/byte payloads.
///
/// Object-safe; typed JSON helpers live on [`CacheExt`].
#[async_trait]
pub trait Cache: Send + Sync {
    /// Stores text under `key` with the given TTL in seconds.
    ///
    /// A `None` TTL falls back to the configured default.
    async fn store_raw(&self, key: &str, value: &str, ttl: Option<u64>) -> CacheResult<()>;

    /// Stores a pre-encoded JSON byte payload under `key`.
    ///
    /// The payload is rejected with [`CacheError::InvalidPayload`] when it is
    /// not well-formed JSON.
    async fn store_bytes(&self, key: &str, value: &[u8], ttl: Option<u64>) -> CacheResult<()>;

    /// Checks whether `key` holds a value.
    ///
    /// Backend failures collapse to `false`; the distinction from "absent" is
    /// only visible in the log stream.
    async fn contains_key(&self, key: &str) -> bool;

    /// Returns the raw stored representation of `key`, or `None` when the key
    /// is absent or the backend failed. Callers decode as needed.
    async fn get_raw(&self, key: &str) -> Option<String>;

    /// Deletes all given keys in one round trip and returns the number
    /// actually removed. Backend failures collapse to `0`.
    async fn delete(&self, keys: &[&str]) -> u64;

    /// Rewrites the value of `key` while preserving its remaining TTL.
    ///
    /// Runs as a single atomic server-side evaluation; a key that is absent
    /// or has no TTL is left unchanged without error.
    async fn update_preserving_ttl(&self, key: &str, new_value: &str) -> CacheResult<()>;
}

/// Extension trait with typed JSON methods for convenience.
#[async_trait]
pub trait CacheExt: Cache {
    /// Serializes `value` to JSON and stores it under `key`.
    async fn store<T: serde::Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<u64>,
    ) -> CacheResult<()> {
        let json = serde_json::to_string(value)?;
        self.store_raw(key, &json, ttl).await
    }

    /// Fetches `key` and decodes it from JSON.
    ///
    /// Absent keys, backend failures, and undecodable payloads all yield
    /// `None`; decode failures are logged.
    async fn get<T: serde::de::DeserializeOwned + Send>(&self, key: &str) -> Option<T> {
        let raw = self.get_raw(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                error!(key = %key, error = %e, "stored payload failed to decode");
                None
            }
        }
    }
}

// Blanket implementation for all Cache implementations
impl<T: Cache + ?Sized> CacheExt for T {}

/// Redis-backed cache client.
///
/// Owns exactly one shared connection handle, created at most once and
/// guarded by a one-shot initializer: concurrent first users trigger a single
/// establishment sequence, and the warm path is a lock-free read.
pub struct RedisCache {
    addr: String,
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
    default_ttl_secs: u64,
    blocking_timeout_secs: u64,
    retry: RetryConfig,
    update_script: Script,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("addr", &self.addr)
            .field("default_ttl_secs", &self.default_ttl_secs)
            .field("blocking_timeout_secs", &self.blocking_timeout_secs)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Connects to Redis and probes it once.
    ///
    /// Fails fast: an unreachable server at construction is returned as an
    /// error immediately, without entering the retry loop.
    pub async fn connect(config: CacheConfig) -> CacheResult<Self> {
        let cache = Self::connect_lazy(config)?;
        let conn = cache.probe().await?;
        debug!(addr = %cache.addr, "connected to redis");
        // The cell is still empty here, the set cannot fail.
        cache.conn.set(conn).ok();
        Ok(cache)
    }

    /// Builds a client without touching the network.
    ///
    /// The connection is established on first use, under the configured retry
    /// policy.
    pub fn connect_lazy(config: CacheConfig) -> CacheResult<Self> {
        config.validate()?;

        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
            redis: RedisConnectionInfo {
                db: config.db,
                password: config.password.clone(),
                ..Default::default()
            },
        };
        let client = redis::Client::open(info)?;

        Ok(Self {
            addr: config.addr(),
            client,
            conn: OnceCell::new(),
            default_ttl_secs: config.default_ttl_secs,
            blocking_timeout_secs: config.blocking_timeout_secs,
            retry: config.retry,
            update_script: script::update_preserving_ttl(),
        })
    }

    /// Returns the shared connection handle, establishing it on first use.
    ///
    /// At most one establishment sequence runs even under concurrent first
    /// callers; everyone else waits for its outcome.
    pub async fn connection(&self) -> CacheResult<ConnectionManager> {
        let conn = self.conn.get_or_try_init(|| self.establish()).await?;
        Ok(conn.clone())
    }

    /// Returns the configured timeout for blocking operations.
    pub fn blocking_timeout(&self) -> Duration {
        Duration::from_secs(self.blocking_timeout_secs)
    }

    /// Single connection attempt: connect, then one PING.
    async fn probe(&self) -> CacheResult<ConnectionManager> {
        let mut conn = ConnectionManager::new(self.client.clone()).await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(conn)
    }

    /// Connection establishment loop for the lazy path.
    ///
    /// Retries with a fixed delay until the server answers a PING. Unbounded
    /// unless `retry.max_attempts` is set, in which case exhaustion surfaces
    /// as [`CacheError::RetriesExhausted`].
    async fn establish(&self) -> CacheResult<ConnectionManager> {
        let mut attempt = 1u32;
        loop {
            match self.probe().await {
                Ok(conn) => {
                    debug!(addr = %self.addr, attempt, "redis connection established");
                    return Ok(conn);
                }
                Err(e) => {
                    error!(error = %e, addr = %self.addr, attempt, "redis connection failed");
                    if let Some(max) = self.retry.max_attempts {
                        if attempt >= max {
                            return Err(CacheError::RetriesExhausted { attempts: attempt });
                        }
                    }
                    attempt += 1;
                    tokio::time::sleep(self.retry.delay()).await;
                }
            }
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn store_raw(&self, key: &str, value: &str, ttl: Option<u64>) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        let ttl_secs = resolve_ttl(ttl, self.default_ttl_secs);

        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;

        debug!(key = %key, ttl_secs, "stored key");
        Ok(())
    }

    async fn store_bytes(&self, key: &str, value: &[u8], ttl: Option<u64>) -> CacheResult<()> {
        if !is_well_formed_json(value) {
            error!(key = %key, "rejected byte payload that is not well-formed JSON");
            return Err(CacheError::InvalidPayload(format!(
                "byte payload for key '{key}' is not well-formed JSON"
            )));
        }

        let mut conn = self.connection().await?;
        let ttl_secs = resolve_ttl(ttl, self.default_ttl_secs);

        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;

        debug!(key = %key, ttl_secs, "stored key");
        Ok(())
    }

    async fn contains_key(&self, key: &str) -> bool {
        let mut conn = match self.connection().await {
            Ok(conn) => conn,
            Err(e) => {
                error!(error = %e, key = %key, "contains_key: connection unavailable");
                return false;
            }
        };

        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(_)) => true,
            Ok(None) => {
                warn!(key = %key, "key does not exist");
                false
            }
            Err(e) => {
                error!(error = %e, key = %key, "contains_key failed");
                false
            }
        }
    }

    async fn get_raw(&self, key: &str) -> Option<String> {
        let mut conn = match self.connection().await {
            Ok(conn) => conn,
            Err(e) => {
                error!(error = %e, key = %key, "get_raw: connection unavailable");
                return None;
            }
        };

        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(value)) => {
                debug!(key = %key, "cache hit");
                Some(value)
            }
            Ok(None) => {
                debug!(key = %key, "cache miss");
                None
            }
            Err(e) => {
                error!(error = %e, key = %key, "get_raw failed");
                None
            }
        }
    }

    async fn delete(&self, keys: &[&str]) -> u64 {
        if keys.is_empty() {
            return 0;
        }

        let mut conn = match self.connection().await {
            Ok(conn) => conn,
            Err(e) => {
                error!(error = %e, "delete: connection unavailable");
                return 0;
            }
        };

        match conn.del::<_, i64>(keys).await {
            Ok(removed) => {
                debug!(count = removed, "deleted keys");
                removed as u64
            }
            Err(e) => {
                error!(error = %e, "delete failed");
                0
            }
        }
    }

    async fn update_preserving_ttl(&self, key: &str, new_value: &str) -> CacheResult<()> {
        let mut conn = self.connection().await?;

        // OK when the key was rewritten, nil when it was absent or had no
        // TTL; both are success.
        let _: redis::Value = self
            .update_script
            .key(key)
            .arg(new_value)
            .invoke_async(&mut conn)
            .await?;

        debug!(key = %key, "updated key preserving ttl");
        Ok(())
    }
}

/// Only the explicitly requested TTL overrides the configured default.
fn resolve_ttl(requested: Option<u64>, default_secs: u64) -> u64 {
    requested.unwrap_or(default_secs)
}

fn is_well_formed_json(bytes: &[u8]) -> bool {
    serde_json::from_slice::<serde::de::IgnoredAny>(bytes).is_ok()
}
