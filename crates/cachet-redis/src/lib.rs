//! Cachet - a lazily-connected Redis caching client.
//!
//! A thin wrapper over a single shared Redis connection with:
//! - Validated configuration with a chained builder
//! - One-shot lazy connection establishment with a configurable retry policy
//! - Store / exists / get / delete with per-key TTLs
//! - Atomic value updates that preserve the remaining TTL (server-side script)
//! - Typed JSON helpers layered over the raw string surface
//!
//! # Example
//!
//! ```rust,ignore
//! use cachet_redis::{Cache, CacheConfig, CacheExt, RedisCache};
//!
//! let config = CacheConfig::builder()
//!     .host("cache.internal")
//!     .db(2)
//!     .default_ttl_secs(30)
//!     .build()?;
//!
//! let cache = RedisCache::connect(config).await?;
//! cache.store_raw("session:42", "opaque-token", None).await?;
//! assert!(cache.contains_key("session:42").await);
//! ```

pub mod client;
pub mod config;
pub mod script;

pub use cachet_core::{CacheError, CacheResult};
pub use client::{Cache, CacheExt, RedisCache};
pub use config::{CacheConfig, CacheConfigBuilder, RetryConfig};
