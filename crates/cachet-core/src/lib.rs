//! Cachet Core - shared error types for the cachet caching client.

pub mod error;

pub use error::{CacheError, CacheResult};
