//! Server-side script for TTL-preserving updates.

use redis::Script;

/// Rewrites a key's value while keeping its remaining TTL.
///
/// The TTL read and the conditional SETEX run as one atomic evaluation on the
/// server, so the TTL cannot expire or change between the read and the write.
/// Keys that are absent or persistent (no TTL) are left untouched.
pub const UPDATE_PRESERVING_TTL: &str = r"
local ttl = redis.call('ttl', KEYS[1])
if ttl > 0 then
  return redis.call('SETEX', KEYS[1], ttl, ARGV[1])
end";

/// Builds the update script, ready to invoke with one key and one argument.
pub fn update_preserving_ttl() -> Script {
    Script::new(UPDATE_PRESERVING_TTL)
}
