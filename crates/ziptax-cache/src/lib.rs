//! # ziptax-cache — Redis Response Cache
//!
//! Implements the engine's [`ResponseCache`] contract over Redis. Entries
//! are JSON-serialized [`TaxResult`] values under `tax:zip:<zip>` keys with
//! a fixed TTL applied uniformly via `SET ... EX`; expiry is Redis's job,
//! the engine performs no TTL bookkeeping.
//!
//! The connection manager reconnects on its own; every failure — connect,
//! command, or decode — maps into [`CacheError`], which the engine treats as
//! a miss (reads) or logs and discards (writes). A decode failure
//! additionally means the entry is unusable, so it is surfaced the same way
//! and simply overwritten by the next successful resolution.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

use ziptax_core::ZipCode;
use ziptax_engine::{CacheError, ResponseCache, TaxResult};

/// Prefix for all cache keys.
const KEY_PREFIX: &str = "tax:zip:";

/// Redis-backed [`ResponseCache`]. Cheap to clone; the connection manager
/// multiplexes one connection and reconnects transparently.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    ttl: Duration,
}

impl RedisCache {
    /// Connect to Redis. `ttl` is applied uniformly to every entry written.
    pub async fn connect(redis_url: &str, ttl: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)
            .map_err(|err| CacheError::Unavailable(format!("parsing redis url: {err}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|err| CacheError::Unavailable(format!("connecting to redis: {err}")))?;
        Ok(Self { conn, ttl })
    }

    /// Verify the backend answers PING.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|err| CacheError::Unavailable(format!("pinging redis: {err}")))
    }

    fn key_for_zip(zip: &ZipCode) -> String {
        format!("{KEY_PREFIX}{zip}")
    }
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").field("ttl", &self.ttl).finish()
    }
}

#[async_trait]
impl ResponseCache for RedisCache {
    async fn get(&self, zip: &ZipCode) -> Result<Option<TaxResult>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .get(Self::key_for_zip(zip))
            .await
            .map_err(|err| CacheError::Unavailable(format!("redis get: {err}")))?;

        match value {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|err| CacheError::Serialization(format!("decoding cached entry: {err}"))),
            None => Ok(None),
        }
    }

    async fn put(&self, zip: &ZipCode, result: &TaxResult) -> Result<(), CacheError> {
        let json = serde_json::to_string(result)
            .map_err(|err| CacheError::Serialization(format!("encoding cache entry: {err}")))?;

        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(Self::key_for_zip(zip), json, self.ttl.as_secs())
            .await
            .map_err(|err| CacheError::Unavailable(format!("redis set: {err}")))
    }
}
