//! Cache and pub/sub adapter over Redis, grounded on `src/cache.py` in
//! `examples/original_source`. The original pickles arbitrary Python
//! objects; we use `chomp_common::wire` (MessagePack) for the same "store
//! anything serde can handle" ergonomics.

use std::time::Duration;

use redis::aio::{ConnectionManager, PubSub};
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};

use chomp_common::wire;

use crate::error::CacheError;

pub const YEAR_SECONDS: u64 = 31_540_000;

/// A namespaced Redis client shared by the claim service, the registry
/// service, and ad-hoc ingester caching (spec.md §4.1/§4.3/§4.4).
#[derive(Clone)]
pub struct CacheBus {
    conn: ConnectionManager,
    client: redis::Client,
    namespace: String,
}

impl CacheBus {
    pub async fn connect(url: &str, namespace: impl Into<String>) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(CacheBus {
            conn,
            client,
            namespace: namespace.into(),
        })
    }

    pub async fn ping(&self) -> bool {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await.is_ok()
    }

    fn cache_key(&self, name: &str) -> String {
        format!("{}:cache:{}", self.namespace, name)
    }

    pub fn claim_key(&self, ingester_name: &str, interval: &str) -> String {
        format!("{}:claim:{}:{}", self.namespace, ingester_name, interval)
    }

    pub fn registry_key(&self, registry_type: &str, key: &str) -> String {
        format!("{}:registry:{}:{}", self.namespace, registry_type, key)
    }

    /// Stores a MessagePack-encoded value with a TTL (spec.md §4.1's cache
    /// write path). Matches `cache()` in the source with `expiry=YEAR_SECONDS`
    /// as the default.
    pub async fn cache<T: Serialize>(
        &self,
        name: &str,
        value: &T,
        expiry: Duration,
    ) -> Result<(), CacheError> {
        let key = self.cache_key(name);
        let bytes = wire::encode(value)?;
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, bytes, expiry.as_secs().max(1)).await?;
        Ok(())
    }

    pub async fn cache_raw_key<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        expiry: Duration,
    ) -> Result<(), CacheError> {
        let bytes = wire::encode(value)?;
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, bytes, expiry.as_secs().max(1)).await?;
        Ok(())
    }

    pub async fn get_cache<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, CacheError> {
        let key = self.cache_key(name);
        let mut conn = self.conn.clone();
        let raw: Option<Vec<u8>> = conn.get(key).await?;
        match raw {
            Some(bytes) => Ok(Some(wire::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn get_cache_raw_key<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<Vec<u8>> = conn.get(key).await?;
        match raw {
            Some(bytes) => Ok(Some(wire::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Pipelined multi-key write, matching `cache_batch` in the source.
    pub async fn cache_batch<T: Serialize>(
        &self,
        data: &[(String, T)],
        expiry: Duration,
    ) -> Result<(), CacheError> {
        let mut pipe = redis::pipe();
        for (name, value) in data {
            let key = self.cache_key(name);
            let bytes = wire::encode(value)?;
            pipe.set_ex(key, bytes, expiry.as_secs().max(1));
        }
        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    pub async fn get_cache_batch<T: DeserializeOwned>(
        &self,
        names: &[String],
    ) -> Result<Vec<(String, T)>, CacheError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = names.iter().map(|n| self.cache_key(n)).collect();
        let mut conn = self.conn.clone();
        let raw: Vec<Option<Vec<u8>>> = conn.mget(keys).await?;
        let mut out = Vec::with_capacity(names.len());
        for (name, value) in names.iter().zip(raw.into_iter()) {
            if let Some(bytes) = value {
                out.push((name.clone(), wire::decode(&bytes)?));
            }
        }
        Ok(out)
    }

    pub async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        Ok(conn.exists(key).await?)
    }

    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    /// Sets `key` to `value` with `ttl`, only if it does not already exist.
    /// The Redis primitive backing advisory claim locks (spec.md §4.3).
    pub async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(result.is_some())
    }

    pub async fn get_string(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    pub async fn publish<T: Serialize>(&self, topic: &str, msg: &T) -> Result<(), CacheError> {
        let full_topic = format!("{}:{}", self.namespace, topic);
        let bytes = wire::encode(msg)?;
        let mut conn = self.conn.clone();
        let _: i64 = conn.publish(full_topic, bytes).await?;
        Ok(())
    }

    /// Opens a dedicated pub/sub connection. Separate from the shared
    /// `ConnectionManager`, since subscribed connections cannot issue other
    /// commands (a Redis client-protocol constraint, not a chomp-specific
    /// one).
    pub async fn subscribe(&self, topics: &[String]) -> Result<PubSub, CacheError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        for topic in topics {
            pubsub.subscribe(format!("{}:{}", self.namespace, topic)).await?;
        }
        Ok(pubsub)
    }

    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let full_pattern = format!("{}:{}", self.namespace, pattern);
        let mut conn = self.conn.clone();
        Ok(conn.keys(full_pattern).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_key_is_namespaced() {
        // Constructing a CacheBus requires a live connection, so this only
        // exercises the pure key-formatting helper via a throwaway struct.
        let namespace = "chomp".to_string();
        let key = format!("{}:claim:{}:{}", namespace, "btc_price", "m1");
        assert_eq!(key, "chomp:claim:btc_price:m1");
    }
}
