//! Redis-backed cache store.

use super::CacheStore;
use crate::error::{ProxyError, ProxyResult};

use async_trait::async_trait;
use bytes::Bytes;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::future::Future;
use std::time::Duration;

/// Cache store on a Redis server.
///
/// Holds a `ConnectionManager`, which multiplexes one connection and
/// reconnects on failure; cloning it is cheap, so every call works on its own
/// handle. No expiry is set on keys.
pub struct RedisCache {
    connection: ConnectionManager,
    timeout: Duration,
}

impl RedisCache {
    pub async fn connect(url: &str, timeout: Duration) -> ProxyResult<Self> {
        let client = redis::Client::open(url)?;
        let connection = bounded("cache connect", timeout, client.get_connection_manager()).await?;
        tracing::info!("Connected to cache at {}", url);

        Ok(Self {
            connection,
            timeout,
        })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> ProxyResult<Option<Bytes>> {
        let mut conn = self.connection.clone();
        let value: Option<Vec<u8>> = bounded("cache GET", self.timeout, conn.get(key)).await?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, payload: Bytes) -> ProxyResult<()> {
        let mut conn = self.connection.clone();
        bounded::<()>("cache SET", self.timeout, conn.set(key, payload.as_ref())).await
    }

    async fn delete(&self, key: &str) -> ProxyResult<()> {
        let mut conn = self.connection.clone();
        bounded::<()>("cache DEL", self.timeout, conn.del(key)).await
    }
}

/// Runs a redis future under a deadline, folding both failure kinds into `ProxyError`.
async fn bounded<T>(
    operation: &str,
    timeout: Duration,
    fut: impl Future<Output = redis::RedisResult<T>>,
) -> ProxyResult<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(ProxyError::from),
        Err(_) => Err(ProxyError::Timeout {
            operation: operation.to_string(),
            after_ms: timeout.as_millis() as u64,
        }),
    }
}
