//! Cache Store Module
//!
//! Get/set/delete access to the external cache that fronts the file shards.
//! Values are opaque byte payloads keyed by file name.
//!
//! Cache calls never abort the process: every failure comes back as a
//! `ProxyError` and the coordinator decides whether to surface or log it.

pub mod memory;
pub mod redis_cache;

use crate::error::ProxyResult;

use async_trait::async_trait;
use bytes::Bytes;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// `Ok(None)` is a cache miss.
    async fn get(&self, key: &str) -> ProxyResult<Option<Bytes>>;

    async fn set(&self, key: &str, payload: Bytes) -> ProxyResult<()>;

    async fn delete(&self, key: &str) -> ProxyResult<()>;
}
