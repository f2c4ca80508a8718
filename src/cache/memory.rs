//! In-process cache store, selected with `REDIS_URL=memory`.

use super::CacheStore;
use crate::error::ProxyResult;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, Bytes>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> ProxyResult<Option<Bytes>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, payload: Bytes) -> ProxyResult<()> {
        self.entries.insert(key.to_string(), payload);
        Ok(())
    }

    async fn delete(&self, key: &str) -> ProxyResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}
