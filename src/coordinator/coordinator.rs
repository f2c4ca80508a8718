//! Request Coordinator
//!
//! Drives a single file operation through the pipeline:
//! validate key -> resolve shard -> take the per-key lock -> cache / backend -> response.
//!
//! ## Lock modes
//! Reads take the key's lock shared; writes and deletes take it exclusive.
//! Guards are scoped values, so the lock is released on every return path.
//!
//! ## Timing policies
//! - `Sync`: the client gets the backend's status and body.
//! - `WriteBehind`: the client gets 201 (PUT) / 200 (DELETE) straight away and a
//!   detached task applies the change, cache first, then backend. Its outcome
//!   is only visible through `write_status`.
//!
//! Every cache and backend call runs under `remote_timeout`.

use super::types::*;
use super::write_behind::WriteBehindTracker;
use crate::cache::CacheStore;
use crate::error::{ProxyError, ProxyResult};
use crate::lock::registry::{KeyedLockRegistry, LockMode};
use crate::shard::backend::ShardBackend;
use crate::shard::resolver::ShardResolver;

use axum::http::StatusCode;
use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;

pub struct RequestCoordinator {
    resolver: ShardResolver,
    locks: Arc<KeyedLockRegistry>,
    cache: Arc<dyn CacheStore>,
    backend: Arc<dyn ShardBackend>,
    write_behind: WriteBehindTracker,
    settings: CoordinatorSettings,
}

impl RequestCoordinator {
    pub fn new(
        resolver: ShardResolver,
        cache: Arc<dyn CacheStore>,
        backend: Arc<dyn ShardBackend>,
        settings: CoordinatorSettings,
    ) -> Arc<Self> {
        tracing::info!(
            "Coordinator ready: {} shards, write={}, delete={}, read_backfill={}, timeout={:?}",
            resolver.shard_count(),
            settings.write_policy,
            settings.delete_policy,
            settings.read_backfill,
            settings.remote_timeout
        );

        Arc::new(Self {
            resolver,
            locks: KeyedLockRegistry::new(),
            cache,
            backend,
            write_behind: WriteBehindTracker::new(),
            settings,
        })
    }

    /// Cache first; on a miss, the owning shard's answer is returned verbatim.
    pub async fn read(&self, key: &str) -> ProxyResult<ProxyResponse> {
        let key = validate_key(key)?;
        let shard = self.resolver.shard_for(key);
        let _guard = self.locks.acquire(key, LockMode::Shared).await;

        match self.bounded("cache GET", self.cache.get(key)).await {
            Ok(Some(payload)) => {
                tracing::debug!("Cache hit for '{}'", key);
                return Ok(ProxyResponse::new(StatusCode::OK, payload));
            }
            Ok(None) => {
                tracing::info!("Cache miss for '{}', asking shard {}", key, shard.index);
            }
            Err(e) => {
                tracing::warn!(
                    "Cache GET failed for '{}', asking shard {}: {}",
                    key,
                    shard.index,
                    e
                );
            }
        }

        let response = self
            .bounded("fileserver GET", self.backend.get(shard, key))
            .await?;

        if self.settings.read_backfill
            && response.is_success()
            && let Err(e) = self
                .bounded("cache SET", self.cache.set(key, response.body.clone()))
                .await
        {
            tracing::warn!("Cache backfill failed for '{}': {}", key, e);
        }

        Ok(response.into())
    }

    pub async fn write(self: &Arc<Self>, key: &str, payload: Bytes) -> ProxyResult<ProxyResponse> {
        let key = validate_key(key)?;

        match self.settings.write_policy {
            TimingPolicy::Sync => self.write_sync(key, payload).await,
            TimingPolicy::WriteBehind => {
                Ok(self.submit_write_behind(key, PendingWrite::Put(payload), StatusCode::CREATED))
            }
        }
    }

    pub async fn delete(self: &Arc<Self>, key: &str) -> ProxyResult<ProxyResponse> {
        let key = validate_key(key)?;

        match self.settings.delete_policy {
            TimingPolicy::Sync => self.delete_sync(key).await,
            TimingPolicy::WriteBehind => {
                Ok(self.submit_write_behind(key, PendingWrite::Delete, StatusCode::OK))
            }
        }
    }

    /// Latest write-behind record for `key`, if any.
    pub fn write_status(&self, key: &str) -> ProxyResult<Option<WriteRecord>> {
        let key = validate_key(key)?;
        Ok(self.write_behind.status(key))
    }

    pub fn locks(&self) -> &Arc<KeyedLockRegistry> {
        &self.locks
    }

    pub fn write_behind(&self) -> &WriteBehindTracker {
        &self.write_behind
    }

    pub fn resolver(&self) -> &ShardResolver {
        &self.resolver
    }

    async fn write_sync(&self, key: &str, payload: Bytes) -> ProxyResult<ProxyResponse> {
        let shard = self.resolver.shard_for(key);
        let _guard = self.locks.acquire(key, LockMode::Exclusive).await;

        let response = self
            .bounded("fileserver PUT", self.backend.put(shard, key, payload.clone()))
            .await?;

        // Keep the cache in step with what the shard accepted.
        let cache_result = if response.is_success() {
            self.bounded("cache SET", self.cache.set(key, payload)).await
        } else {
            tracing::warn!(
                "Shard {} answered {} for PUT '{}'",
                shard.index,
                response.status,
                key
            );
            self.bounded("cache DEL", self.cache.delete(key)).await
        };
        if let Err(e) = cache_result {
            tracing::warn!("Cache update after PUT '{}' failed: {}", key, e);
        }

        Ok(response.into())
    }

    async fn delete_sync(&self, key: &str) -> ProxyResult<ProxyResponse> {
        let shard = self.resolver.shard_for(key);
        let _guard = self.locks.acquire(key, LockMode::Exclusive).await;

        let response = self
            .bounded("fileserver DELETE", self.backend.delete(shard, key))
            .await?;

        if !response.is_success() {
            tracing::warn!(
                "Shard {} answered {} for DELETE '{}'",
                shard.index,
                response.status,
                key
            );
        }
        if let Err(e) = self.bounded("cache DEL", self.cache.delete(key)).await {
            tracing::warn!("Cache invalidation after DELETE '{}' failed: {}", key, e);
        }

        Ok(response.into())
    }

    fn submit_write_behind(
        self: &Arc<Self>,
        key: &str,
        write: PendingWrite,
        ack: StatusCode,
    ) -> ProxyResponse {
        let op_id = self.write_behind.begin(key, write.op());
        let coordinator = Arc::clone(self);
        let key = key.to_string();

        self.write_behind.spawn(async move {
            let outcome = coordinator.apply_write_behind(&key, &op_id, write).await;
            coordinator.write_behind.finish(&key, &op_id, outcome);
        });

        ProxyResponse::empty(ack)
    }

    /// Body of a detached write-behind task. Failures can no longer reach
    /// the client; they are logged and folded into the returned error text.
    ///
    /// An operation that was overtaken by a newer one on the same key while
    /// waiting for the lock is skipped, so the last submitted change wins.
    async fn apply_write_behind(
        &self,
        key: &str,
        op_id: &str,
        write: PendingWrite,
    ) -> Result<(), String> {
        let shard = self.resolver.shard_for(key);
        let _guard = self.locks.acquire(key, LockMode::Exclusive).await;

        if !self.write_behind.is_latest(key, op_id) {
            tracing::debug!("Write-behind {} for '{}' superseded, skipping", op_id, key);
            return Ok(());
        }

        let mut failures = Vec::new();

        let (cache_result, backend_result) = match write {
            PendingWrite::Put(payload) => {
                let cache_result = self
                    .bounded("cache SET", self.cache.set(key, payload.clone()))
                    .await;
                let backend_result = self
                    .bounded("fileserver PUT", self.backend.put(shard, key, payload))
                    .await;
                (cache_result, backend_result)
            }
            PendingWrite::Delete => {
                let cache_result = self.bounded("cache DEL", self.cache.delete(key)).await;
                let backend_result = self
                    .bounded("fileserver DELETE", self.backend.delete(shard, key))
                    .await;
                (cache_result, backend_result)
            }
        };

        if let Err(e) = cache_result {
            tracing::error!("Write-behind cache update for '{}' failed: {}", key, e);
            failures.push(e.to_string());
        }
        match backend_result {
            Ok(response) if response.is_success() => {
                tracing::debug!("Write-behind for '{}' applied on shard {}", key, shard.index);
            }
            Ok(response) => {
                tracing::error!(
                    "Write-behind for '{}': shard {} answered {}",
                    key,
                    shard.index,
                    response.status
                );
                failures.push(format!("shard {} answered {}", shard.index, response.status));
            }
            Err(e) => {
                tracing::error!(
                    "Write-behind for '{}' failed on shard {}: {}",
                    key,
                    shard.index,
                    e
                );
                failures.push(e.to_string());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures.join("; "))
        }
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = ProxyResult<T>>,
    ) -> ProxyResult<T> {
        let timeout = self.settings.remote_timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProxyError::Timeout {
                operation: operation.to_string(),
                after_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

fn validate_key(key: &str) -> ProxyResult<&str> {
    match key {
        "" => Err(ProxyError::EmptyKey),
        // Dot segments would be collapsed into the shard's parent path.
        "." | ".." => Err(ProxyError::InvalidKey(key.to_string())),
        _ => Ok(key),
    }
}
