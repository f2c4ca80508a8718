use fileserver_middleware::cache::CacheStore;
use fileserver_middleware::cache::memory::MemoryCache;
use fileserver_middleware::cache::redis_cache::RedisCache;
use fileserver_middleware::config::Config;
use fileserver_middleware::coordinator::coordinator::RequestCoordinator;
use fileserver_middleware::coordinator::types::CoordinatorSettings;
use fileserver_middleware::server::{build_router, shutdown_signal};
use fileserver_middleware::shard::backend::{HttpShardBackend, ShardBackend};
use fileserver_middleware::shard::resolver::ShardResolver;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    // 1. Shards:
    let resolver = ShardResolver::new(&config.file_server_url, config.shard_count);
    for shard in resolver.shards() {
        tracing::info!("Shard {} -> {}", shard.index, shard.url);
    }
    let backend: Arc<dyn ShardBackend> = Arc::new(HttpShardBackend::new(config.remote_timeout));

    // 2. Cache:
    let cache: Arc<dyn CacheStore> = if config.uses_memory_cache() {
        tracing::warn!("Using in-process cache; contents are lost on restart");
        Arc::new(MemoryCache::new())
    } else {
        Arc::new(RedisCache::connect(&config.redis_url, config.remote_timeout).await?)
    };

    // 3. Coordinator:
    let coordinator = RequestCoordinator::new(
        resolver,
        cache,
        backend,
        CoordinatorSettings {
            write_policy: config.write_policy,
            delete_policy: config.delete_policy,
            read_backfill: config.read_backfill,
            remote_timeout: config.remote_timeout,
        },
    );

    // 4. Stats reporter:
    let stats = coordinator.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));

        loop {
            interval.tick().await;
            let pruned = stats.locks().prune_idle();
            if pruned > 0 {
                tracing::debug!("Pruned {} idle key locks", pruned);
            }
            let (pending, applied, failed) = stats.write_behind().status_counts();
            tracing::info!(
                "Stats: {} active key locks, {} write-behind tasks in flight (pending={}, applied={}, failed={})",
                stats.locks().len(),
                stats.write_behind().in_flight(),
                pending,
                applied,
                failed
            );
        }
    });

    // 5. HTTP server:
    let app = build_router(coordinator.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Server listening on {}...", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 6. Let acknowledged writes reach the shards before exiting:
    if !coordinator.write_behind().drain(config.shutdown_grace).await {
        tracing::warn!("Exiting with unfinished write-behind tasks");
    }

    Ok(())
}
