//! Process Configuration
//!
//! All settings come from environment variables, read once at start-up by
//! `main` and handed to the components that need them.

use crate::coordinator::types::TimingPolicy;

use anyhow::{Result, bail};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_FILE_SERVER_URL: &str = "http://localhost:#/api/fileserver";
pub const DEFAULT_SHARD_COUNT: u32 = 5;

/// `REDIS_URL` value that selects the in-process cache.
pub const MEMORY_CACHE: &str = "memory";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub redis_url: String,
    pub file_server_url: String,
    pub shard_count: u32,
    pub write_policy: TimingPolicy,
    pub delete_policy: TimingPolicy,
    pub read_backfill: bool,
    pub remote_timeout: Duration,
    pub shutdown_grace: Duration,
    pub log_level: tracing::Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            file_server_url: DEFAULT_FILE_SERVER_URL.to_string(),
            shard_count: DEFAULT_SHARD_COUNT,
            write_policy: TimingPolicy::WriteBehind,
            delete_policy: TimingPolicy::WriteBehind,
            read_backfill: false,
            remote_timeout: Duration::from_millis(5_000),
            shutdown_grace: Duration::from_millis(10_000),
            log_level: tracing::Level::INFO,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source. Unset or blank
    /// variables fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Config::default();

        if let Some(port) = get("PORT") {
            config.port = port
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid PORT '{}': {}", port, e))?;
        }
        if let Some(url) = get("REDIS_URL") {
            config.redis_url = normalize_redis_url(&url);
        }
        if let Some(url) = get("FILE_SERVER_URL") {
            config.file_server_url = url.trim_end_matches('/').to_string();
        }
        if let Some(count) = get("SHARD_COUNT") {
            config.shard_count = count
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid SHARD_COUNT '{}': {}", count, e))?;
        }
        if let Some(policy) = get("WRITE_POLICY") {
            config.write_policy = policy.parse()?;
        }
        if let Some(policy) = get("DELETE_POLICY") {
            config.delete_policy = policy.parse()?;
        }
        if let Some(flag) = get("READ_BACKFILL") {
            config.read_backfill = parse_bool("READ_BACKFILL", &flag)?;
        }
        if let Some(ms) = get("REMOTE_TIMEOUT_MS") {
            config.remote_timeout = parse_millis("REMOTE_TIMEOUT_MS", &ms)?;
        }
        if let Some(ms) = get("SHUTDOWN_GRACE_MS") {
            config.shutdown_grace = parse_millis("SHUTDOWN_GRACE_MS", &ms)?;
        }
        if let Some(level) = get("LOG_LEVEL") {
            config.log_level = level
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid LOG_LEVEL '{}'", level))?;
        }

        if config.shard_count == 0 {
            bail!("SHARD_COUNT must be at least 1");
        }
        if config.remote_timeout.is_zero() {
            bail!("REMOTE_TIMEOUT_MS must be greater than 0");
        }

        Ok(config)
    }

    pub fn uses_memory_cache(&self) -> bool {
        self.redis_url == MEMORY_CACHE
    }
}

/// Accepts the bare `host:port` form as well as a full `redis://` URL.
fn normalize_redis_url(raw: &str) -> String {
    if raw == MEMORY_CACHE || raw.contains("://") {
        raw.to_string()
    } else {
        format!("redis://{}", raw)
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("invalid {} '{}': expected true or false", name, raw),
    }
}

fn parse_millis(name: &str, raw: &str) -> Result<Duration> {
    let ms: u64 = raw
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid {} '{}': {}", name, raw, e))?;
    Ok(Duration::from_millis(ms))
}
