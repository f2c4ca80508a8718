//! File Server Middleware Library
//!
//! A proxy between clients and a horizontally sharded file store. It decides
//! which shard owns a file, serializes concurrent access to each file and keeps
//! a cache in front of the shards. The binary (`main.rs`) wires these pieces to
//! an HTTP listener.
//!
//! ## Architecture Modules
//! - **`shard`**: key -> shard resolution (FNV-1a, fixed shard count) and the HTTP client for the shards.
//! - **`lock`**: per-file shared/exclusive locks, created on demand and reclaimed when idle.
//! - **`cache`**: the cache store seam, with Redis and in-process implementations.
//! - **`coordinator`**: the read / write / delete pipeline, write-behind tasks and the HTTP handlers.
//! - **`server`**: route table and shutdown signal.
//! - **`config`** / **`error`**: environment configuration and the proxy error type.

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod lock;
pub mod server;
pub mod shard;
