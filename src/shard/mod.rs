//! Shard Routing Module
//!
//! Maps file keys onto the fixed set of backend file-server shards and talks to
//! them over HTTP.
//!
//! ## Core Concepts
//! - **Resolution**: `ShardResolver` hashes a key (FNV-1a) onto one of N shards, numbered from 1.
//! - **Addressing**: each shard's base URL comes from a template fixed at start-up.
//! - **Access**: `ShardBackend` is the PUT/GET/DELETE seam; `HttpShardBackend` is the reqwest implementation.

pub mod backend;
pub mod resolver;
