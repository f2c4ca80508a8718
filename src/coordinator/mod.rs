//! Request Coordination Module
//!
//! Orchestrates shard resolution, per-key locking, the cache and the backend
//! for each file operation, and exposes the result over HTTP.
//!
//! ## Submodules
//! - **`coordinator`**: the per-operation state machine (read / write / delete).
//! - **`write_behind`**: detached tasks for early-acknowledged writes and their per-key status.
//! - **`types`**: timing policies, write records and the response value.
//! - **`handlers`**: axum handlers mapping HTTP requests onto the coordinator.
//! - **`protocol`**: endpoint paths and JSON bodies.

pub mod coordinator;
pub mod handlers;
pub mod protocol;
pub mod types;
pub mod write_behind;
