use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::shard::backend::BackendResponse;

/// When a write or delete is acknowledged to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingPolicy {
    /// Answer with the backend's own status once it has applied the change.
    Sync,
    /// Acknowledge immediately and apply the change in a detached task.
    WriteBehind,
}

impl FromStr for TimingPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sync" | "synchronous" => Ok(TimingPolicy::Sync),
            "async" | "write-behind" | "write_behind" => Ok(TimingPolicy::WriteBehind),
            other => Err(anyhow::anyhow!(
                "unknown timing policy '{}': expected sync or async",
                other
            )),
        }
    }
}

impl fmt::Display for TimingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingPolicy::Sync => write!(f, "sync"),
            TimingPolicy::WriteBehind => write!(f, "async"),
        }
    }
}

/// Tunables of the request pipeline.
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub write_policy: TimingPolicy,
    pub delete_policy: TimingPolicy,
    /// Store backend payloads in the cache after a read miss.
    pub read_backfill: bool,
    /// Deadline for each individual cache or backend call.
    pub remote_timeout: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            write_policy: TimingPolicy::WriteBehind,
            delete_policy: TimingPolicy::WriteBehind,
            read_backfill: false,
            remote_timeout: Duration::from_secs(5),
        }
    }
}

/// A mutation applied by a write-behind task.
#[derive(Debug, Clone)]
pub enum PendingWrite {
    Put(Bytes),
    Delete,
}

impl PendingWrite {
    pub fn op(&self) -> WriteOp {
        match self {
            PendingWrite::Put(_) => WriteOp::Put,
            PendingWrite::Delete => WriteOp::Delete,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WriteOp {
    Put,
    Delete,
}

/// Lifecycle of a write-behind operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum WriteStatus {
    /// Acknowledged to the client, not yet applied.
    Pending,
    /// Cache and backend both accepted the change.
    Applied,
    /// The cache or the backend rejected or never received the change.
    Failed { error: String },
}

/// The most recent write-behind operation for a key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteRecord {
    pub op_id: String,
    pub op: WriteOp,
    pub status: WriteStatus,
    /// Timestamp (ms) when the client was acknowledged.
    pub submitted_at: u64,
    /// Timestamp (ms) when the detached task finished.
    pub finished_at: Option<u64>,
}

/// Status and body returned to the client.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ProxyResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, Bytes::new())
    }
}

impl From<BackendResponse> for ProxyResponse {
    fn from(response: BackendResponse) -> Self {
        Self {
            status: response.status,
            body: response.body,
        }
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        (self.status, self.body).into_response()
    }
}

pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
