//! HTTP Surface Definitions
//!
//! Client-facing endpoints and the JSON bodies they return. File payloads
//! themselves travel as raw bytes and have no DTO.

use super::types::WriteRecord;
use serde::{Deserialize, Serialize};

// --- API Endpoints ---

pub const ENDPOINT_ROOT: &str = "/";
pub const ENDPOINT_HEALTH: &str = "/health";
/// Prefix for file operations; the file name is the next path segment.
pub const ENDPOINT_FILESERVER: &str = "/api/fileserver";
/// Suffix under a file's path that exposes its write-behind status.
pub const STATUS_SUFFIX: &str = "/status";

pub const ROOT_GREETING: &str = "You've reached my fileserver middleware!\n";

// --- Data Transfer Objects ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// Latest write-behind operation for a file.
#[derive(Debug, Serialize, Deserialize)]
pub struct WriteStatusResponse {
    pub file_name: String,
    #[serde(flatten)]
    pub record: WriteRecord,
}
