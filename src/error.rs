//! Proxy Error Types
//!
//! Every failure the request pipeline can surface is a [`ProxyError`]. The
//! variants follow the failure taxonomy of the proxy: bad client input,
//! requests that could not be built, unreachable dependencies and calls that
//! ran past their deadline. A backend that answers with an error status is
//! *not* an error here; that status travels back to the client untouched.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub type ProxyResult<T> = Result<T, ProxyError>;

#[derive(Error, Debug)]
pub enum ProxyError {
    /// The client did not name a file.
    #[error("no file name given")]
    EmptyKey,

    /// The file name cannot be sent to a shard as a single path segment.
    #[error("file name '{0}' cannot be addressed on a shard")]
    InvalidKey(String),

    /// A downstream request could not be constructed.
    #[error("could not create client request: {0}")]
    Request(String),

    /// The backend shard could not be reached or its body could not be read.
    #[error("fileserver error: {0}")]
    Transport(String),

    /// The cache store reported an error.
    #[error("cache error: {0}")]
    Cache(String),

    /// A remote call did not finish within its deadline.
    #[error("{operation} timed out after {after_ms} ms")]
    Timeout { operation: String, after_ms: u64 },
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::EmptyKey | ProxyError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            ProxyError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Request(_) | ProxyError::Transport(_) | ProxyError::Cache(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProxyError::Timeout { .. })
    }
}

impl From<redis::RedisError> for ProxyError {
    fn from(err: redis::RedisError) -> Self {
        ProxyError::Cache(err.to_string())
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_taxonomy() {
        assert_eq!(ProxyError::EmptyKey.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ProxyError::InvalidKey("..".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ProxyError::Request("bad url".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ProxyError::Transport("connection refused".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ProxyError::Timeout {
                operation: "fileserver GET".into(),
                after_ms: 5000
            }
            .status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_empty_key_message() {
        assert_eq!(ProxyError::EmptyKey.to_string(), "no file name given");
    }
}
