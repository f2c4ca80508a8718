//! Backend Shard Client
//!
//! Thin PUT/GET/DELETE client for the file-server shards. A shard that answers
//! at all, with whatever status, yields a [`BackendResponse`]; only failures
//! to reach it (or to build the request) are errors.

use super::resolver::ShardAddress;
use crate::error::{ProxyError, ProxyResult};

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use reqwest::{Method, Url};
use std::time::Duration;

/// What a shard answered: its status code and raw body.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl BackendResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[async_trait]
pub trait ShardBackend: Send + Sync {
    async fn put(&self, shard: &ShardAddress, key: &str, payload: Bytes)
    -> ProxyResult<BackendResponse>;

    async fn get(&self, shard: &ShardAddress, key: &str) -> ProxyResult<BackendResponse>;

    async fn delete(&self, shard: &ShardAddress, key: &str) -> ProxyResult<BackendResponse>;
}

pub struct HttpShardBackend {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl HttpShardBackend {
    pub fn new(timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), timeout)
    }

    pub fn with_client(http_client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            http_client,
            timeout,
        }
    }

    /// Appends `key` to the shard URL as one path segment. Characters that
    /// would end or split the segment (`/`, `?`, `#`, `%`) are percent-encoded.
    pub(crate) fn file_url(shard: &ShardAddress, key: &str) -> ProxyResult<Url> {
        if matches!(key, "." | "..") {
            return Err(ProxyError::Request(format!(
                "file name '{}' is a dot segment",
                key
            )));
        }

        let mut url = Url::parse(&shard.url)
            .map_err(|e| ProxyError::Request(format!("invalid url '{}': {}", shard.url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ProxyError::Request(format!("'{}' cannot take a path", shard.url)))?
            .pop_if_empty()
            .push(key);

        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        shard: &ShardAddress,
        key: &str,
        payload: Option<Bytes>,
    ) -> ProxyResult<BackendResponse> {
        let url = Self::file_url(shard, key)?;
        let operation = format!("fileserver {} {}", method, url);

        let mut request = self
            .http_client
            .request(method, url)
            .timeout(self.timeout);
        if let Some(payload) = payload {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "text/plain")
                .body(payload);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.classify(&operation, e))?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .map_err(|e| ProxyError::Transport(format!("{}: {}", operation, e)))?;
        let body = response
            .bytes()
            .await
            .map_err(|e| self.classify(&operation, e))?;

        tracing::debug!("{} -> {} ({} bytes)", operation, status, body.len());

        Ok(BackendResponse { status, body })
    }

    fn classify(&self, operation: &str, err: reqwest::Error) -> ProxyError {
        if err.is_timeout() {
            ProxyError::Timeout {
                operation: operation.to_string(),
                after_ms: self.timeout.as_millis() as u64,
            }
        } else if err.is_builder() {
            ProxyError::Request(format!("{}: {}", operation, err))
        } else {
            ProxyError::Transport(format!("{}: {}", operation, err))
        }
    }
}

#[async_trait]
impl ShardBackend for HttpShardBackend {
    async fn put(
        &self,
        shard: &ShardAddress,
        key: &str,
        payload: Bytes,
    ) -> ProxyResult<BackendResponse> {
        self.send(Method::PUT, shard, key, Some(payload)).await
    }

    async fn get(&self, shard: &ShardAddress, key: &str) -> ProxyResult<BackendResponse> {
        self.send(Method::GET, shard, key, None).await
    }

    async fn delete(&self, shard: &ShardAddress, key: &str) -> ProxyResult<BackendResponse> {
        self.send(Method::DELETE, shard, key, None).await
    }
}
