use super::coordinator::RequestCoordinator;
use super::protocol::{HealthResponse, ROOT_GREETING, WriteStatusResponse};
use super::types::ProxyResponse;
use crate::error::{ProxyError, ProxyResult};

use axum::{
    Json,
    body::Bytes,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

pub async fn handle_root() -> &'static str {
    ROOT_GREETING
}

pub async fn handle_health() -> (StatusCode, Json<HealthResponse>) {
    (StatusCode::OK, Json(HealthResponse { ok: true }))
}

pub async fn handle_put_file(
    Extension(coordinator): Extension<Arc<RequestCoordinator>>,
    Path(file_name): Path<String>,
    body: Bytes,
) -> Response {
    tracing::info!("PUT /api/fileserver/{} ({} bytes)", file_name, body.len());
    respond("PUT", &file_name, coordinator.write(&file_name, body).await)
}

pub async fn handle_get_file(
    Extension(coordinator): Extension<Arc<RequestCoordinator>>,
    Path(file_name): Path<String>,
) -> Response {
    tracing::info!("GET /api/fileserver/{}", file_name);
    respond("GET", &file_name, coordinator.read(&file_name).await)
}

pub async fn handle_delete_file(
    Extension(coordinator): Extension<Arc<RequestCoordinator>>,
    Path(file_name): Path<String>,
) -> Response {
    tracing::info!("DELETE /api/fileserver/{}", file_name);
    respond("DELETE", &file_name, coordinator.delete(&file_name).await)
}

// `/api/fileserver/` with nothing after it: same pipeline, empty key.
pub async fn handle_put_unnamed(
    Extension(coordinator): Extension<Arc<RequestCoordinator>>,
    body: Bytes,
) -> Response {
    respond("PUT", "", coordinator.write("", body).await)
}

pub async fn handle_get_unnamed(
    Extension(coordinator): Extension<Arc<RequestCoordinator>>,
) -> Response {
    respond("GET", "", coordinator.read("").await)
}

pub async fn handle_delete_unnamed(
    Extension(coordinator): Extension<Arc<RequestCoordinator>>,
) -> Response {
    respond("DELETE", "", coordinator.delete("").await)
}

pub async fn handle_write_status(
    Extension(coordinator): Extension<Arc<RequestCoordinator>>,
    Path(file_name): Path<String>,
) -> Response {
    match coordinator.write_status(&file_name) {
        Ok(Some(record)) => (
            StatusCode::OK,
            Json(WriteStatusResponse { file_name, record }),
        )
            .into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "no write recorded for this file").into_response(),
        Err(e) => e.into_response(),
    }
}

fn respond(method: &str, file_name: &str, result: ProxyResult<ProxyResponse>) -> Response {
    match result {
        Ok(response) => response.into_response(),
        Err(e @ (ProxyError::EmptyKey | ProxyError::InvalidKey(_))) => {
            tracing::warn!("{} rejected: {}", method, e);
            e.into_response()
        }
        Err(e) => {
            tracing::error!("{} '{}' failed: {}", method, file_name, e);
            e.into_response()
        }
    }
}
