//! HTTP listener wiring: the route table and shutdown signal.

use crate::coordinator::coordinator::RequestCoordinator;
use crate::coordinator::handlers::*;
use crate::coordinator::protocol::{
    ENDPOINT_FILESERVER, ENDPOINT_HEALTH, ENDPOINT_ROOT, STATUS_SUFFIX,
};

use axum::{
    Router,
    extract::{DefaultBodyLimit, Extension},
    routing::get,
};
use std::sync::Arc;

/// File payloads are buffered whole and forwarded as-is, so axum's default
/// request body cap is lifted.
pub fn build_router(coordinator: Arc<RequestCoordinator>) -> Router {
    let file_route = format!("{}/:file_name", ENDPOINT_FILESERVER);
    let status_route = format!("{}{}", file_route, STATUS_SUFFIX);
    let unnamed_route = format!("{}/", ENDPOINT_FILESERVER);

    Router::new()
        .route(ENDPOINT_ROOT, get(handle_root))
        .route(ENDPOINT_HEALTH, get(handle_health))
        .route(
            &file_route,
            get(handle_get_file)
                .put(handle_put_file)
                .delete(handle_delete_file),
        )
        .route(&status_route, get(handle_write_status))
        .route(
            &unnamed_route,
            get(handle_get_unnamed)
                .put(handle_put_unnamed)
                .delete(handle_delete_unnamed),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(Extension(coordinator))
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
