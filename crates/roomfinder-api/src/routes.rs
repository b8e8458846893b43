//! Router setup with all API routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use roomfinder_core::error::RoomfinderError;

use crate::handlers;
use crate::state::AppState;

/// Largest accepted request body; voice messages arrive base64 encoded.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/conversations/{user_id}",
            get(handlers::get_conversation),
        )
        .route(
            "/conversations/{user_id}/events",
            post(handlers::post_event),
        )
        .route(
            "/conversations/{user_id}/history",
            get(handlers::get_history),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on 127.0.0.1 until `shutdown` is cancelled.
pub async fn start_server(
    port: u16,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), RoomfinderError> {
    let addr = format!("127.0.0.1:{}", port);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RoomfinderError::Api(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!(addr = %addr, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| RoomfinderError::Api(format!("Server error: {}", e)))?;

    tracing::info!("API server stopped");
    Ok(())
}
