use crate::pairing::PairingStats;
use crate::server::{websocket_listener, ConnectionHandler};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::{routing::get, Json, Router};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
struct AppState {
    connection_handler: ConnectionHandler,
    index_path: Arc<PathBuf>,
}

/// `/` entry page, `/ws` socket, `/health` and `/stats`.
pub fn create_router(connection_handler: ConnectionHandler, index_path: PathBuf) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(websocket))
        .route("/health", get(|| async { "OK" }))
        .route("/stats", get(stats))
        .with_state(AppState {
            connection_handler,
            index_path: Arc::new(index_path),
        })
}

async fn index(State(state): State<AppState>) -> Response {
    match tokio::fs::read_to_string(state.index_path.as_ref()).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            warn!(path = ?state.index_path, error = %e, "Index page unavailable");
            (StatusCode::NOT_FOUND, "Not Found").into_response()
        }
    }
}

async fn websocket(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    websocket_listener::handle_websocket(ws, state.connection_handler).await
}

async fn stats(State(state): State<AppState>) -> Json<PairingStats> {
    Json(state.connection_handler.stats().await)
}
