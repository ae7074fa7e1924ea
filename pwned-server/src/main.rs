use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use pwned_core::{EngineError, MirrorConfig, MirrorEngine};
use pwned_provider::UpstreamClient;

struct AppState {
    engine: MirrorEngine,
}

/// Serves whatever mirror already exists under `RESOURCE_DIR`; this
/// binary never calls `update()` itself.
#[tokio::main]
async fn main() {
    env_logger::init();

    let resource_dir = std::env::var("RESOURCE_DIR").unwrap_or_else(|_| "./pwned-data".to_owned());
    let config = MirrorConfig::new(resource_dir);
    let engine = MirrorEngine::new(config, Arc::new(UpstreamClient::default())).await;
    let state = Arc::new(AppState { engine });

    let app = Router::new()
        .route("/range/:prefix", get(range_handler))
        .with_state(state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind server address");
    log::info!("pwned-server listening on {addr}");
    axum::serve(listener, app).await.expect("server error");
}

async fn range_handler(
    State(state): State<Arc<AppState>>,
    Path(prefix): Path<String>,
) -> Response {
    match state.engine.get_range(&prefix).await {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => engine_error_response(e),
    }
}

fn engine_error_response(error: EngineError) -> Response {
    let status = match error {
        EngineError::InvalidPrefix(_) => StatusCode::BAD_REQUEST,
        EngineError::NotInitialized | EngineError::Corrupted(_) | EngineError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        EngineError::ProviderUnavailable(_) | EngineError::Cancelled | EngineError::Record(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, error.to_string()).into_response()
}
