use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use carbon_engine::StatsRegistry;

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("bind status listener {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serve: {0}")]
    Serve(#[source] std::io::Error),
}

/// Read-only status routes over a shared [`StatsRegistry`].
pub fn router(stats: Arc<StatsRegistry>) -> Router {
    Router::new()
        .route("/status", get(handle_status))
        .with_state(stats)
}

/// Bind `addr` and serve `GET /status` until the task is dropped.
pub async fn run(addr: &str, stats: Arc<StatsRegistry>) -> Result<(), StatusError> {
    let listener = TcpListener::bind(addr).await.map_err(|source| StatusError::Bind {
        addr: addr.to_owned(),
        source,
    })?;
    tracing::info!("HTTP endpoint accepting requests on http://{addr}/status");
    serve(listener, stats).await
}

/// Serve on an already bound listener.
pub async fn serve(listener: TcpListener, stats: Arc<StatsRegistry>) -> Result<(), StatusError> {
    axum::serve(listener, router(stats))
        .await
        .map_err(StatusError::Serve)
}

// --- REST: GET /status ---

async fn handle_status(State(stats): State<Arc<StatsRegistry>>) -> impl IntoResponse {
    axum::Json(stats.snapshot())
}
