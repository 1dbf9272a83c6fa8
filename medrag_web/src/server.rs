use axum::Router;
use axum::routing::get;
use medrag_conversation::SessionOrchestrator;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SessionOrchestrator>,
}

impl AppState {
    #[must_use]
    pub const fn new(orchestrator: Arc<SessionOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index).post(handlers::ask))
        .route("/clear", get(handlers::clear))
        .route("/export", get(handlers::export))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl+C or SIGTERM.
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        () = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
