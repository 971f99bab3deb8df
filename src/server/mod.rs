//! HTTP interface.
//!
//! Serves `POST /query` and `GET /health` over axum. Each query runs the
//! full workflow against the shared knowledge store.

mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tracing::info;

use crate::agent::orchestrator::Orchestrator;
use crate::storage::SqliteKnowledgeStore;

pub use routes::{QueryRequest, QueryResponse};

/// Shared state handed to every request handler.
pub struct AppState {
    /// Workflow driver.
    pub orchestrator: Arc<Orchestrator>,
    /// Knowledge store, checked for content before each run.
    pub store: Arc<SqliteKnowledgeStore>,
    /// Step budget applied to every run.
    pub step_budget: usize,
}

impl AppState {
    /// Creates shared state.
    #[must_use]
    pub const fn new(
        orchestrator: Arc<Orchestrator>,
        store: Arc<SqliteKnowledgeStore>,
        step_budget: usize,
    ) -> Self {
        Self {
            orchestrator,
            store,
            step_budget,
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/query", post(routes::query))
        .with_state(Arc::new(state))
}

/// Listens on `host:port` until ctrl-c.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
