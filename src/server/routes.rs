use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use super::AppState;
use crate::agent::orchestrator::RunOutcome;

/// Body of `POST /query`.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// Question to answer.
    pub query: String,
}

/// Successful `POST /query` response.
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    /// Formatted report.
    pub answer: String,
}

type ErrorReply = (StatusCode, Json<Value>);

fn error_reply(status: StatusCode, message: impl Into<String>) -> ErrorReply {
    (status, Json(json!({ "error": message.into() })))
}

// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// POST /query
pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(body): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ErrorReply> {
    let query = body.query.trim();
    if query.is_empty() {
        return Err(error_reply(StatusCode::BAD_REQUEST, "query cannot be empty"));
    }

    match state.store.is_populated() {
        Ok(true) => {}
        Ok(false) => {
            return Err(error_reply(
                StatusCode::SERVICE_UNAVAILABLE,
                "knowledge base is empty; ingest documents first",
            ));
        }
        Err(e) => {
            warn!(error = %e, "knowledge base check failed");
            return Err(error_reply(StatusCode::SERVICE_UNAVAILABLE, e.to_string()));
        }
    }

    let run = state.orchestrator.run(query, state.step_budget).await;
    match run.outcome {
        RunOutcome::Completed { final_report } => {
            info!(steps = run.steps, "query answered");
            Ok(Json(QueryResponse {
                answer: final_report,
            }))
        }
        RunOutcome::Failed { error } => {
            warn!(steps = run.steps, %error, "query failed");
            Err(error_reply(StatusCode::INTERNAL_SERVER_ERROR, error))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::super::{AppState, router};
    use super::*;
    use crate::agent::config::AgentConfig;
    use crate::agent::orchestrator::Orchestrator;
    use crate::agent::prompt::PromptSet;
    use crate::agent::testing::StubProvider;
    use crate::storage::SqliteKnowledgeStore;

    fn app(populated: bool, step_budget: usize) -> axum::Router {
        let store = Arc::new(SqliteKnowledgeStore::in_memory().unwrap_or_else(|_| unreachable!()));
        if populated {
            let _ = store.add_source("notes.md", &["The aurora is caused by solar wind.".to_string()]);
        }
        let config = AgentConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let orchestrator = Orchestrator::with_prompts(
            Arc::new(StubProvider::replying("SUFFICIENCY: YES\nFEEDBACK: fine")),
            Arc::clone(&store) as _,
            &config,
            PromptSet::defaults(),
        );
        router(AppState::new(Arc::new(orchestrator), store, step_budget))
    }

    fn post_query(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/query")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap_or_else(|_| unreachable!())
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default();
        serde_json::from_slice(&bytes).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap_or_else(|_| unreachable!());
        let response = app(false, 10)
            .oneshot(request)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_empty_query_is_bad_request() {
        let response = app(true, 10)
            .oneshot(post_query(r#"{"query":"   "}"#))
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_empty_store_is_unavailable() {
        let response = app(false, 10)
            .oneshot(post_query(r#"{"query":"what is the aurora?"}"#))
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_query_answers() {
        let response = app(true, 200)
            .oneshot(post_query(r#"{"query":"what is the aurora?"}"#))
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(!body["answer"].as_str().unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_budget_is_server_error() {
        let response = app(true, 0)
            .oneshot(post_query(r#"{"query":"what is the aurora?"}"#))
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap_or_default().contains("step budget"));
    }
}
