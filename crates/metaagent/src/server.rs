//! HTTP ingress
//!
//! `POST /query` runs one query through the agent; `GET /health` is a
//! liveness probe. Requests are served one at a time against a single agent
//! so history and tool inventory stay consistent.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use metaagent_agent::{FeedbackController, StatsReport};
use metaagent_provider::Provider;

pub struct AppState<P: Provider> {
    agent: Mutex<FeedbackController<P>>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
    pub stats: StatsReport,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

pub fn build_router<P: Provider + 'static>(agent: FeedbackController<P>) -> Router {
    let state = Arc::new(AppState {
        agent: Mutex::new(agent),
    });

    Router::new()
        .route("/query", post(query_handler::<P>))
        .route("/health", get(health_handler))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn query_handler<P: Provider + 'static>(
    State(state): State<Arc<AppState<P>>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    let query = match payload {
        Ok(Json(request)) => request.query,
        Err(rejection) => {
            warn!("◆ REJECTED QUERY BODY: {}", rejection);
            return error_response(StatusCode::BAD_REQUEST, "No query provided");
        }
    };

    if query.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No query provided");
    }

    info!("◆ INGRESS QUERY ({} CHARS)", query.len());

    let mut agent = state.agent.lock().await;
    match agent.run(&query).await {
        Ok(output) => Json(QueryResponse {
            response: output.answer,
            stats: output.stats.report(),
        })
        .into_response(),
        Err(e) => {
            error!("◆ QUERY FAILED: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use metaagent_agent::executor::LocalExecutor;
    use metaagent_agent::AgentSettings;
    use metaagent_provider::{ChatParams, ChatResponse, ProviderError};
    use tower::ServiceExt;

    /// Answers every request with the same text, or fails
    struct StubProvider {
        reply: Option<String>,
    }

    #[async_trait]
    impl Provider for StubProvider {
        async fn chat(&self, params: ChatParams) -> metaagent_provider::Result<ChatResponse> {
            match &self.reply {
                Some(text) => Ok(ChatResponse::text(params.model, text.clone())),
                None => Err(ProviderError::Api {
                    status: 503,
                    message: "upstream down".to_string(),
                }),
            }
        }

        fn default_model(&self) -> String {
            "stub-model".to_string()
        }

        fn is_configured(&self) -> bool {
            true
        }
    }

    fn app(reply: Option<&str>) -> Router {
        let settings = AgentSettings {
            model: "stub-model".to_string(),
            summary_model: "stub-summary".to_string(),
            max_depth: 2,
            max_history_items: 0,
            max_tokens: 256,
            temperature: 0.0,
        };
        let agent = FeedbackController::new(
            StubProvider {
                reply: reply.map(String::from),
            },
            Arc::new(LocalExecutor::default()),
            settings,
        );
        build_router(agent)
    }

    fn post_query(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/query")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app(Some("x")).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_query_returns_answer_and_stats() {
        let response = app(Some("<FEEDBACK_COMPLETE> 42"))
            .oneshot(post_query(r#"{"query": "meaning of life?"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["response"], "42");
        assert_eq!(json["stats"]["calls"], 1);
        assert_eq!(json["stats"]["models_used"], serde_json::json!(["stub-model"]));
        assert!(json["stats"]["total_latency"].is_number());
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let response = app(Some("x"))
            .oneshot(post_query(r#"{"query": "   "}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "No query provided");
    }

    #[tokio::test]
    async fn test_missing_query_is_rejected() {
        let response = app(Some("x")).oneshot(post_query("{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app(Some("x"))
            .oneshot(post_query("not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_backend_failure_is_500() {
        let response = app(None)
            .oneshot(post_query(r#"{"query": "hi"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("upstream down"));
    }
}
