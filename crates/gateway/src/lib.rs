//! HTTP API gateway for Tooloop.
//!
//! Exposes the agent as `POST /api/agent`, plus a health check, the tool
//! catalog, and an SSE feed of run lifecycle events.
//!
//! Built on Axum.

use axum::extract::DefaultBodyLimit;
use axum::extract::rejection::JsonRejection;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    response::sse::{Event as SseEvent, Sse},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use tooloop_agent::{APOLOGY, AgentService};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub service: Arc<AgentService>,
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - Request body size limit (64 KB)
/// - CORS for browser clients (GET and POST, JSON bodies)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/agent", post(agent_handler))
        .route("/api/tools", get(tools_handler))
        .route("/api/events", get(events_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: tooloop_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let service = Arc::new(AgentService::from_config(&config)?);
    let app = build_router(Arc::new(GatewayState { service }));

    info!(addr = %addr, model = %config.model.model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    provider: String,
    model: String,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let gateway = state.service.gateway();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        provider: gateway.provider_name().to_string(),
        model: gateway.model().to_string(),
    })
}

#[derive(Deserialize)]
struct AgentRequest {
    message: String,
}

#[derive(Serialize)]
struct AgentResponse {
    response: String,
}

/// `POST /api/agent`: one message in, one answer out.
///
/// Malformed or empty bodies get 400 with the generic failure string.
async fn agent_handler(
    State(state): State<SharedState>,
    payload: Result<Json<AgentRequest>, JsonRejection>,
) -> (StatusCode, Json<AgentResponse>) {
    let message = match payload {
        Ok(Json(request)) if !request.message.trim().is_empty() => request.message,
        Ok(_) => {
            warn!("Rejected empty agent message");
            return bad_request();
        }
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected agent request body");
            return bad_request();
        }
    };

    info!(message_len = message.len(), "Agent message received");
    let response = state.service.submit(&message).await;
    (StatusCode::OK, Json(AgentResponse { response }))
}

fn bad_request() -> (StatusCode, Json<AgentResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(AgentResponse {
            response: APOLOGY.to_string(),
        }),
    )
}

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolDto>,
    count: usize,
}

#[derive(Serialize)]
struct ToolDto {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// `GET /api/tools`: the catalog in registration order.
async fn tools_handler(State(state): State<SharedState>) -> Json<ToolListResponse> {
    let tools: Vec<ToolDto> = state
        .service
        .tools()
        .definitions()
        .into_iter()
        .map(|d| ToolDto {
            name: d.name,
            description: d.description,
            parameters: d.parameters,
        })
        .collect();

    Json(ToolListResponse {
        count: tools.len(),
        tools,
    })
}

/// `GET /api/events`: SSE stream of run lifecycle events.
///
/// Subscribers that fall behind skip the events they missed.
async fn events_handler(
    State(state): State<SharedState>,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.service.events().subscribe();
    let stream = tokio_stream::wrappers::BroadcastStream::new(rx)
        .filter_map(|result| result.ok())
        .map(|event| {
            let data = serde_json::to_string(event.as_ref()).unwrap_or_default();
            Ok(SseEvent::default().event(event.event_type()).data(data))
        });

    Sse::new(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::Mutex;
    use tooloop_agent::{AgentLoop, ModelGateway};
    use tooloop_core::error::ProviderError;
    use tooloop_core::event::{EventBus, EventSink, TerminationReason};
    use tooloop_core::provider::{ModelReply, Provider, ProviderRequest, ProviderResponse};
    use tooloop_core::tool::ToolRegistry;
    use tooloop_memory::MemoryStore;
    use tower::ServiceExt;

    /// Answers every call with the same text.
    struct FixedProvider {
        answer: String,
        calls: Mutex<usize>,
    }

    #[async_trait::async_trait]
    impl Provider for FixedProvider {
        fn name(&self) -> &str {
            "fixed_mock"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            Ok(ProviderResponse {
                reply: ModelReply::Text(self.answer.clone()),
                usage: None,
                model: "mock".into(),
            })
        }
    }

    fn test_state(answer: &str) -> (SharedState, Arc<FixedProvider>) {
        let provider = Arc::new(FixedProvider {
            answer: answer.into(),
            calls: Mutex::new(0),
        });
        let mut registry = ToolRegistry::new();
        registry
            .register_tool(tooloop_tools::CalculatorTool)
            .unwrap();
        registry
            .register_tool(tooloop_tools::CurrentTimeTool::ist())
            .unwrap();
        let agent = AgentLoop::new(
            ModelGateway::new(provider.clone(), "mock"),
            Arc::new(registry),
        );
        let events = Arc::new(EventBus::default());
        let service = AgentService::new(
            agent,
            events.clone(),
            events,
            Arc::new(MemoryStore::new()),
        );
        (
            Arc::new(GatewayState {
                service: Arc::new(service),
            }),
            provider,
        )
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_agent(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/agent")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (state, _) = test_state("hi");
        let app = build_router(state);

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["model"], "mock");
    }

    #[tokio::test]
    async fn agent_endpoint_answers() {
        let (state, provider) = test_state("Why did the chicken cross the road?");
        let app = build_router(state);

        let response = app
            .oneshot(post_agent(r#"{"message": "Tell me a joke"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["response"], "Why did the chicken cross the road?");
        assert_eq!(*provider.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let (state, provider) = test_state("unused");
        let app = build_router(state);

        let response = app.oneshot(post_agent("not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["response"], APOLOGY);
        assert_eq!(*provider.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_message_is_bad_request() {
        let (state, provider) = test_state("unused");
        let app = build_router(state);

        let response = app
            .oneshot(post_agent(r#"{"message": "   "}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["response"], APOLOGY);
        assert_eq!(*provider.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn tools_endpoint_lists_in_order() {
        let (state, _) = test_state("unused");
        let app = build_router(state);

        let req = Request::builder()
            .uri("/api/tools")
            .body(Body::empty())
            .unwrap();
        let json = body_json(app.oneshot(req).await.unwrap()).await;

        assert_eq!(json["count"], 2);
        assert_eq!(json["tools"][0]["name"], "calculator");
        assert_eq!(json["tools"][1]["name"], "current_time");
        assert_eq!(json["tools"][0]["parameters"]["type"], "object");
    }

    #[tokio::test]
    async fn events_endpoint_streams_lifecycle() {
        let (state, _) = test_state("unused");
        let events = state.service.events();
        let app = build_router(state);

        let req = Request::builder()
            .uri("/api/events")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/event-stream"
        );

        events.run_terminated("run-1", TerminationReason::Completed, 0);

        let mut body = response.into_body();
        let frame = body.frame().await.unwrap().unwrap();
        let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
        assert!(text.contains("event: run_terminated"));
        assert!(text.contains(r#""run_id":"run-1""#));
    }
}
