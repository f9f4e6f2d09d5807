//! HTTP routes.
//!
//! - GET  /api/ollama-chat-model/test, /api/ollama-chat-model/response/{prompt}
//! - GET  /api/openai/test, /api/openai/response/{prompt}
//! - GET  /api/ollama-chat-client/test, /api/ollama-chat-client/response/{prompt}
//! - POST /api/ollama-chat-client/recommend
//! - GET/DELETE /api/conversations/{id}
//! - PUT  /api/memory/config
//! - GET  /health, /metrics

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::{ChatBackend, ChatResponse};
use crate::chat::ChatService;
use crate::config::Config;
use crate::error::{BackendError, ChatError};
use crate::memory::{ConversationId, ConversationMemory, MemoryStats, MessageTurn};
use crate::metrics::Metrics;
use crate::prompt::library::movie_recommendation;
use crate::server::error::ApiError;

/// Application state shared across handlers.
pub struct AppState {
    pub ollama: ChatService,
    /// `None` when no OpenAI key is available.
    pub openai: Option<ChatService>,
    pub memory: Arc<ConversationMemory>,
    pub metrics: Metrics,
    pub start_time: Instant,
}

impl AppState {
    /// Wire both chat services to one shared memory store.
    pub fn new(
        config: &Config,
        ollama: Arc<dyn ChatBackend>,
        openai: Option<Arc<dyn ChatBackend>>,
    ) -> anyhow::Result<Self> {
        let memory = Arc::new(ConversationMemory::new(config.memory.clone())?);
        let timeout = config.request_timeout();

        Ok(Self {
            ollama: ChatService::new(ollama, memory.clone(), timeout),
            openai: openai.map(|backend| ChatService::new(backend, memory.clone(), timeout)),
            memory,
            metrics: Metrics::new()?,
            start_time: Instant::now(),
        })
    }
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/ollama-chat-model/test", get(ollama_test))
        .route("/api/ollama-chat-model/response/{prompt}", get(ollama_model_response))
        .route("/api/openai/test", get(openai_test))
        .route("/api/openai/response/{prompt}", get(openai_response))
        .route("/api/ollama-chat-client/test", get(ollama_test))
        .route("/api/ollama-chat-client/response/{prompt}", get(ollama_client_response))
        .route("/api/ollama-chat-client/recommend", post(recommend))
        .route(
            "/api/conversations/{id}",
            get(get_conversation).delete(clear_conversation),
        )
        .route("/api/memory/config", put(configure_memory))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

// ─── Request/Response Types ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ResponseParams {
    /// Attach the prompt to this conversation's memory.
    pub conversation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendParams {
    #[serde(rename = "type")]
    pub kind: String,
    pub year: String,
    pub lang: String,
}

#[derive(Debug, Serialize)]
pub struct ConversationSnapshot {
    pub conversation_id: String,
    pub turns: Vec<MessageTurn>,
}

#[derive(Debug, Deserialize)]
pub struct ConfigureMemoryRequest {
    pub max_window_size: i64,
}

#[derive(Debug, Serialize)]
pub struct BackendInfo {
    pub name: String,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub backends: Vec<BackendInfo>,
    pub memory: MemoryStats,
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn ollama_test() -> &'static str {
    "Ollama API is working!"
}

async fn openai_test() -> &'static str {
    "OpenAI API is working!"
}

async fn ollama_model_response(
    State(state): State<Arc<AppState>>,
    Path(prompt): Path<String>,
) -> Result<String, ApiError> {
    let service = &state.ollama;
    let response = relay(&state, service, prompt.len(), service.call(&prompt)).await?;
    Ok(response.content)
}

async fn openai_response(
    State(state): State<Arc<AppState>>,
    Path(prompt): Path<String>,
) -> Result<String, ApiError> {
    let service = state.openai.as_ref().ok_or_else(|| BackendError::NotConfigured {
        backend: "OpenAI",
        reason: "no API key".to_string(),
    })?;
    let response = relay(&state, service, prompt.len(), service.call(&prompt)).await?;
    Ok(response.content)
}

async fn ollama_client_response(
    State(state): State<Arc<AppState>>,
    Path(prompt): Path<String>,
    Query(params): Query<ResponseParams>,
) -> Result<String, ApiError> {
    let service = &state.ollama;
    let response = match params.conversation_id {
        Some(id) => {
            let conversation = ConversationId::from(id);
            relay(&state, service, prompt.len(), service.converse(&conversation, &prompt)).await?
        }
        None => relay(&state, service, prompt.len(), service.call(&prompt)).await?,
    };
    Ok(response.content)
}

async fn recommend(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecommendParams>,
) -> Result<String, ApiError> {
    let values = HashMap::from([
        ("type", params.kind.as_str()),
        ("year", params.year.as_str()),
        ("lang", params.lang.as_str()),
    ]);
    let template = movie_recommendation();
    let service = &state.ollama;
    let response = relay(
        &state,
        service,
        template.as_str().len(),
        service.call_template(&template, &values),
    )
    .await?;
    Ok(response.content)
}

async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<ConversationSnapshot> {
    let turns = state.memory.snapshot(&ConversationId::from(id.as_str()));
    Json(ConversationSnapshot {
        conversation_id: id,
        turns,
    })
}

async fn clear_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> StatusCode {
    state.memory.clear(&ConversationId::from(id));
    StatusCode::NO_CONTENT
}

async fn configure_memory(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConfigureMemoryRequest>,
) -> Result<Json<MemoryStats>, ApiError> {
    state.memory.configure(req.max_window_size)?;
    info!(max_window_size = req.max_window_size, "Memory window bound updated");
    Ok(Json(state.memory.stats()))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let backends = std::iter::once(&state.ollama)
        .chain(state.openai.as_ref())
        .map(|service| BackendInfo {
            name: service.backend_name().to_string(),
            model: service.model().to_string(),
        })
        .collect();

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        backends,
        memory: state.memory.stats(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .metrics
        .render(&state.memory.stats())
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}

/// Await a chat call, recording its outcome in metrics and logs along with
/// the response metadata (model, rate limits).
async fn relay<F>(
    state: &AppState,
    service: &ChatService,
    prompt_len: usize,
    call: F,
) -> Result<ChatResponse, ApiError>
where
    F: Future<Output = Result<ChatResponse, ChatError>>,
{
    let request_id = Uuid::new_v4();
    let backend = service.backend_name();
    info!(%request_id, backend, prompt_len, "Relaying prompt");

    let started = Instant::now();
    let result = call.await.map_err(ApiError::from);
    let elapsed = started.elapsed();

    match &result {
        Ok(response) => {
            state.metrics.observe(backend, "ok", elapsed);
            let meta = &response.metadata;
            info!(
                %request_id,
                backend,
                model = %meta.model,
                rate_limit = ?meta.rate_limit.requests_limit,
                rate_limit_remaining = ?meta.rate_limit.requests_remaining,
                elapsed_ms = elapsed.as_millis() as u64,
                "Model response received"
            );
        }
        Err(err) => {
            state.metrics.observe(backend, err.outcome(), elapsed);
            warn!(%request_id, backend, error = %err, "Model call failed");
        }
    }

    result
}
