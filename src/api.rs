//! REST API server for the hybrid 10-K query pipeline
//!
//! Exposes the orchestrator and its single-path components via HTTP.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::agent::Orchestrator;
use crate::config::Config;
use crate::error::OrchestrationError;
use crate::models::{Classification, HybridResponse, SubquestionResult};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QueryInput {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub query: String,
    pub classification: Classification,
}

/// =============================
/// Error Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub timestamp: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.message,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
}

/// Unwrap the body and reject blank queries. The query is passed on as sent.
fn require_query(payload: Result<Json<QueryInput>, JsonRejection>) -> Result<String, ApiError> {
    let Json(input) = payload?;

    if input.query.trim().is_empty() {
        return Err(ApiError::bad_request("Query cannot be empty"));
    }
    Ok(input.query)
}

/// =============================
/// Health Endpoints
/// =============================

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Welcome to the SEC-RAG-API" }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Hybrid Query Endpoint
/// =============================

async fn hybrid_query(
    State(state): State<ApiState>,
    payload: Result<Json<QueryInput>, JsonRejection>,
) -> Result<Json<HybridResponse>, ApiError> {
    let query = require_query(payload)?;
    let span = info_span!("hybrid_query", request_id = %Uuid::new_v4());

    async move {
        info!(query = %query, "Received hybrid query");

        state.orchestrator.run(&query).await.map(Json).map_err(|e| {
            error!(error = %e, "Hybrid query failed");
            ApiError::internal(format!("Subquestion splitting failed: {}", e))
        })
    }
    .instrument(span)
    .await
}

/// =============================
/// Single-Path Endpoints
/// =============================

async fn classify(
    State(state): State<ApiState>,
    payload: Result<Json<QueryInput>, JsonRejection>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let query = require_query(payload)?;

    let classification = state
        .orchestrator
        .classifier()
        .classify(&query)
        .await
        .map_err(|e: OrchestrationError| {
            error!(error = %e, "Classification request failed");
            ApiError::internal(e.to_string())
        })?;

    Ok(Json(ClassifyResponse {
        query,
        classification,
    }))
}

async fn quantitative(
    State(state): State<ApiState>,
    payload: Result<Json<QueryInput>, JsonRejection>,
) -> Result<Json<SubquestionResult>, ApiError> {
    let query = require_query(payload)?;
    Ok(Json(state.orchestrator.resolver().answer_quantitative(&query).await))
}

async fn qualitative(
    State(state): State<ApiState>,
    payload: Result<Json<QueryInput>, JsonRejection>,
) -> Result<Json<SubquestionResult>, ApiError> {
    let query = require_query(payload)?;
    Ok(Json(state.orchestrator.retriever().answer_qualitative(&query).await))
}

/// =============================
/// Router
/// =============================

/// Single allowed origin, any method and header. No credentials: tower-http
/// rejects credentials combined with wildcard headers.
pub fn cors_layer(allowed_origin: &str) -> crate::Result<CorsLayer> {
    let origin = HeaderValue::from_str(allowed_origin).map_err(|e| {
        OrchestrationError::ConfigError(format!(
            "Invalid CORS origin {:?}: {}",
            allowed_origin, e
        ))
    })?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

pub fn create_router(orchestrator: Arc<Orchestrator>, cors: CorsLayer) -> Router {
    let state = ApiState { orchestrator };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/hybrid-query", post(hybrid_query))
        .route("/api/classify", post(classify))
        .route("/api/quantitative", post(quantitative))
        .route("/api/qualitative", post(qualitative))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(orchestrator: Arc<Orchestrator>, config: &Config) -> crate::Result<()> {
    let router = create_router(orchestrator, cors_layer(&config.allowed_origin)?);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", config.port);
    info!("Local: http://127.0.0.1:{}", config.port);

    axum::serve(listener, router).await?;

    Ok(())
}
