//! HTTP server exposing the evaluation pipeline

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

use crate::audit::{self, AuditWindow};
use crate::error::ThemisError;
use crate::pipeline::Evaluator;
use crate::storage::EvaluationStore;
use crate::types::{EvaluationRecord, EvaluationReport};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server address
    pub addr: SocketAddr,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 3000).into(),
        }
    }
}

/// API server state
#[derive(Clone)]
struct AppState {
    /// Shared pipeline, the only write path
    evaluator: Arc<Evaluator>,
    /// Log handle for the read-back endpoints
    store: Arc<dyn EvaluationStore>,
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    evaluator: Arc<Evaluator>,
}

impl ApiServer {
    /// Create new API server over a wired pipeline
    pub fn new(config: ApiServerConfig, evaluator: Arc<Evaluator>) -> Self {
        Self { config, evaluator }
    }

    /// Build router
    fn build_router(state: AppState) -> Router {
        Router::new()
            // Evaluation pipeline
            .route("/evaluate", post(evaluate_handler))
            // Log read-back
            .route("/evaluations", get(list_evaluations_handler))
            // Audit views
            .route("/audit/flagged", get(flagged_handler))
            .route("/audit/export", get(export_handler))
            // Health check
            .route("/health", get(health_handler))
            // State
            .with_state(state)
            // Middleware
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Initialize the log, then serve until the process is stopped.
    pub async fn serve(self) -> anyhow::Result<()> {
        let store = self.evaluator.store();
        store.initialize().await?;

        let state = AppState {
            evaluator: Arc::clone(&self.evaluator),
            store,
        };
        let router = Self::build_router(state);

        let listener = tokio::net::TcpListener::bind(self.config.addr).await?;
        info!("Evaluation API listening on http://{}", self.config.addr);
        axum::serve(listener, router).await?;
        Ok(())
    }
}

/// Error payload shape shared by every failure response
#[derive(Debug, Serialize, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Map pipeline errors onto HTTP statuses: invalid input is the caller's
/// fault, everything else is ours.
fn error_response(err: ThemisError) -> (StatusCode, Json<ErrorBody>) {
    let (status, message) = match err {
        ThemisError::Validation(message) => (StatusCode::BAD_REQUEST, message),
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    };
    (status, Json(ErrorBody { error: message }))
}

#[derive(Debug, Deserialize)]
struct EvaluateRequest {
    #[serde(default)]
    conversation: String,
}

/// Evaluate handler: one conversation in, one report out, one row appended.
async fn evaluate_handler(
    State(state): State<AppState>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<EvaluationReport>, (StatusCode, Json<ErrorBody>)> {
    debug!(chars = request.conversation.len(), "Evaluation requested");

    let record = state
        .evaluator
        .evaluate(&request.conversation)
        .await
        .map_err(error_response)?;

    Ok(Json(EvaluationReport::from(&record)))
}

/// Full log read-back, in insertion order
async fn list_evaluations_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<EvaluationRecord>>, (StatusCode, Json<ErrorBody>)> {
    let records = state.store.read_all().await.map_err(error_response)?;
    Ok(Json(records))
}

#[derive(Debug, Deserialize)]
struct WindowParams {
    start: Option<String>,
    end: Option<String>,
}

/// Flagged cases, optionally bounded by an inclusive IST range
async fn flagged_handler(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> Result<Json<Vec<EvaluationRecord>>, (StatusCode, Json<ErrorBody>)> {
    let window = AuditWindow::from_bounds(params.start.as_deref(), params.end.as_deref())
        .map_err(error_response)?;

    let records = state.store.read_all().await.map_err(error_response)?;
    Ok(Json(window.filter(&records)))
}

/// Same filter as `/audit/flagged`, rendered as a CSV attachment
async fn export_handler(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let window = AuditWindow::from_bounds(params.start.as_deref(), params.end.as_deref())
        .map_err(error_response)?;

    let records = state.store.read_all().await.map_err(error_response)?;
    let report = audit::report_bytes(&window.filter(&records)).map_err(error_response)?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", audit::EXPORT_FILE_NAME),
        ),
    ];
    Ok((headers, report))
}

/// Health check handler
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
