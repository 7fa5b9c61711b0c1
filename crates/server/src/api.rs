//! HTTP API for predictions, health checks and Prometheus metrics

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use gradecast_lib::{
    health::{ComponentStatus, HealthRegistry},
    models::{OwnerScope, PredictionLabel, PredictionStats, StudentId, TeacherId},
    observability::ServiceMetrics,
    PredictionError, PredictionService, StoreError, StudentStore,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Header carrying the calling teacher's id
pub const TEACHER_HEADER: &str = "x-teacher-id";

/// Header marking an admin caller
pub const ADMIN_HEADER: &str = "x-admin";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub store: Arc<dyn StudentStore>,
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
}

impl AppState {
    pub fn new(
        service: Arc<PredictionService>,
        store: Arc<dyn StudentStore>,
        health_registry: HealthRegistry,
        metrics: ServiceMetrics,
    ) -> Self {
        Self {
            service,
            store,
            health_registry,
            metrics,
        }
    }
}

/// Errors returned to HTTP clients as `{"error": ...}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<PredictionError> for ApiError {
    fn from(err: PredictionError) -> Self {
        match err {
            PredictionError::NotFound(_) => ApiError::NotFound(err.to_string()),
            PredictionError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        PredictionError::from(err).into()
    }
}

/// Caller identity, resolved from request headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    Teacher(TeacherId),
    Admin,
}

impl Principal {
    pub fn scope(&self) -> OwnerScope {
        match self {
            Principal::Teacher(id) => OwnerScope::Teacher(*id),
            Principal::Admin => OwnerScope::All,
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| parts.headers.get(name).and_then(|v| v.to_str().ok());

        if header(ADMIN_HEADER).is_some_and(|v| v.eq_ignore_ascii_case("true")) {
            return Ok(Principal::Admin);
        }

        header(TEACHER_HEADER)
            .and_then(|v| v.trim().parse::<TeacherId>().ok())
            .map(Principal::Teacher)
            .ok_or(ApiError::Unauthorized)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: PredictionLabel,
    pub probability: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StudentPredictionEntry {
    pub id: StudentId,
    pub prediction: PredictionLabel,
    pub probability: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictAllResponse {
    pub updated: usize,
    pub skipped: usize,
    pub students: Vec<StudentPredictionEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reject students outside the caller's scope as not found
fn authorize(state: &AppState, principal: Principal, id: StudentId) -> Result<(), ApiError> {
    let visible = state
        .store
        .get(id)?
        .is_some_and(|student| principal.scope().contains(&student));

    if visible {
        Ok(())
    } else {
        Err(ApiError::NotFound(format!("student {} not found", id)))
    }
}

async fn predict_student(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<StudentId>,
) -> Result<Json<PredictResponse>, ApiError> {
    authorize(&state, principal, id)?;
    let result = state.service.predict_one(id)?;

    Ok(Json(PredictResponse {
        prediction: result.label,
        probability: result.probability,
    }))
}

async fn predict_all(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<PredictAllResponse>, ApiError> {
    let summary = state.service.predict_all(principal.scope())?;

    Ok(Json(PredictAllResponse {
        updated: summary.updated,
        skipped: summary.skipped,
        students: summary
            .results
            .into_iter()
            .map(|r| StudentPredictionEntry {
                id: r.student_id,
                prediction: r.label,
                probability: r.probability,
            })
            .collect(),
        error: summary.error,
    }))
}

/// Prediction counts for the caller; all zeros without a principal
async fn stats(
    State(state): State<Arc<AppState>>,
    principal: Option<Principal>,
) -> Result<Json<PredictionStats>, ApiError> {
    let stats = match principal {
        Some(p) => state.service.stats(p.scope())?,
        None => PredictionStats::default(),
    };
    Ok(Json(stats))
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<Response, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response())
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/students/predict_all", post(predict_all))
        .route("/students/:id/predict", post(predict_student))
        .route("/api/stats", get(stats))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve<F>(addr: &str, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
