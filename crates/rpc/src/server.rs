use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use superfund_ai_core::ErrorKind;
use superfund_ai_service::{AdvisorService, ChatRequest, Recommendation, ServiceError};
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Text returned by the status endpoint
pub const STATUS_NOTE: &str = "Use /train, /predict, /recommendations, /chat endpoints";

const DEFAULT_TEST_SIZE: f64 = 0.2;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub service: AdvisorService,
}

impl AppState {
    pub fn new(service: AdvisorService) -> Self {
        Self { service }
    }
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        if err.is_no_matches() {
            return Self::not_found(err.to_string());
        }
        match err.kind() {
            ErrorKind::Internal => {
                warn!(error = %err, "Request failed");
                Self::internal(err.to_string())
            }
            _ => {
                debug!(error = %err, "Request rejected");
                Self::bad_request(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let payload = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, payload).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub note: String,
}

#[derive(Debug, Deserialize)]
struct TrainQuery {
    #[serde(default)]
    test_size: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrainResponse {
    pub message: String,
    #[serde(rename = "trainMAE")]
    pub train_mae: f64,
    #[serde(rename = "validationMAE")]
    pub validation_mae: f64,
}

#[derive(Debug, Deserialize)]
struct PredictRequest {
    features: Map<String, JsonValue>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(rename = "predicted5yrReturn")]
    pub predicted_5yr_return: f64,
}

#[derive(Debug, Deserialize)]
struct RecommendationsQuery {
    #[serde(default)]
    risk: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsResponse {
    pub risk: String,
    pub top_options: Vec<Recommendation>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

pub async fn start_server(state: AppState, addr: &str) -> Result<()> {
    let shared = Arc::new(state);
    let app = build_router(shared)?;
    let listener = bind_listener(addr).await?;
    info!("HTTP gateway listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server terminated unexpectedly")
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind HTTP listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind HTTP listener on {addr}"))
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Build the gateway router with CORS and request tracing.
pub fn build_router(state: SharedState) -> Result<Router> {
    let cors = cors_layer(&state.service.config().allowed_origin)?;

    let router = Router::new()
        .route("/", get(handle_status))
        .route("/train", post(handle_train))
        .route("/predict", post(handle_predict))
        .route("/recommendations", post(handle_recommendations))
        .route("/chat", post(handle_chat))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state);

    Ok(router)
}

/// Only `origin` is allowed, with credentials. Requested methods and
/// headers are echoed back.
fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let origin = HeaderValue::from_str(origin)
        .with_context(|| format!("invalid allowed origin '{origin}'"))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

async fn handle_status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        note: STATUS_NOTE.to_string(),
    })
}

async fn handle_train(
    State(state): State<SharedState>,
    Query(query): Query<TrainQuery>,
) -> Result<Json<TrainResponse>, ApiError> {
    let test_size = query.test_size.unwrap_or(DEFAULT_TEST_SIZE);
    let report = state.service.train(test_size).await?;

    Ok(Json(TrainResponse {
        message: "Model trained and saved.".to_string(),
        train_mae: report.train_mae,
        validation_mae: report.validation_mae,
    }))
}

async fn handle_predict(
    State(state): State<SharedState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiError> {
    let prediction = state.service.predict(request.features).await?;
    Ok(Json(PredictResponse {
        predicted_5yr_return: prediction,
    }))
}

async fn handle_recommendations(
    State(state): State<SharedState>,
    Query(query): Query<RecommendationsQuery>,
) -> Result<Json<RecommendationsResponse>, ApiError> {
    let risk = query
        .risk
        .ok_or_else(|| ApiError::bad_request("Query parameter 'risk' is required"))?;

    let top_options = state.service.recommend(risk.clone()).await?;
    Ok(Json(RecommendationsResponse { risk, top_options }))
}

async fn handle_chat(
    State(state): State<SharedState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let response = state.service.chat(request).await?;
    Ok(Json(ChatResponse { response }))
}
