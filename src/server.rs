//! HTTP server for candidate ranking

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    JobRequirement, ProviderPolicy, RankError, RankedResult, RankingSchema, RunOptions,
    SharedRankingEngine,
};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub engine: SharedRankingEngine,
    /// Schema used when a request does not carry its own
    pub default_schema: Arc<RankingSchema>,
}

impl AppState {
    pub fn new(engine: SharedRankingEngine, default_schema: RankingSchema) -> Self {
        Self {
            engine,
            default_schema: Arc::new(default_schema),
        }
    }
}

/// HTTP request body for a ranking run
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RankRequestHttp {
    pub requirement: JobRequirement,
    pub candidates: Vec<Value>,
    #[serde(default)]
    pub schema: Option<RankingSchema>,
    /// Required: the caller decides what happens if the provider is down
    pub provider_policy: ProviderPolicy,
    /// Return only the best `top` entries
    #[serde(default)]
    pub top: Option<usize>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub embedding_provider: String,
}

fn error_status(err: &RankError) -> StatusCode {
    match err {
        RankError::InvalidSchema(_) | RankError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RankError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(err: RankError) -> (StatusCode, Json<ErrorResponse>) {
    let label = match &err {
        RankError::InvalidInput(_) => "Invalid request",
        _ => "Ranking failed",
    };
    (
        error_status(&err),
        Json(ErrorResponse {
            error: label.to_string(),
            details: Some(err.to_string()),
        }),
    )
}

/// Rank candidates handler
async fn rank_handler(
    State(state): State<AppState>,
    payload: Result<Json<RankRequestHttp>, JsonRejection>,
) -> Result<Json<RankedResult>, (StatusCode, Json<ErrorResponse>)> {
    let Json(req) = payload.map_err(|rejection| {
        warn!("Rejected rank request: {}", rejection.body_text());
        error_response(RankError::InvalidInput(rejection.body_text()))
    })?;

    info!(
        "Received rank request: {} candidates, custom_schema={}, policy={:?}",
        req.candidates.len(),
        req.schema.is_some(),
        req.provider_policy
    );

    let schema = match req.schema {
        Some(schema) => Arc::new(schema),
        None => state.default_schema.clone(),
    };

    match state
        .engine
        .rank_raw(
            &req.requirement,
            req.candidates,
            &schema,
            RunOptions::new(req.provider_policy),
        )
        .await
    {
        Ok(mut result) => {
            if let Some(top) = req.top {
                result.entries.truncate(top);
            }
            info!(
                "Ranking successful: {} returned, {} skipped",
                result.entries.len(),
                result.summary.skipped.len()
            );
            Ok(Json(result))
        }
        Err(e) => {
            error!("Ranking failed: {:?}", e);
            Err(error_response(e))
        }
    }
}

/// Health check handler
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "talentrank".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        embedding_provider: state.engine.provider_name().to_string(),
    })
}

/// Create and configure the HTTP router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/rank", post(rank_handler))
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    info!("Starting talentrank server on {}", addr);

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
