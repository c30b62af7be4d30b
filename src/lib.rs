use axum::{extract::State, response::Json, routing::get, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod domains;
pub mod observability;
pub mod state;
pub mod utils;

use api::create_api_router;
use observability::{metrics_handler, metrics_middleware};
use state::AppState;

use axum::middleware as axum_middleware;

pub fn create_app_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        // Monitoring endpoints, no state-dependent logic
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .merge(create_api_router())
        .with_state(app_state)
        .layer(axum_middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub environment: String,
    pub timestamp: DateTime<Utc>,
}

async fn health_handler(State(app_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        environment: app_state.config.app.environment.clone(),
        timestamp: Utc::now(),
    })
}
