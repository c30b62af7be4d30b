pub mod einvoice;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// Versioned API routes, mounted under `/api/v4`.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new().nest("/api/v4/einvoice", einvoice::create_einvoice_router())
}
