// E-invoice verification API
// Single and batch verification plus carrier header listings

pub mod handlers;
pub mod models;

pub use handlers::*;
pub use models::*;

use axum::{routing::post, Router};
use std::sync::Arc;
use crate::state::AppState;

/// Create the e-invoice router
pub fn create_einvoice_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/verify", post(verify_invoice_handler))
        .route("/verify/batch", post(verify_batch_handler))
        .route("/carrier/header", post(carrier_header_handler))
}
