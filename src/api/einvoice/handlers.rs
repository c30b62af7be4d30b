use axum::{
    extract::{Json, State},
    response::Json as ResponseJson,
};
use std::sync::Arc;
use tracing::{info, warn};

use shared::AppError;

use crate::api::einvoice::models::{BatchVerifyRequest, BatchVerifyResponse};
use crate::domains::einvoice::{
    HeaderQueryOutcome, HeaderQueryRequest, InvoiceQueryRequest, NormalizedResult, RawHeaderQuery,
    RawInvoiceQuery,
};
use crate::state::AppState;

// ============================================================================
// HANDLER FUNCTIONS
// ============================================================================

/// POST /api/v4/einvoice/verify
///
/// Authority and transport failures are part of the normalized body; only an
/// unsupported channel or an unparseable date is an HTTP error.
pub async fn verify_invoice_handler(
    State(app_state): State<Arc<AppState>>,
    Json(query): Json<RawInvoiceQuery>,
) -> Result<ResponseJson<NormalizedResult>, AppError> {
    let request = InvoiceQueryRequest::try_from(query).map_err(|e| {
        warn!(error = %e, "Rejected invoice verification request");
        AppError::from(e)
    })?;

    let result = app_state.einvoice.verify_invoice(&request).await?;

    info!(
        channel = %request.channel,
        invoice_number = %request.invoice_number,
        code = result.code,
        "Invoice verification completed"
    );

    Ok(ResponseJson(result))
}

/// POST /api/v4/einvoice/verify/batch
pub async fn verify_batch_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<BatchVerifyRequest>,
) -> Result<ResponseJson<BatchVerifyResponse>, AppError> {
    info!(records = request.records.len(), "Received batch verification request");

    let items = app_state.einvoice.verify_invoice_batch(request.records).await?;

    Ok(ResponseJson(BatchVerifyResponse::new(items)))
}

/// POST /api/v4/einvoice/carrier/header
pub async fn carrier_header_handler(
    State(app_state): State<Arc<AppState>>,
    Json(query): Json<RawHeaderQuery>,
) -> Result<ResponseJson<HeaderQueryOutcome>, AppError> {
    let request = HeaderQueryRequest::try_from(query)?;
    let outcome = app_state.einvoice.query_carrier_header(&request).await?;

    Ok(ResponseJson(outcome))
}
