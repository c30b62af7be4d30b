use shared::AppError;
use thiserror::Error;

use crate::domains::einvoice::channel::InvoiceChannel;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Structural failures that are allowed to escape the gateway.
///
/// Transport and authority-side failures never show up here; they are folded
/// into a `NormalizedResult` with code 999 by the executor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvoiceApiError {
    #[error("Unsupported invoice channel: {value}")]
    UnsupportedChannel { value: String },

    #[error("Malformed invoice detail at index {index}: {field}")]
    MalformedDetail { index: usize, field: String },

    #[error("Invalid invoice date: {value}")]
    InvalidDate { value: String },

    #[error("Missing {field} for {channel} query")]
    MissingField {
        channel: InvoiceChannel,
        field: &'static str,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl InvoiceApiError {
    pub fn unsupported_channel(value: impl ToString) -> Self {
        Self::UnsupportedChannel {
            value: value.to_string(),
        }
    }

    pub fn malformed_detail(index: usize, field: impl Into<String>) -> Self {
        Self::MalformedDetail {
            index,
            field: field.into(),
        }
    }
}

/// Failures raised while classifying a raw authority reply.
///
/// Internal to the executor: each one is substituted with a 999 envelope.
#[derive(Error, Debug)]
pub enum ClassificationError {
    #[error("e-invoice API returned an undecodable body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("e-invoice API returned a non-object JSON body")]
    NotAnObject,

    #[error("e-invoice API reply has no code")]
    MissingCode,
}

// ============================================================================
// CONVERSION TO HTTP ERRORS
// ============================================================================

impl From<InvoiceApiError> for AppError {
    fn from(err: InvoiceApiError) -> Self {
        match err {
            InvoiceApiError::UnsupportedChannel { value } => AppError::unsupported_channel(value),
            InvoiceApiError::MalformedDetail { .. } => AppError::malformed_detail(err.to_string()),
            InvoiceApiError::InvalidDate { .. } => AppError::validation(err.to_string()),
            InvoiceApiError::MissingField { .. } => AppError::validation(err.to_string()),
            InvoiceApiError::Configuration { message } => AppError::configuration(message),
        }
    }
}
