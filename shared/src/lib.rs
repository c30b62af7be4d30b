//! Shared library for the e-invoice gateway
//!
//! Configuration loading and the HTTP-facing error type used by the
//! gateway service and its handlers.

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{AppConfig, Config, EInvoiceConfig};
pub use error::{AppError, ErrorResponse, Result};
