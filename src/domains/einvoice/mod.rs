// E-invoice authority integration
// Parameter building, request execution, result classification and batch fan-out

pub mod batch;
pub mod channel;
pub mod client;
pub mod error_handling;
pub mod header;
pub mod models;
pub mod params;
pub mod service;

pub use channel::{Endpoint, InvoiceChannel};
pub use client::{classify, ExecutionReport, InvoiceApiClient};
pub use error_handling::{ClassificationError, InvoiceApiError};
pub use models::*;
pub use params::{Clock, FixedClock, ParameterBuilder, ParameterSet, PreparedRequest, SystemClock};
pub use service::EInvoiceService;
