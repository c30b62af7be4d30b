use std::sync::Arc;

use shared::Config;

use crate::domains::einvoice::{Clock, EInvoiceService};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub einvoice: EInvoiceService,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let einvoice = EInvoiceService::from_config(&config.einvoice)
            .map_err(|e| anyhow::anyhow!("Failed to initialize e-invoice service: {}", e))?;

        Ok(Self { config, einvoice })
    }

    /// State whose e-invoice timestamps come from `clock`.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let einvoice = EInvoiceService::with_clock(&config.einvoice, clock)
            .map_err(|e| anyhow::anyhow!("Failed to initialize e-invoice service: {}", e))?;

        Ok(Self { config, einvoice })
    }
}
