//! Configuration management for the e-invoice gateway

use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_API_BASE_URL: &str = "https://api.einvoice.nat.gov.tw/PB2CAPIVAN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub einvoice: EInvoiceConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EInvoiceConfig {
    pub api_base_url: String,
    pub app_id: String,
    pub header_app_id: String,
    pub timeout_seconds: u64,
    /// Fan-out ceiling for batch verification. `None` means one in-flight call per record.
    pub batch_max_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: String,
    pub log_level: String,
    pub port: u16,
}

impl Default for EInvoiceConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            app_id: String::new(),
            header_app_id: String::new(),
            timeout_seconds: 3,
            batch_max_concurrency: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let app_id = env::var("INVOICE_APP_ID").unwrap_or_default();
        let header_app_id = env::var("INVOICE_HEADER_APP_ID").unwrap_or_else(|_| app_id.clone());

        let batch_max_concurrency =
            parse_batch_max_concurrency(env::var("INVOICE_BATCH_MAX_CONCURRENCY").ok().as_deref())?;
        let timeout_seconds =
            parse_timeout_seconds(env::var("INVOICE_API_TIMEOUT_SECONDS").ok().as_deref())?;

        Ok(Config {
            einvoice: EInvoiceConfig {
                api_base_url: env::var("INVOICE_API_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
                app_id,
                header_app_id,
                timeout_seconds,
                batch_max_concurrency,
            },
            app: AppConfig {
                environment: env::var("ENVIRONMENT")
                    .unwrap_or_else(|_| "development".to_string()),
                log_level: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "info".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()?,
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.app.environment == "production"
    }
}

/// Per-call timeout in seconds; unset means 3 and zero is rejected.
fn parse_timeout_seconds(raw: Option<&str>) -> anyhow::Result<u64> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => {
            let seconds: u64 = value.parse()?;
            if seconds == 0 {
                anyhow::bail!("INVOICE_API_TIMEOUT_SECONDS must be greater than zero");
            }
            Ok(seconds)
        }
        None => Ok(3),
    }
}

fn parse_batch_max_concurrency(raw: Option<&str>) -> anyhow::Result<Option<usize>> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => {
            let limit: usize = value.parse()?;
            if limit == 0 {
                anyhow::bail!("INVOICE_BATCH_MAX_CONCURRENCY must be greater than zero");
            }
            Ok(Some(limit))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_einvoice_config() {
        let config = EInvoiceConfig::default();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.timeout_seconds, 3);
        assert!(config.batch_max_concurrency.is_none());
    }

    #[test]
    fn test_timeout_seconds_parsing() {
        assert_eq!(parse_timeout_seconds(None).unwrap(), 3);
        assert_eq!(parse_timeout_seconds(Some(" 5 ")).unwrap(), 5);
        assert!(parse_timeout_seconds(Some("0")).is_err());
        assert!(parse_timeout_seconds(Some("soon")).is_err());
    }

    #[test]
    fn test_batch_max_concurrency_parsing() {
        assert_eq!(parse_batch_max_concurrency(None).unwrap(), None);
        assert_eq!(parse_batch_max_concurrency(Some("")).unwrap(), None);
        assert_eq!(parse_batch_max_concurrency(Some("8")).unwrap(), Some(8));
        assert!(parse_batch_max_concurrency(Some("0")).is_err());
    }
}
