use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL};
use reqwest::{redirect, Client};
use serde_json::Value;
use shared::EInvoiceConfig;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::domains::einvoice::channel::Endpoint;
use crate::domains::einvoice::error_handling::{ClassificationError, InvoiceApiError};
use crate::domains::einvoice::models::{NormalizedResult, ProviderResponse, TRANSPORT_ERROR_CODE};
use crate::domains::einvoice::params::ParameterSet;
use crate::observability::record_einvoice_call;

/// Reply the authority sometimes sends instead of JSON.
pub const EMPTY_PLACEHOLDER_BODY: &str = " \n";

// ============================================================================
// EXECUTION REPORT
// ============================================================================

/// What one call produced: the verbatim body (if any) and its classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub raw_body: Option<String>,
    pub result: NormalizedResult,
}

// ============================================================================
// AUTHORITY CLIENT
// ============================================================================

/// Executes form-encoded POSTs against the e-invoice authority.
///
/// The authority still serves a legacy TLS configuration, so certificate and
/// hostname verification are disabled and older protocol versions are
/// allowed. This is a compatibility requirement of that one service and must
/// not be copied to new integrations.
///
/// The cipher security level is not lowered (`DEFAULT@SECLEVEL=1` has no
/// equivalent on the reqwest builder), so the handshake can still fail when
/// the system OpenSSL defaults to a stricter level. Operators hitting that
/// need to relax `CipherString` in the host's OpenSSL configuration.
#[derive(Debug, Clone)]
pub struct InvoiceApiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl InvoiceApiClient {
    pub fn new(config: &EInvoiceConfig) -> Result<Self, InvoiceApiError> {
        let timeout = Duration::from_secs(config.timeout_seconds);

        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let client = Client::builder()
            .timeout(timeout)
            .http1_only()
            .redirect(redirect::Policy::limited(10))
            .default_headers(headers)
            // Connections are not kept between calls.
            .pool_max_idle_per_host(0)
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .min_tls_version(reqwest::tls::Version::TLS_1_0)
            .build()
            .map_err(|e| InvoiceApiError::Configuration {
                message: format!("Failed to create e-invoice HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends one request and returns its classified result. Never fails.
    pub async fn execute(&self, endpoint: Endpoint, parameters: &ParameterSet) -> NormalizedResult {
        self.execute_raw(endpoint, parameters).await.result
    }

    /// Like [`execute`](Self::execute) but also hands back the verbatim body.
    pub async fn execute_raw(&self, endpoint: Endpoint, parameters: &ParameterSet) -> ExecutionReport {
        let url = endpoint.url(&self.base_url);
        let started = Instant::now();

        info!(url = %url, parameters = %parameters.masked(), "Calling e-invoice API");

        let report = match self.send(&url, parameters).await {
            Ok(body) => {
                let result = match classify(&body) {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(url = %url, error = %e, "Could not classify e-invoice API reply");
                        fallback_result(&e, &body)
                    }
                };
                ExecutionReport {
                    raw_body: Some(body),
                    result,
                }
            }
            Err(e) => {
                error!(url = %url, error = %e, timeout = e.is_timeout(), "e-invoice API transport failure");
                ExecutionReport {
                    raw_body: None,
                    result: NormalizedResult::no_response(),
                }
            }
        };

        log_classification(&url, parameters, &report);
        record_einvoice_call(endpoint.as_str(), outcome_label(&report.result), started.elapsed().as_secs_f64());

        report
    }

    async fn send(&self, url: &str, parameters: &ParameterSet) -> Result<String, reqwest::Error> {
        let response = self.client.post(url).form(parameters).send().await?;
        let status = response.status();
        debug!(url = %url, %status, "e-invoice API responded");

        response.text().await
    }
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// Classifies a received body.
///
/// Priority: empty placeholder, then the authority's own 999 code, then the
/// decoded body verbatim. Business codes other than 999 are not collapsed.
pub fn classify(body: &str) -> Result<NormalizedResult, ClassificationError> {
    if is_empty_placeholder(body) {
        return Ok(NormalizedResult::no_response());
    }

    let decoded: Value = serde_json::from_str(body)?;
    if !decoded.is_object() {
        return Err(ClassificationError::NotAnObject);
    }

    if decoded.get("code").map_or(true, Value::is_null) {
        return Err(ClassificationError::MissingCode);
    }

    let response: ProviderResponse = serde_json::from_value(decoded.clone())?;
    if response.code == TRANSPORT_ERROR_CODE {
        return Ok(NormalizedResult::no_response().with_raw_body(decoded));
    }

    Ok(NormalizedResult::from_provider(response, decoded))
}

pub fn is_empty_placeholder(body: &str) -> bool {
    body == EMPTY_PLACEHOLDER_BODY || body.trim().is_empty()
}

fn fallback_result(error: &ClassificationError, body: &str) -> NormalizedResult {
    NormalizedResult::transport_error(error.to_string()).with_raw_body(Value::String(body.to_string()))
}

fn outcome_label(result: &NormalizedResult) -> &'static str {
    use crate::domains::einvoice::models::Outcome;

    match result.outcome() {
        Outcome::Success => "success",
        Outcome::BusinessError(_) => "business_error",
        Outcome::TransportError => "transport_error",
    }
}

fn log_classification(url: &str, parameters: &ParameterSet, report: &ExecutionReport) {
    let raw = report.raw_body.as_deref().unwrap_or("<none>");
    let result = &report.result;

    if result.is_success() {
        info!(
            url = %url,
            parameters = %parameters.masked(),
            code = result.code,
            body = %raw,
            "e-invoice API call succeeded"
        );
    } else {
        error!(
            url = %url,
            parameters = %parameters.masked(),
            code = result.code,
            message = %result.message,
            status = ?result.status,
            body = %raw,
            "e-invoice API call did not succeed"
        );
    }
}
