// ============================================================================
// PROMETHEUS METRICS
// ============================================================================
// Gateway traffic and e-invoice authority calls, scraped from /metrics
// ============================================================================

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter_vec, Histogram, HistogramVec,
    IntCounterVec,
};

lazy_static! {
    // ========================================================================
    // HTTP REQUEST METRICS
    // ========================================================================

    /// HTTP requests by method, endpoint and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "endpoint", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "endpoint"],
        vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // ========================================================================
    // E-INVOICE AUTHORITY METRICS
    // ========================================================================

    /// Authority calls by endpoint and classified outcome
    pub static ref EINVOICE_API_CALLS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "einvoice_api_calls_total",
        "Total number of e-invoice authority calls",
        &["endpoint", "outcome"]
    )
    .unwrap();

    pub static ref EINVOICE_API_CALL_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "einvoice_api_call_duration_seconds",
        "E-invoice authority call duration in seconds",
        &["endpoint"],
        vec![0.050, 0.100, 0.250, 0.500, 1.0, 2.0, 3.0, 5.0]
    )
    .unwrap();

    /// Records per verification batch
    pub static ref EINVOICE_BATCH_SIZE: Histogram = register_histogram!(
        "einvoice_batch_size",
        "Number of records per e-invoice verification batch",
        vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0]
    )
    .unwrap();

    /// Batch entries by outcome
    pub static ref EINVOICE_BATCH_ENTRIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "einvoice_batch_entries_total",
        "Total e-invoice batch entries by outcome",
        &["status"]
    )
    .unwrap();
}

// ============================================================================
// HELPERS
// ============================================================================

pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, endpoint])
        .observe(duration_secs);
}

/// Records one authority call. `outcome` is `success`, `business_error` or
/// `transport_error`.
pub fn record_einvoice_call(endpoint: &str, outcome: &str, duration_secs: f64) {
    EINVOICE_API_CALLS_TOTAL
        .with_label_values(&[endpoint, outcome])
        .inc();

    EINVOICE_API_CALL_DURATION_SECONDS
        .with_label_values(&[endpoint])
        .observe(duration_secs);
}

pub fn record_einvoice_batch(batch_size: usize, succeeded: usize) {
    EINVOICE_BATCH_SIZE.observe(batch_size as f64);

    if succeeded > 0 {
        EINVOICE_BATCH_ENTRIES_TOTAL
            .with_label_values(&["success"])
            .inc_by(succeeded as u64);
    }
    let failed = batch_size.saturating_sub(succeeded);
    if failed > 0 {
        EINVOICE_BATCH_ENTRIES_TOTAL
            .with_label_values(&["failure"])
            .inc_by(failed as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_einvoice_call_increments_counter() {
        let before = EINVOICE_API_CALLS_TOTAL
            .with_label_values(&["InvApp", "success"])
            .get();

        record_einvoice_call("InvApp", "success", 0.2);

        let after = EINVOICE_API_CALLS_TOTAL
            .with_label_values(&["InvApp", "success"])
            .get();
        assert!(after > before);
    }

    #[test]
    fn test_record_batch_splits_outcomes() {
        let failures_before = EINVOICE_BATCH_ENTRIES_TOTAL.with_label_values(&["failure"]).get();

        record_einvoice_batch(5, 3);

        let failures_after = EINVOICE_BATCH_ENTRIES_TOTAL.with_label_values(&["failure"]).get();
        assert!(failures_after >= failures_before + 2);
    }
}
