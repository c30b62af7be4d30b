use std::sync::Arc;
use tracing::{error, info, instrument};

use shared::EInvoiceConfig;

use crate::domains::einvoice::batch::dispatch_batch;
use crate::domains::einvoice::client::InvoiceApiClient;
use crate::domains::einvoice::error_handling::InvoiceApiError;
use crate::domains::einvoice::header::normalize_details;
use crate::domains::einvoice::models::{
    BatchItem, HeaderQueryOutcome, HeaderQueryRequest, InvoiceQueryRequest, InvoiceRecord,
    NormalizedResult, Outcome,
};
use crate::domains::einvoice::params::{Clock, ParameterBuilder, SystemClock};

/// Authority codes a header query hands back untouched.
const PASSTHROUGH_HEADER_CODES: [i64; 3] = [903, 919, 999];

/// Entry point for every e-invoice operation.
#[derive(Clone)]
pub struct EInvoiceService {
    client: InvoiceApiClient,
    builder: ParameterBuilder,
    clock: Arc<dyn Clock>,
    batch_max_concurrency: Option<usize>,
}

impl EInvoiceService {
    pub fn from_config(config: &EInvoiceConfig) -> Result<Self, InvoiceApiError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &EInvoiceConfig, clock: Arc<dyn Clock>) -> Result<Self, InvoiceApiError> {
        let client = InvoiceApiClient::new(config)?;

        info!(
            base_url = %client.base_url(),
            timeout_secs = client.timeout().as_secs(),
            batch_max_concurrency = ?config.batch_max_concurrency,
            "e-invoice service initialized"
        );

        Ok(Self {
            client,
            builder: ParameterBuilder::new(config.app_id.clone(), config.header_app_id.clone()),
            clock,
            batch_max_concurrency: config.batch_max_concurrency,
        })
    }

    /// Verifies one invoice. Authority and transport failures come back as a
    /// normalized result; only invalid input is an `Err`.
    #[instrument(skip(self, request), fields(channel = %request.channel, invoice_number = %request.invoice_number))]
    pub async fn verify_invoice(&self, request: &InvoiceQueryRequest) -> Result<NormalizedResult, InvoiceApiError> {
        let prepared = self.builder.build(request, self.clock.now())?;
        Ok(self.client.execute(prepared.endpoint, &prepared.parameters).await)
    }

    /// Verifies scheduled records concurrently, pairing each result with its ids.
    pub async fn verify_invoice_batch(&self, records: Vec<InvoiceRecord>) -> Result<Vec<BatchItem>, InvoiceApiError> {
        dispatch_batch(
            &self.client,
            &self.builder,
            self.clock.now(),
            records,
            self.batch_max_concurrency,
        )
        .await
    }

    /// Lists the invoices attached to a carrier over a date range.
    #[instrument(skip(self, request), fields(channel = %request.channel))]
    pub async fn query_carrier_header(
        &self,
        request: &HeaderQueryRequest,
    ) -> Result<HeaderQueryOutcome, InvoiceApiError> {
        let prepared = self.builder.build_header(request, self.clock.now());
        let result = self.client.execute(prepared.endpoint, &prepared.parameters).await;

        interpret_header_result(result, request)
    }
}

fn interpret_header_result(
    result: NormalizedResult,
    request: &HeaderQueryRequest,
) -> Result<HeaderQueryOutcome, InvoiceApiError> {
    match result.outcome() {
        Outcome::TransportError => Ok(HeaderQueryOutcome::Result(result)),
        Outcome::Success => match &result.details {
            Some(details) => {
                let lines = normalize_details(details, request.channel)?;
                info!(
                    lines = lines.len(),
                    period_start = %request.period_start,
                    period_end = %request.period_end,
                    "Carrier header query returned invoices"
                );
                Ok(HeaderQueryOutcome::Lines(lines))
            }
            None => Ok(HeaderQueryOutcome::Result(result)),
        },
        Outcome::BusinessError(code) if PASSTHROUGH_HEADER_CODES.contains(&code) => {
            error!(code, message = %result.message, "Carrier header query rejected by e-invoice API");
            Ok(HeaderQueryOutcome::Result(result))
        }
        Outcome::BusinessError(code) => {
            error!(code, message = %result.message, "Unexpected e-invoice API code for header query");
            Ok(HeaderQueryOutcome::Result(NormalizedResult {
                message: format!("e-invoice API error: {}", result.message),
                details: None,
                ..result
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::einvoice::channel::InvoiceChannel;
    use crate::domains::einvoice::models::ResultStatus;
    use crate::domains::einvoice::params::FixedClock;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn service_for(server: &MockServer) -> EInvoiceService {
        let config = EInvoiceConfig {
            api_base_url: server.uri(),
            app_id: "EINV0000000001".to_string(),
            header_app_id: "EINV0000000002".to_string(),
            timeout_seconds: 2,
            batch_max_concurrency: None,
        };
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        EInvoiceService::with_clock(&config, Arc::new(clock)).unwrap()
    }

    fn header_request(channel: InvoiceChannel) -> HeaderQueryRequest {
        HeaderQueryRequest {
            channel,
            carrier_id: "/ABC+123".to_string(),
            carrier_secret: "s3cret".to_string(),
            period_start: "2024/03/01".to_string(),
            period_end: "2024/03/31".to_string(),
        }
    }

    async fn mount_header_reply(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/invServ/InvServ"))
            .and(body_string_contains("action=carrierInvChk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_verify_invoice_uses_frozen_clock_and_app_id() {
        let server = MockServer::start().await;
        let expected_uuid = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap().timestamp();
        Mock::given(method("POST"))
            .and(path("/invapp/InvApp"))
            .and(body_string_contains(format!("UUID={}", expected_uuid)))
            .and(body_string_contains("appID=EINV0000000001"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"code": "200", "msg": "ok"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let service = service_for(&server).await;
        let request = InvoiceQueryRequest::electronic("AB12345678", "2024-03-15", "1234");
        let result = service.verify_invoice(&request).await.unwrap();

        assert_eq!(result.outcome(), Outcome::Success);
    }

    #[tokio::test]
    async fn test_header_query_normalizes_details() {
        let server = MockServer::start().await;
        mount_header_reply(
            &server,
            json!({
                "code": 200,
                "msg": "執行成功",
                "details": [{
                    "sellerName": "A",
                    "sellerBan": "123",
                    "invNum": "AB12345678",
                    "amount": "100",
                    "invDate": {"year": 113, "month": 3, "date": 15},
                    "invoiceTime": "10:00:00",
                    "buyerBan": "456"
                }]
            }),
        )
        .await;

        let service = service_for(&server).await;
        let outcome = service
            .query_carrier_header(&header_request(InvoiceChannel::CloudCarrier))
            .await
            .unwrap();

        match outcome {
            HeaderQueryOutcome::Lines(lines) => {
                assert_eq!(lines.len(), 1);
                assert_eq!(lines[0].invoice_date, "2024/03/15");
                assert_eq!(lines[0].channel, InvoiceChannel::CloudCarrier);
            }
            other => panic!("expected lines, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_header_query_passes_known_rejections_through() {
        let server = MockServer::start().await;
        mount_header_reply(&server, json!({"code": "919", "msg": "查無資料"})).await;

        let service = service_for(&server).await;
        let outcome = service
            .query_carrier_header(&header_request(InvoiceChannel::EasyCard))
            .await
            .unwrap();

        match outcome {
            HeaderQueryOutcome::Result(result) => {
                assert_eq!(result.code, 919);
                assert_eq!(result.message, "查無資料");
                assert_eq!(result.status, ResultStatus::Ok);
            }
            other => panic!("expected result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_header_query_wraps_unexpected_codes() {
        let server = MockServer::start().await;
        mount_header_reply(&server, json!({"code": 951, "msg": "連線逾時"})).await;

        let service = service_for(&server).await;
        let outcome = service
            .query_carrier_header(&header_request(InvoiceChannel::IPass))
            .await
            .unwrap();

        match outcome {
            HeaderQueryOutcome::Result(result) => {
                assert_eq!(result.code, 951);
                assert_eq!(result.message, "e-invoice API error: 連線逾時");
                assert_eq!(result.raw_body, Some(json!({"code": 951, "msg": "連線逾時"})));
            }
            other => panic!("expected result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_header_query_with_malformed_detail_fails() {
        let server = MockServer::start().await;
        mount_header_reply(
            &server,
            json!({"code": 200, "details": [{"invNum": "AB12345678", "amount": 10}]}),
        )
        .await;

        let service = service_for(&server).await;
        let result = service
            .query_carrier_header(&header_request(InvoiceChannel::CloudCarrier))
            .await;

        assert_eq!(result, Err(InvoiceApiError::malformed_detail(0, "invDate")));
    }

    #[tokio::test]
    async fn test_header_query_success_without_details_passes_through() {
        let server = MockServer::start().await;
        mount_header_reply(&server, json!({"code": 200, "msg": "執行成功"})).await;

        let service = service_for(&server).await;
        let outcome = service
            .query_carrier_header(&header_request(InvoiceChannel::ElectronicInvoice))
            .await
            .unwrap();

        assert!(matches!(outcome, HeaderQueryOutcome::Result(ref r) if r.code == 200));
    }

    #[tokio::test]
    async fn test_header_query_placeholder_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(" \n"))
            .mount(&server)
            .await;

        let service = service_for(&server).await;
        let outcome = service
            .query_carrier_header(&header_request(InvoiceChannel::CloudCarrier))
            .await
            .unwrap();

        assert_eq!(outcome, HeaderQueryOutcome::Result(NormalizedResult::no_response()));
    }
}
