use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::domains::einvoice::channel::InvoiceChannel;
use crate::domains::einvoice::error_handling::InvoiceApiError;

/// Normalized code for "no usable response".
pub const TRANSPORT_ERROR_CODE: i64 = 999;
/// Authority code for a successful query.
pub const SUCCESS_CODE: i64 = 200;
pub const NO_RESPONSE_MESSAGE: &str = "no response";

// ============================================================================
// REQUEST MODELS
// ============================================================================

/// One invoice to verify against the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceQueryRequest {
    pub channel: InvoiceChannel,
    pub invoice_number: String,
    pub invoice_date: String,
    /// Four-digit random code printed on electronic invoices.
    pub random_code: Option<String>,
    /// Carrier barcode / card number for carrier channels.
    pub carrier_id: Option<String>,
    /// Carrier verification code for carrier channels.
    pub carrier_secret: Option<String>,
}

impl InvoiceQueryRequest {
    pub fn electronic(
        invoice_number: impl Into<String>,
        invoice_date: impl Into<String>,
        random_code: impl Into<String>,
    ) -> Self {
        Self {
            channel: InvoiceChannel::ElectronicInvoice,
            invoice_number: invoice_number.into(),
            invoice_date: invoice_date.into(),
            random_code: Some(random_code.into()),
            carrier_id: None,
            carrier_secret: None,
        }
    }

    pub fn carrier(
        channel: InvoiceChannel,
        invoice_number: impl Into<String>,
        invoice_date: impl Into<String>,
        carrier_id: impl Into<String>,
        carrier_secret: impl Into<String>,
    ) -> Self {
        Self {
            channel,
            invoice_number: invoice_number.into(),
            invoice_date: invoice_date.into(),
            random_code: None,
            carrier_id: Some(carrier_id.into()),
            carrier_secret: Some(carrier_secret.into()),
        }
    }
}

/// Invoice query as received from callers, before the channel is validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInvoiceQuery {
    #[serde(deserialize_with = "deserialize_lenient_i64")]
    pub channel: i64,
    pub invoice_number: String,
    pub invoice_date: String,
    #[serde(default)]
    pub random_code: Option<String>,
    #[serde(default)]
    pub carrier_id: Option<String>,
    #[serde(default)]
    pub carrier_secret: Option<String>,
}

impl TryFrom<RawInvoiceQuery> for InvoiceQueryRequest {
    type Error = InvoiceApiError;

    fn try_from(raw: RawInvoiceQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            channel: InvoiceChannel::try_from(raw.channel)?,
            invoice_number: raw.invoice_number,
            invoice_date: raw.invoice_date,
            random_code: raw.random_code,
            carrier_id: raw.carrier_id,
            carrier_secret: raw.carrier_secret,
        })
    }
}

/// Carrier header listing over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderQueryRequest {
    pub channel: InvoiceChannel,
    pub carrier_id: String,
    pub carrier_secret: String,
    /// Passed through to the authority as `startDate` (`YYYY/MM/DD`).
    pub period_start: String,
    pub period_end: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHeaderQuery {
    #[serde(deserialize_with = "deserialize_lenient_i64")]
    pub channel: i64,
    pub carrier_id: String,
    pub carrier_secret: String,
    pub period_start: String,
    pub period_end: String,
}

impl TryFrom<RawHeaderQuery> for HeaderQueryRequest {
    type Error = InvoiceApiError;

    fn try_from(raw: RawHeaderQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            channel: InvoiceChannel::try_from(raw.channel)?,
            carrier_id: raw.carrier_id,
            carrier_secret: raw.carrier_secret,
            period_start: raw.period_start,
            period_end: raw.period_end,
        })
    }
}

// ============================================================================
// BATCH MODELS
// ============================================================================

/// Caller identifiers used to join batch results back to their records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId {
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub invoice_id: String,
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub user_id: String,
}

impl RequestId {
    pub fn new(invoice_id: impl ToString, user_id: impl ToString) -> Self {
        Self {
            invoice_id: invoice_id.to_string(),
            user_id: user_id.to_string(),
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invoice:{}/user:{}", self.invoice_id, self.user_id)
    }
}

/// One scheduled record: identifiers plus the unvalidated query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    #[serde(flatten)]
    pub request_id: RequestId,
    #[serde(flatten)]
    pub query: RawInvoiceQuery,
}

/// Result of one batch entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub request_id: RequestId,
    /// Body exactly as the authority sent it; `None` when nothing was received.
    pub raw_result: Option<String>,
    /// The same classification the single-request path applies.
    pub result: NormalizedResult,
}

// ============================================================================
// RESPONSE MODELS
// ============================================================================

/// Decoded authority reply. `code` arrives as either a string or a number
/// and is normalized here, before any comparison runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    #[serde(deserialize_with = "deserialize_code")]
    pub code: i64,
    #[serde(default, deserialize_with = "deserialize_lenient_string_opt")]
    pub msg: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Ok,
    TransportError,
}

/// Uniform outward-facing result for every authority call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResult {
    pub code: i64,
    pub message: String,
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// How callers should branch on a `NormalizedResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    BusinessError(i64),
    TransportError,
}

impl NormalizedResult {
    pub fn transport_error(message: impl Into<String>) -> Self {
        Self {
            code: TRANSPORT_ERROR_CODE,
            message: message.into(),
            status: ResultStatus::TransportError,
            raw_body: None,
            details: None,
        }
    }

    pub fn no_response() -> Self {
        Self::transport_error(NO_RESPONSE_MESSAGE)
    }

    /// Wraps a decoded reply verbatim; business codes are preserved.
    pub fn from_provider(response: ProviderResponse, raw_body: Value) -> Self {
        Self {
            code: response.code,
            message: response.msg.unwrap_or_default(),
            status: ResultStatus::Ok,
            raw_body: Some(raw_body),
            details: response.details,
        }
    }

    pub fn with_raw_body(mut self, raw_body: Value) -> Self {
        self.raw_body = Some(raw_body);
        self
    }

    pub fn outcome(&self) -> Outcome {
        match self.status {
            ResultStatus::TransportError => Outcome::TransportError,
            ResultStatus::Ok if self.code == SUCCESS_CODE => Outcome::Success,
            ResultStatus::Ok => Outcome::BusinessError(self.code),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome() == Outcome::Success
    }
}

/// Invoice line extracted from a carrier header query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalInvoiceLine {
    pub store_name: String,
    pub store_ban: String,
    pub invoice_number: String,
    #[serde(rename = "type")]
    pub channel: InvoiceChannel,
    pub amount: Decimal,
    /// `YYYY/MM/DD` in the Gregorian calendar.
    pub invoice_date: String,
    pub invoice_time: String,
    pub buyer_ban: String,
}

/// A header query either yields invoice lines or an authority/transport result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HeaderQueryOutcome {
    Lines(Vec<CanonicalInvoiceLine>),
    Result(NormalizedResult),
}

// ============================================================================
// LENIENT DESERIALIZERS
// ============================================================================

/// Integer from a JSON number or a numeric string.
pub fn code_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn deserialize_code<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Value::deserialize(deserializer)?;
    code_from_value(&value).ok_or_else(|| D::Error::custom(format!("invalid code: {}", value)))
}

fn deserialize_lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Value::deserialize(deserializer)?;
    code_from_value(&value).ok_or_else(|| D::Error::custom(format!("expected an integer, got {}", value)))
}

fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("expected a string or number, got {}", other))),
    }
}

fn deserialize_lenient_string_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_code_accepts_string_and_number() {
        let numeric: ProviderResponse = serde_json::from_value(json!({"code": 200, "msg": "ok"})).unwrap();
        let textual: ProviderResponse = serde_json::from_value(json!({"code": "200", "msg": "ok"})).unwrap();

        assert_eq!(numeric.code, 200);
        assert_eq!(numeric.code, textual.code);
    }

    #[test]
    fn test_provider_response_keeps_unknown_fields() {
        let response: ProviderResponse = serde_json::from_value(json!({
            "code": 200,
            "msg": "執行成功",
            "invStatus": "已確認",
            "sellerName": "全家便利商店"
        }))
        .unwrap();

        assert_eq!(response.extra.get("invStatus"), Some(&json!("已確認")));
        assert!(response.details.is_none());
    }

    #[test]
    fn test_provider_code_rejects_non_numeric() {
        let parsed: Result<ProviderResponse, _> = serde_json::from_value(json!({"code": "error"}));
        assert!(parsed.is_err());

        let missing: Result<ProviderResponse, _> = serde_json::from_value(json!({"msg": "hi"}));
        assert!(missing.is_err());
    }

    #[test]
    fn test_outcome_branches() {
        let success = NormalizedResult::from_provider(
            serde_json::from_value(json!({"code": 200})).unwrap(),
            json!({"code": 200}),
        );
        assert_eq!(success.outcome(), Outcome::Success);

        let business = NormalizedResult::from_provider(
            serde_json::from_value(json!({"code": "903", "msg": "參數錯誤"})).unwrap(),
            json!({"code": "903", "msg": "參數錯誤"}),
        );
        assert_eq!(business.outcome(), Outcome::BusinessError(903));
        assert_eq!(business.message, "參數錯誤");

        assert_eq!(NormalizedResult::no_response().outcome(), Outcome::TransportError);
    }

    #[test]
    fn test_transport_error_serializes_compactly() {
        let value = serde_json::to_value(NormalizedResult::no_response()).unwrap();
        assert_eq!(
            value,
            json!({"code": 999, "message": "no response", "status": "transport_error"})
        );
    }

    #[test]
    fn test_invoice_record_flattens_ids_and_query() {
        let record: InvoiceRecord = serde_json::from_value(json!({
            "invoice_id": 42,
            "user_id": "u-7",
            "channel": "2",
            "invoice_number": "AB12345678",
            "invoice_date": "2024-03-15",
            "carrier_id": "/ABC+123",
            "carrier_secret": "secret"
        }))
        .unwrap();

        assert_eq!(record.request_id, RequestId::new(42, "u-7"));
        assert_eq!(record.query.channel, 2);

        let request = InvoiceQueryRequest::try_from(record.query).unwrap();
        assert_eq!(request.channel, InvoiceChannel::CloudCarrier);
    }

    #[test]
    fn test_raw_query_with_unknown_channel_fails_conversion() {
        let raw = RawInvoiceQuery {
            channel: 8,
            invoice_number: "AB12345678".to_string(),
            invoice_date: "2024-03-15".to_string(),
            random_code: None,
            carrier_id: None,
            carrier_secret: None,
        };

        assert_eq!(
            InvoiceQueryRequest::try_from(raw),
            Err(InvoiceApiError::unsupported_channel(8))
        );
    }
}
