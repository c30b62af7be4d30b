use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

use crate::domains::einvoice::channel::{Endpoint, InvoiceChannel};
use crate::domains::einvoice::error_handling::InvoiceApiError;
use crate::domains::einvoice::models::{HeaderQueryRequest, InvoiceQueryRequest};
use crate::utils::{format_slash_date, parse_invoice_date, tax_period};

pub const API_VERSION: &str = "0.5";

/// Forward skew applied to carrier timestamps.
const CARRIER_SKEW_SECONDS: i64 = 3600;
/// Expiry window for electronic-invoice header queries.
const BARCODE_HEADER_EXPIRY_SECONDS: i64 = 1000;

/// Parameters whose values never reach the logs.
const MASKED_KEYS: [&str; 1] = ["cardEncrypt"];

// ============================================================================
// CLOCK
// ============================================================================

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// ============================================================================
// PARAMETER SET
// ============================================================================

/// Ordered key/value pairs sent as the form body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterSet(Vec<(&'static str, String)>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &'static str, value: impl ToString) {
        self.0.push((key, value.to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|(k, _)| *k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Log-safe rendering with secrets masked.
    pub fn masked(&self) -> MaskedParameters<'_> {
        MaskedParameters(self)
    }
}

impl Serialize for ParameterSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(self.0.iter().map(|(k, v)| (*k, v)))
    }
}

pub struct MaskedParameters<'a>(&'a ParameterSet);

impl fmt::Display for MaskedParameters<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if MASKED_KEYS.contains(&key) {
                write!(f, "{}=***", key)?;
            } else {
                write!(f, "{}={}", key, value)?;
            }
        }
        write!(f, "}}")
    }
}

/// Endpoint plus body for one authority call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub channel: InvoiceChannel,
    pub endpoint: Endpoint,
    pub parameters: ParameterSet,
}

// ============================================================================
// PARAMETER BUILDER
// ============================================================================

/// Maps invoice records onto the authority's per-channel parameter shapes.
#[derive(Debug, Clone, Default)]
pub struct ParameterBuilder {
    app_id: String,
    header_app_id: String,
}

impl ParameterBuilder {
    pub fn new(app_id: impl Into<String>, header_app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            header_app_id: header_app_id.into(),
        }
    }

    /// Builds an invoice detail query.
    pub fn build(
        &self,
        request: &InvoiceQueryRequest,
        now: DateTime<Utc>,
    ) -> Result<PreparedRequest, InvoiceApiError> {
        let invoice_date = parse_invoice_date(&request.invoice_date).ok_or_else(|| {
            InvoiceApiError::InvalidDate {
                value: request.invoice_date.clone(),
            }
        })?;
        let formatted_date = format_slash_date(invoice_date);
        let nonce = now.timestamp();

        let mut parameters = ParameterSet::new();
        match request.channel.carrier_card_type() {
            None => {
                parameters.push("version", API_VERSION);
                parameters.push("type", "Barcode");
                parameters.push("invNum", &request.invoice_number);
                parameters.push("action", "qryInvDetail");
                parameters.push("generation", "V2");
                parameters.push("invTerm", tax_period(invoice_date));
                parameters.push("invDate", formatted_date);
                parameters.push("UUID", nonce);
                parameters.push("randomNumber", required(request.random_code.as_deref(), request.channel, "randomNumber")?);
                parameters.push("appID", &self.app_id);
            }
            Some(card_type) => {
                let card_no = required(request.carrier_id.as_deref(), request.channel, "cardNo")?;
                let card_encrypt = required(request.carrier_secret.as_deref(), request.channel, "cardEncrypt")?;
                // Both timestamps use the same forward-shifted instant.
                let shifted = (now + Duration::seconds(CARRIER_SKEW_SECONDS)).timestamp();

                parameters.push("version", API_VERSION);
                parameters.push("cardType", card_type);
                parameters.push("cardNo", card_no);
                parameters.push("expTimeStamp", shifted);
                parameters.push("action", "carrierInvDetail");
                parameters.push("timeStamp", shifted);
                parameters.push("invNum", &request.invoice_number);
                parameters.push("invDate", formatted_date);
                parameters.push("uuid", nonce);
                parameters.push("appID", &self.app_id);
                parameters.push("cardEncrypt", card_encrypt);
            }
        }

        Ok(PreparedRequest {
            channel: request.channel,
            endpoint: request.channel.detail_endpoint(),
            parameters,
        })
    }

    /// Builds a carrier header (invoice listing) query.
    pub fn build_header(&self, request: &HeaderQueryRequest, now: DateTime<Utc>) -> PreparedRequest {
        let (exp_timestamp, timestamp, uuid) = match request.channel {
            InvoiceChannel::ElectronicInvoice => {
                let now_ts = now.timestamp();
                (now_ts + BARCODE_HEADER_EXPIRY_SECONDS, now_ts, now_ts)
            }
            _ => {
                let shifted = (now + Duration::seconds(CARRIER_SKEW_SECONDS)).timestamp();
                (shifted, shifted, shifted)
            }
        };

        let mut parameters = ParameterSet::new();
        parameters.push("version", API_VERSION);
        parameters.push("cardType", request.channel.header_card_type());
        parameters.push("cardNo", &request.carrier_id);
        parameters.push("expTimeStamp", exp_timestamp);
        parameters.push("action", "carrierInvChk");
        parameters.push("timeStamp", timestamp);
        parameters.push("startDate", &request.period_start);
        parameters.push("endDate", &request.period_end);
        parameters.push("onlyWinningInv", "N");
        parameters.push("uuid", uuid);
        parameters.push("appID", &self.header_app_id);
        parameters.push("cardEncrypt", &request.carrier_secret);

        PreparedRequest {
            channel: request.channel,
            endpoint: Endpoint::InvServ,
            parameters,
        }
    }
}

/// Channel identity material must be present and non-blank.
fn required<'a>(
    value: Option<&'a str>,
    channel: InvoiceChannel,
    field: &'static str,
) -> Result<&'a str, InvoiceApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(InvoiceApiError::MissingField { channel, field })
}
