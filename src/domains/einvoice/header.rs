use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::domains::einvoice::channel::InvoiceChannel;
use crate::domains::einvoice::error_handling::InvoiceApiError;
use crate::domains::einvoice::models::{code_from_value, CanonicalInvoiceLine, ProviderResponse};
use crate::utils::{format_slash_date, roc_to_gregorian};

/// Flattens the `details` of a successful header query into canonical lines.
///
/// All-or-nothing: the first malformed entry fails the whole call and no
/// lines are returned, so downstream reconciliation never sees a partial set.
pub fn normalize(
    response: &ProviderResponse,
    channel: InvoiceChannel,
) -> Result<Vec<CanonicalInvoiceLine>, InvoiceApiError> {
    match &response.details {
        Some(details) => normalize_details(details, channel),
        None => Ok(Vec::new()),
    }
}

pub fn normalize_details(
    details: &Value,
    channel: InvoiceChannel,
) -> Result<Vec<CanonicalInvoiceLine>, InvoiceApiError> {
    let entries = details
        .as_array()
        .ok_or_else(|| InvoiceApiError::malformed_detail(0, "details is not a list"))?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| normalize_entry(index, entry, channel))
        .collect()
}

fn normalize_entry(
    index: usize,
    entry: &Value,
    channel: InvoiceChannel,
) -> Result<CanonicalInvoiceLine, InvoiceApiError> {
    let fields = entry
        .as_object()
        .ok_or_else(|| InvoiceApiError::malformed_detail(index, "entry is not an object"))?;

    let invoice_number = fields
        .get("invNum")
        .and_then(text_of)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| InvoiceApiError::malformed_detail(index, "invNum"))?;

    let amount = fields
        .get("amount")
        .and_then(decimal_of)
        .ok_or_else(|| InvoiceApiError::malformed_detail(index, "amount"))?;

    let inv_date = fields
        .get("invDate")
        .and_then(Value::as_object)
        .ok_or_else(|| InvoiceApiError::malformed_detail(index, "invDate"))?;
    let roc_year = date_part(inv_date, "year", index)?;
    let month = date_part(inv_date, "month", index)?;
    let day = date_part(inv_date, "date", index)?;

    let invoice_date = u32::try_from(month)
        .ok()
        .zip(u32::try_from(day).ok())
        .and_then(|(m, d)| roc_to_gregorian(i32::try_from(roc_year).ok()?, m, d))
        .map(format_slash_date)
        .ok_or_else(|| InvoiceApiError::malformed_detail(index, "invDate out of range"))?;

    Ok(CanonicalInvoiceLine {
        store_name: optional_text(fields, "sellerName"),
        store_ban: optional_text(fields, "sellerBan"),
        invoice_number,
        channel,
        amount,
        invoice_date,
        invoice_time: optional_text(fields, "invoiceTime"),
        buyer_ban: optional_text(fields, "buyerBan"),
    })
}

fn date_part(inv_date: &Map<String, Value>, key: &str, index: usize) -> Result<i64, InvoiceApiError> {
    inv_date
        .get(key)
        .and_then(code_from_value)
        .ok_or_else(|| InvoiceApiError::malformed_detail(index, format!("invDate.{}", key)))
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn optional_text(fields: &Map<String, Value>, key: &str) -> String {
    fields.get(key).and_then(text_of).unwrap_or_default()
}

fn decimal_of(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(details: Value) -> ProviderResponse {
        serde_json::from_value(json!({"code": 200, "msg": "執行成功", "details": details})).unwrap()
    }

    fn sample_detail() -> Value {
        json!({
            "sellerName": "A",
            "sellerBan": "123",
            "invNum": "AB12345678",
            "amount": 100,
            "invDate": {"year": 113, "month": 3, "date": 15},
            "invoiceTime": "10:00:00",
            "buyerBan": "456"
        })
    }

    #[test]
    fn test_normalize_maps_fields_and_converts_roc_date() {
        let lines = normalize(&response(json!([sample_detail()])), InvoiceChannel::CloudCarrier).unwrap();

        assert_eq!(
            lines,
            vec![CanonicalInvoiceLine {
                store_name: "A".to_string(),
                store_ban: "123".to_string(),
                invoice_number: "AB12345678".to_string(),
                channel: InvoiceChannel::CloudCarrier,
                amount: Decimal::from(100),
                invoice_date: "2024/03/15".to_string(),
                invoice_time: "10:00:00".to_string(),
                buyer_ban: "456".to_string(),
            }]
        );
    }

    #[test]
    fn test_normalize_accepts_string_amounts_and_date_parts() {
        let mut detail = sample_detail();
        detail["amount"] = json!("85.5");
        detail["invDate"] = json!({"year": "112", "month": "12", "date": "1"});

        let lines = normalize(&response(json!([detail])), InvoiceChannel::EasyCard).unwrap();
        assert_eq!(lines[0].amount, Decimal::new(855, 1));
        assert_eq!(lines[0].invoice_date, "2023/12/01");
    }

    #[test]
    fn test_missing_date_part_fails_whole_call() {
        let mut broken = sample_detail();
        broken["invDate"] = json!({"year": 113, "month": 3});

        let result = normalize(&response(json!([sample_detail(), broken, sample_detail()])), InvoiceChannel::IPass);

        assert_eq!(result, Err(InvoiceApiError::malformed_detail(1, "invDate.date")));
    }

    #[test]
    fn test_missing_amount_is_malformed() {
        let mut broken = sample_detail();
        broken.as_object_mut().unwrap().remove("amount");

        let result = normalize(&response(json!([broken])), InvoiceChannel::CloudCarrier);
        assert_eq!(result, Err(InvoiceApiError::malformed_detail(0, "amount")));
    }

    #[test]
    fn test_impossible_date_is_malformed() {
        let mut broken = sample_detail();
        broken["invDate"] = json!({"year": 113, "month": 2, "date": 30});

        let result = normalize(&response(json!([broken])), InvoiceChannel::CloudCarrier);
        assert!(matches!(result, Err(InvoiceApiError::MalformedDetail { index: 0, .. })));
    }

    #[test]
    fn test_absent_details_yield_no_lines() {
        let bare: ProviderResponse = serde_json::from_value(json!({"code": 200})).unwrap();
        assert!(normalize(&bare, InvoiceChannel::CloudCarrier).unwrap().is_empty());
    }

    #[test]
    fn test_non_list_details_are_malformed() {
        let result = normalize(&response(json!({"invNum": "AB12345678"})), InvoiceChannel::CloudCarrier);
        assert!(matches!(result, Err(InvoiceApiError::MalformedDetail { .. })));
    }
}
