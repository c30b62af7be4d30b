// ROC calendar helpers used when building authority payloads
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// Gregorian year minus this offset gives the ROC (Minguo) year.
pub const ROC_YEAR_OFFSET: i32 = 1911;

/// Parses an invoice date as supplied by callers.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYYMMDD`, RFC 3339 and
/// `YYYY-MM-DD HH:MM:SS`. Dates before the first ROC year are rejected.
pub fn parse_invoice_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    let parsed = if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        Some(dt.date_naive())
    } else {
        let date_formats = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];
        let datetime_formats = ["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

        date_formats
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
            .or_else(|| {
                datetime_formats
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                    .map(|dt| dt.date())
            })
    };

    parsed.filter(|date| date.year() > ROC_YEAR_OFFSET)
}

/// Bimonthly filing-period code, e.g. `2024-03-15` -> `11304`.
///
/// Periods are labelled by their even closing month, so odd months roll
/// forward by one.
pub fn tax_period(date: NaiveDate) -> String {
    let roc_year = date.year() - ROC_YEAR_OFFSET;
    let month = date.month();
    let period_month = if month % 2 == 1 { month + 1 } else { month };

    format!("{}{:02}", roc_year, period_month)
}

/// `YYYY/MM/DD`, the date layout the authority expects and returns.
pub fn format_slash_date(date: NaiveDate) -> String {
    date.format("%Y/%m/%d").to_string()
}

/// Converts ROC year/month/day parts into a Gregorian date.
pub fn roc_to_gregorian(roc_year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(roc_year + ROC_YEAR_OFFSET, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_tax_period_advances_odd_month() {
        assert_eq!(tax_period(date(2024, 3, 15)), "11304");
    }

    #[test]
    fn test_tax_period_keeps_even_month() {
        assert_eq!(tax_period(date(2024, 4, 1)), "11304");
        assert_eq!(tax_period(date(2023, 12, 31)), "11212");
    }

    #[test]
    fn test_tax_period_first_and_last_periods() {
        assert_eq!(tax_period(date(2024, 1, 5)), "11302");
        assert_eq!(tax_period(date(2024, 11, 30)), "11312");
    }

    #[test]
    fn test_tax_period_two_digit_roc_year() {
        assert_eq!(tax_period(date(2010, 7, 1)), "9908");
    }

    #[test]
    fn test_parse_invoice_date_formats() {
        let expected = date(2024, 3, 15);
        assert_eq!(parse_invoice_date("2024-03-15"), Some(expected));
        assert_eq!(parse_invoice_date("2024/03/15"), Some(expected));
        assert_eq!(parse_invoice_date("20240315"), Some(expected));
        assert_eq!(parse_invoice_date("2024-03-15 10:22:01"), Some(expected));
        assert_eq!(parse_invoice_date("2024-03-15T10:22:01+08:00"), Some(expected));
    }

    #[test]
    fn test_parse_invoice_date_rejects_garbage() {
        assert_eq!(parse_invoice_date(""), None);
        assert_eq!(parse_invoice_date("15/03/2024"), None);
        assert_eq!(parse_invoice_date("2024-02-30"), None);
        assert_eq!(parse_invoice_date("1900-01-01"), None);
    }

    #[test]
    fn test_roc_to_gregorian() {
        assert_eq!(roc_to_gregorian(113, 3, 15), Some(date(2024, 3, 15)));
        assert_eq!(roc_to_gregorian(113, 13, 1), None);
        assert_eq!(format_slash_date(date(2024, 3, 5)), "2024/03/05");
    }
}
