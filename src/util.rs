// Utility helpers for parsing, rounding and number formatting.
//
// Raw CSV cells arrive as optional strings; everything in here turns them
// into typed values or `None` so the loader never has to look at text.
use chrono::{NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Trim a cell and collapse blanks to `None`.
pub fn clean_text(s: Option<String>) -> Option<String> {
    let s = s?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a lead creation timestamp. Bare dates are taken as midnight.
pub fn parse_datetime_safe(s: Option<&str>) -> Option<NaiveDateTime> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    parse_date_safe(Some(s)).and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Round half away from zero to `decimals` places.
pub fn round_to(n: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (n * factor).round() / factor
}

/// `part / whole` as a percentage rounded to two decimals, or `None` when
/// `whole` is zero.
pub fn percent_of(part: f64, whole: f64) -> Option<f64> {
    if whole == 0.0 {
        return None;
    }
    let pct = part / whole * 100.0;
    pct.is_finite().then(|| round_to(pct, 2))
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals with locale-aware thousands separators (`1,234.50`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_val: i64 = parts.next().unwrap_or("0").parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = parts.next() {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_timestamp_shapes() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .and_then(|d| d.and_hms_opt(14, 30, 0))
            .unwrap();
        assert_eq!(parse_datetime_safe(Some("2024-03-05 14:30:00")), Some(expected));
        assert_eq!(parse_datetime_safe(Some("2024-03-05T14:30:00")), Some(expected));
        assert_eq!(parse_datetime_safe(Some("05/03/2024 14:30")), Some(expected));
        assert_eq!(
            parse_datetime_safe(Some(" 2024-03-05 ")).map(|d| d.date()),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
    }

    #[test]
    fn rejects_blank_and_garbage_dates() {
        assert_eq!(parse_datetime_safe(None), None);
        assert_eq!(parse_datetime_safe(Some("   ")), None);
        assert_eq!(parse_datetime_safe(Some("yesterday")), None);
    }

    #[test]
    fn clean_text_collapses_blanks() {
        assert_eq!(clean_text(Some("  Web ".to_string())), Some("Web".to_string()));
        assert_eq!(clean_text(Some("   ".to_string())), None);
        assert_eq!(clean_text(None), None);
    }

    #[test]
    fn percent_rounds_to_two_places() {
        assert_eq!(percent_of(2.0, 3.0), Some(66.67));
        assert_eq!(percent_of(1.0, 3.0), Some(33.33));
        assert_eq!(percent_of(1.0, 0.0), None);
    }

    #[test]
    fn formats_with_thousands_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-12.5, 1), "-12.5");
        assert_eq!(format_int(9855), "9,855");
    }
}
