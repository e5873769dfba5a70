use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%b-%Y", "%d %b %Y", "%b %d, %Y"];
const TIME_FORMATS: &[&str] = &[
    "%H:%M:%S",
    "%H:%M:%S%.f",
    "%H:%M",
    "%I:%M:%S %p",
    "%I:%M %p",
    "%I:%M:%S%p",
    "%I:%M%p",
];

/// Largest admissible count; anything above is a parse failure.
pub const MAX_COUNT: u64 = u32::MAX as u64;

/// How the loading layer encoded `initial_three_min_cnt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountEncoding {
    #[default]
    Numeric,
    /// true/false-like tokens mapped to 1/0.
    Boolean,
}

/// Trim, lowercase, and join internal whitespace runs with underscores.
/// Idempotent.
pub fn normalize_column_name(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Parse a float that may use comma as decimal separator
pub fn parse_locale_float(s: &str) -> Result<f64, std::num::ParseFloatError> {
    s.replace(',', ".").parse::<f64>()
}

/// Renders a numeric cell as text without a spurious `.0`.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Parses a calendar date. Datetime strings are accepted and their time
/// component ignored.
pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.date_naive());
    }
    let date_part = split_datetime(trimmed).map_or(trimmed, |(date, _)| date);

    if let Some(date) = parse_us_date(date_part) {
        return Ok(date);
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, format) {
            return Ok(date);
        }
    }
    // Textual month formats contain spaces, so retry on the untouched value.
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }
    Err(format!("Failed to parse date '{}'", value))
}

/// `MM/DD/YYYY` or `MM/DD/YY`, chosen by the width of the year segment.
fn parse_us_date(value: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = value.split('/').collect();
    if parts.len() != 3 || parts[0].len() > 2 {
        return None;
    }
    let format = match parts[2].len() {
        2 => "%m/%d/%y",
        4 => "%m/%d/%Y",
        _ => return None,
    };
    NaiveDate::parse_from_str(value, format).ok()
}

/// Splits `"<date>T<time>"` or `"<date> <time>"` at the first separator
/// following a digit.
fn split_datetime(value: &str) -> Option<(&str, &str)> {
    let bytes = value.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if (*b == b'T' || *b == b' ') && i > 0 && bytes[i - 1].is_ascii_digit() {
            let rest = value[i + 1..].trim();
            if rest.is_empty() {
                return None;
            }
            return Some((&value[..i], rest));
        }
    }
    None
}

/// Parses a time of day; full datetimes yield their time component.
pub fn parse_time(value: &str) -> Result<NaiveTime, String> {
    let trimmed = value.trim();
    if let Some(time) = parse_time_only(trimmed) {
        return Ok(time);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.time());
    }
    if let Some((_, time_part)) = split_datetime(trimmed) {
        if let Some(time) = parse_time_only(time_part) {
            return Ok(time);
        }
    }
    Err(format!("Failed to parse time '{}'", value))
}

fn parse_time_only(value: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
}

/// Whole, non-negative count from text. `"3.0"` is accepted, `"2.5"` and
/// `"-1"` are not.
pub fn parse_count_text(value: &str, encoding: CountEncoding) -> Result<u64, String> {
    let trimmed = value.trim();
    match encoding {
        CountEncoding::Boolean => match trimmed.to_lowercase().as_str() {
            "true" | "1" | "yes" | "t" | "y" => Ok(1),
            "false" | "0" | "no" | "f" | "n" => Ok(0),
            _ => Err(format!("Invalid boolean count value '{}'", value)),
        },
        CountEncoding::Numeric => match trimmed.parse::<u64>() {
            Ok(count) if count <= MAX_COUNT => Ok(count),
            Ok(count) => Err(format!("Count {} exceeds the maximum of {}", count, MAX_COUNT)),
            Err(_) => {
                let f_val = parse_locale_float(trimmed)
                    .map_err(|e| format!("Integer parse failed for '{}': {}", value, e))?;
                count_from_number(f_val, encoding)
            }
        },
    }
}

/// Whole, non-negative count from a numeric cell.
pub fn count_from_number(value: f64, encoding: CountEncoding) -> Result<u64, String> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        return Err(format!("Count must be a whole non-negative number, got {}", value));
    }
    match encoding {
        CountEncoding::Boolean if value > 1.0 => {
            Err(format!("Invalid boolean count value {}", value))
        }
        _ if value > MAX_COUNT as f64 => Err(format!(
            "Count {} exceeds the maximum of {}",
            value, MAX_COUNT
        )),
        _ => Ok(value as u64),
    }
}

/// Real number from text; NaN and infinities are rejected.
pub fn parse_real_text(value: &str) -> Result<f64, String> {
    let parsed = parse_locale_float(value.trim())
        .map_err(|e| format!("Float parse failed for '{}': {}", value, e))?;
    finite(parsed)
}

pub fn finite(value: f64) -> Result<f64, String> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("Non-finite value {}", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("  Common Name "), "common_name");
        assert_eq!(normalize_column_name("Initial_Three_Min_Cnt"), "initial_three_min_cnt");
        assert_eq!(normalize_column_name("ID\tMethod"), "id_method");
        assert_eq!(normalize_column_name("Site   Name"), "site_name");
    }

    #[test]
    fn test_normalize_column_name_idempotent() {
        for raw in ["  Common Name ", "DATE", "Interval  Length", "id_method", ""] {
            let once = normalize_column_name(raw);
            assert_eq!(normalize_column_name(&once), once);
        }
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
        assert_eq!(parse_date("2023-05-01").unwrap(), expected);
        assert_eq!(parse_date("2023/05/01").unwrap(), expected);
        assert_eq!(parse_date("5/1/2023").unwrap(), expected);
        assert_eq!(parse_date("05/01/23").unwrap(), expected);
        assert_eq!(parse_date("01-May-2023").unwrap(), expected);
        assert_eq!(parse_date("2023-05-01 07:30:00").unwrap(), expected);
        assert_eq!(parse_date("2023-05-01T07:30:00").unwrap(), expected);
        assert_eq!(parse_date("2023-05-01T07:30:00+02:00").unwrap(), expected);
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("").is_err());
        assert!(parse_date("N/A").is_err());
        assert!(parse_date("2023-13-01").is_err());
        assert!(parse_date("5/1/023").is_err());
    }

    #[test]
    fn test_parse_time_formats() {
        let expected = NaiveTime::from_hms_opt(7, 15, 0).unwrap();
        assert_eq!(parse_time("07:15:00").unwrap(), expected);
        assert_eq!(parse_time("7:15").unwrap(), expected);
        assert_eq!(parse_time("7:15 AM").unwrap(), expected);
        assert_eq!(parse_time("2023-05-01 07:15:00").unwrap(), expected);
        assert_eq!(
            parse_time("7:15 PM").unwrap(),
            NaiveTime::from_hms_opt(19, 15, 0).unwrap()
        );
        assert!(parse_time("morning").is_err());
    }

    #[test]
    fn test_parse_count_numeric() {
        assert_eq!(parse_count_text("3", CountEncoding::Numeric), Ok(3));
        assert_eq!(parse_count_text(" 4.0 ", CountEncoding::Numeric), Ok(4));
        assert!(parse_count_text("2.5", CountEncoding::Numeric).is_err());
        assert!(parse_count_text("-1", CountEncoding::Numeric).is_err());
        assert!(parse_count_text("N/A", CountEncoding::Numeric).is_err());
    }

    #[test]
    fn test_parse_count_rejects_oversized_values() {
        assert_eq!(parse_count_text("4294967295", CountEncoding::Numeric), Ok(MAX_COUNT));
        assert!(parse_count_text("4294967296", CountEncoding::Numeric).is_err());
        assert!(parse_count_text("18446744073709551615", CountEncoding::Numeric).is_err());
        assert!(parse_count_text("1e25", CountEncoding::Numeric).is_err());
        assert!(count_from_number(1e25, CountEncoding::Numeric).is_err());
        assert_eq!(count_from_number(MAX_COUNT as f64, CountEncoding::Numeric), Ok(MAX_COUNT));
    }

    #[test]
    fn test_parse_count_boolean() {
        assert_eq!(parse_count_text("TRUE", CountEncoding::Boolean), Ok(1));
        assert_eq!(parse_count_text("false", CountEncoding::Boolean), Ok(0));
        assert!(parse_count_text("maybe", CountEncoding::Boolean).is_err());
        assert_eq!(count_from_number(1.0, CountEncoding::Boolean), Ok(1));
        assert!(count_from_number(3.0, CountEncoding::Boolean).is_err());
    }

    #[test]
    fn test_parse_real_text() {
        assert_eq!(parse_real_text("21,5"), Ok(21.5));
        assert_eq!(parse_real_text(" 18 "), Ok(18.0));
        assert!(parse_real_text("NaN").is_err());
        assert!(parse_real_text("warm").is_err());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(2.5), "2.5");
    }
}
