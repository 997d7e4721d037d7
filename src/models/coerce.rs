//! Null-safe field coercion
//!
//! Upstream producers are loose with types: numbers arrive as strings, flags
//! as `0`/`1`, timestamps as empty strings. These deserializers normalise the
//! loose forms to a zero value instead of failing the whole record.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Integer that may be a number, a numeric string, `""`, `null`, or absent.
/// Anything that is not a number, or does not fit in an `i32`, becomes `0`.
pub fn lenient_i32<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(value_as_i64)
        .and_then(|v| i32::try_from(v).ok())
        .unwrap_or(0))
}

/// Like [`lenient_i32`] but keeps "no value" distinct from zero.
pub fn lenient_opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_i64))
}

/// Boolean that may also be `0`/`1` or `"true"`/`"false"`/`"1"`/`"0"`.
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_i64().map(|v| v != 0).unwrap_or(false),
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "y"),
        _ => false,
    })
}

/// String where `""` and `null` both mean "absent". Numbers are stringified.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => non_empty(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Any `Default` value where `null` is accepted as "use the default".
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Timestamp from an RFC3339 string, a `YYYY-MM-DD HH:MM:SS` string, a plain
/// date, or epoch milliseconds/microseconds. Empty or unparseable input is
/// `None`.
pub fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => parse_timestamp(&s),
        Some(Value::Number(n)) => n.as_i64().and_then(epoch_to_datetime),
        _ => None,
    })
}

/// Parse a textual timestamp, returning `None` for empty or malformed input.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&ts));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|ts| Utc.from_utc_datetime(&ts));
    }

    tracing::warn!(value = raw, "Unparseable timestamp, leaving field empty");
    None
}

/// Trim a string, mapping blank input to `None`.
pub fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

// Debezium encodes timestamps as epoch millis or micros depending on column
// precision; anything past year ~5000 in millis is treated as micros.
fn epoch_to_datetime(value: i64) -> Option<DateTime<Utc>> {
    if value.abs() >= 100_000_000_000_000 {
        DateTime::from_timestamp_micros(value)
    } else {
        DateTime::from_timestamp_millis(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "lenient_i32")]
        count: i32,
        #[serde(default, deserialize_with = "lenient_bool")]
        flag: bool,
        #[serde(default, deserialize_with = "lenient_string")]
        name: Option<String>,
        #[serde(default, deserialize_with = "lenient_timestamp")]
        at: Option<DateTime<Utc>>,
    }

    fn sample(json: &str) -> Sample {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_lenient_i32_forms() {
        assert_eq!(sample(r#"{"count": 1}"#).count, 1);
        assert_eq!(sample(r#"{"count": "12"}"#).count, 12);
        assert_eq!(sample(r#"{}"#).count, 0);
        assert_eq!(sample(r#"{"count": null}"#).count, 0);
        assert_eq!(sample(r#"{"count": ""}"#).count, 0);
        assert_eq!(sample(r#"{"count": "n/a"}"#).count, 0);
    }

    #[test]
    fn test_lenient_i32_out_of_range_is_zero() {
        assert_eq!(sample(r#"{"count": 4294967297}"#).count, 0);
        assert_eq!(sample(r#"{"count": 3000000000}"#).count, 0);
        assert_eq!(sample(r#"{"count": "-3000000000"}"#).count, 0);
        assert_eq!(sample(r#"{"count": 2147483647}"#).count, i32::MAX);
    }

    #[test]
    fn test_lenient_bool_forms() {
        assert!(sample(r#"{"flag": true}"#).flag);
        assert!(sample(r#"{"flag": 1}"#).flag);
        assert!(sample(r#"{"flag": "1"}"#).flag);
        assert!(!sample(r#"{"flag": "0"}"#).flag);
        assert!(!sample(r#"{"flag": null}"#).flag);
    }

    #[test]
    fn test_lenient_string_blank_is_none() {
        assert_eq!(sample(r#"{"name": "  "}"#).name, None);
        assert_eq!(sample(r#"{"name": " Acme "}"#).name.as_deref(), Some("Acme"));
        assert_eq!(sample(r#"{"name": 42}"#).name.as_deref(), Some("42"));
    }

    #[test]
    fn test_timestamp_forms() {
        let rfc = sample(r#"{"at": "2024-01-15T10:30:00+07:00"}"#).at.unwrap();
        assert_eq!(rfc.to_rfc3339(), "2024-01-15T03:30:00+00:00");

        let plain = sample(r#"{"at": "2024-01-15 10:30:00"}"#).at.unwrap();
        assert_eq!(plain.day(), 15);

        let millis = sample(r#"{"at": 1705314600000}"#).at.unwrap();
        assert_eq!(millis.year(), 2024);

        let micros = sample(r#"{"at": 1705314600000000}"#).at.unwrap();
        assert_eq!(micros, millis);
    }

    #[test]
    fn test_empty_or_bad_timestamp_is_none() {
        assert!(sample(r#"{"at": ""}"#).at.is_none());
        assert!(sample(r#"{"at": "not a date"}"#).at.is_none());
        assert!(sample(r#"{"at": null}"#).at.is_none());
        assert!(sample(r#"{}"#).at.is_none());
    }
}
