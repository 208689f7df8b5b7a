//! Field value variants for schema-independent record transfer.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Number, Value as Json};

use super::item::DataItem;

/// A single field value inside a [`DataItem`].
///
/// Numeric variants carry the *narrowest* type that losslessly represents
/// the source value (or the source's original precision class if it arrived
/// already typed). Date/time values distinguish explicitly-UTC-tagged
/// timestamps from untagged ones so serialization can reproduce the "Z"
/// suffix only where the source guaranteed UTC.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent/unknown value.
    Null,

    /// Boolean value.
    Bool(bool),

    /// 32-bit signed integer.
    Int32(i32),

    /// 64-bit signed integer (values outside 32-bit range).
    Int64(i64),

    /// 64-bit floating point.
    Float64(f64),

    /// Fixed-point decimal. Serializes through a double-precision path;
    /// the precision loss is a documented trade-off of the text formats.
    Decimal(Decimal),

    /// Text value.
    String(String),

    /// Timestamp with no timezone information.
    DateTime(NaiveDateTime),

    /// Timestamp explicitly tagged as UTC by the source.
    DateTimeUtc(DateTime<Utc>),

    /// Ordered sequence; elements may be heterogeneous, including nulls,
    /// nested items, and nested arrays.
    Array(Vec<Value>),

    /// Nested child record. Untyped key→value maps share this variant —
    /// [`DataItem`] is the ordered map type.
    Item(DataItem),
}

impl Value {
    /// Create an integer value with the narrowest lossless representation.
    #[must_use]
    pub fn from_i64(v: i64) -> Self {
        match i32::try_from(v) {
            Ok(v) => Value::Int32(v),
            Err(_) => Value::Int64(v),
        }
    }

    /// Check if this value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The integer content widened to 64 bits, if this is an integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// The string content, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a JSON value per the canonical serialization contract:
    /// integers never gain a decimal point (32- and 64-bit alike), floats
    /// keep a decimal/exponent form, decimals pass through `f64`, date/time
    /// values become ISO-8601 strings ("Z" suffix only for UTC-tagged
    /// values), arrays keep order and nulls, nested items become objects.
    #[must_use]
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(v) => Json::Bool(*v),
            Value::Int32(v) => Json::Number(Number::from(*v)),
            Value::Int64(v) => Json::Number(Number::from(*v)),
            Value::Float64(v) => float_to_json(*v),
            Value::Decimal(v) => float_to_json(v.to_f64().unwrap_or(f64::NAN)),
            Value::String(s) => Json::String(s.clone()),
            Value::DateTime(dt) => Json::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            Value::DateTimeUtc(dt) => {
                Json::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Item(item) => item.to_json(),
        }
    }

    /// Build a value from a JSON value, choosing the narrowest lossless
    /// numeric type: integers in 32-bit range become `Int32`, larger
    /// integers `Int64`, anything fractional `Float64`.
    #[must_use]
    pub fn from_json(json: &Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(v) => Value::Bool(*v),
            Json::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Value::from_i64(v)
                } else {
                    Value::Float64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
            Json::Object(map) => Value::Item(DataItem::from_json_object(map)),
        }
    }

    /// Render the value as plain text (used for id stringification and CSV
    /// cells). Nested values are rendered as embedded JSON.
    #[must_use]
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Float64(v) => v.to_string(),
            Value::Decimal(v) => v.to_string(),
            Value::String(s) => s.clone(),
            Value::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            Value::DateTimeUtc(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            Value::Array(_) | Value::Item(_) => self.to_json().to_string(),
        }
    }
}

fn float_to_json(v: f64) -> Json {
    Number::from_f64(v).map_or(Json::Null, Json::Number)
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::from_i64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTimeUtc(v)
    }
}

impl From<DataItem> for Value {
    fn from(v: DataItem) -> Self {
        Value::Item(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use std::str::FromStr;

    #[test]
    fn test_from_i64_picks_narrowest_type() {
        assert_eq!(Value::from_i64(42), Value::Int32(42));
        assert_eq!(Value::from_i64(i64::from(i32::MAX)), Value::Int32(i32::MAX));
        assert_eq!(
            Value::from_i64(i64::from(i32::MAX) + 1),
            Value::Int64(i64::from(i32::MAX) + 1)
        );
        assert_eq!(Value::from_i64(i64::MIN), Value::Int64(i64::MIN));
    }

    #[test]
    fn test_int64_serializes_without_decimal_point() {
        let v = Value::Int64(9_007_199_254_740_993); // not representable in f64
        let text = v.to_json().to_string();
        assert_eq!(text, "9007199254740993");
        assert!(!text.contains('.'));
    }

    #[test]
    fn test_int64_round_trips_exactly() {
        let original = 9_007_199_254_740_993i64;
        let json = Value::Int64(original).to_json();
        let back = Value::from_json(&json);
        assert_eq!(back.as_i64(), Some(original));
    }

    #[test]
    fn test_float_keeps_decimal_form() {
        let text = Value::Float64(2.0).to_json().to_string();
        assert_eq!(text, "2.0");
    }

    #[test]
    fn test_decimal_serializes_through_double() {
        let d = Decimal::from_str("12.5").unwrap();
        assert_eq!(Value::Decimal(d).to_json(), serde_json::json!(12.5));
    }

    #[test]
    fn test_datetime_utc_gets_z_suffix() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let json = Value::DateTimeUtc(dt).to_json();
        assert_eq!(json, Json::String("2024-03-01T12:30:00Z".to_string()));
    }

    #[test]
    fn test_naive_datetime_has_no_offset() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        let json = Value::DateTime(dt).to_json();
        assert_eq!(json, Json::String("2024-03-01T12:30:00".to_string()));
    }

    #[test]
    fn test_from_json_narrows_numbers() {
        assert_eq!(Value::from_json(&serde_json::json!(7)), Value::Int32(7));
        assert_eq!(
            Value::from_json(&serde_json::json!(4_000_000_000i64)),
            Value::Int64(4_000_000_000)
        );
        assert_eq!(
            Value::from_json(&serde_json::json!(1.5)),
            Value::Float64(1.5)
        );
    }

    #[test]
    fn test_array_preserves_order_and_nulls() {
        let v = Value::Array(vec![Value::Int32(1), Value::Null, Value::from("x")]);
        assert_eq!(v.to_json().to_string(), r#"[1,null,"x"]"#);
    }

    #[test]
    fn test_display_string_for_scalars() {
        assert_eq!(Value::Int32(5).to_display_string(), "5");
        assert_eq!(Value::from("X").to_display_string(), "X");
        assert_eq!(Value::Bool(true).to_display_string(), "true");
        assert_eq!(Value::Null.to_display_string(), "");
    }
}
