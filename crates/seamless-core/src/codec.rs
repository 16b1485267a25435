//! Wire codec: JSON text with a tagged envelope for timestamps.
//!
//! ```text
//! Value::Timestamp(2024-03-01T12:30:00Z)  <->  {"__type":"Date","value":"2024-03-01T12:30:00Z"}
//! ```

use crate::config::ProtocolConfig;
use crate::error::{Result, RpcError};
use crate::value::Value;
use tracing::debug;

/// Encode a value as wire text.
///
/// Fails with `SERIALIZATION_ERROR` when the value cannot be represented in JSON:
/// non-finite numbers, timestamps outside years 0..=9999, or nesting beyond the
/// depth limit. Nothing is truncated.
pub fn encode(value: &Value) -> Result<String> {
    let json = value.to_json().map_err(|e| {
        RpcError::serialization(format!("Failed to serialize value: {}", e.message))
            .with_context("originalValue", value.type_name())
    })?;

    serde_json::to_string(&json).map_err(|e| {
        RpcError::serialization(format!("Failed to serialize value: {}", e))
            .with_context("originalValue", value.type_name())
    })
}

/// Decode wire text into a value, reviving timestamp envelopes.
///
/// Fails with `DESERIALIZATION_ERROR`; the error context carries at most
/// [`ProtocolConfig::MAX_ERROR_CONTEXT_CHARS`] characters of the offending text.
pub fn decode(text: &str) -> Result<Value> {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(json) => Ok(Value::from_json(json)),
        Err(e) => {
            debug!("Rejected malformed wire text ({} bytes): {}", text.len(), e);
            Err(
                RpcError::deserialization(format!("Failed to deserialize JSON: {}", e))
                    .with_context("json", error_prefix(text)),
            )
        }
    }
}

/// Leading characters of `text`, bounded for error payloads.
pub fn error_prefix(text: &str) -> String {
    text.chars()
        .take(ProtocolConfig::MAX_ERROR_CONTEXT_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::value::{Map, Timestamp};
    use chrono::{TimeZone, Utc};

    fn nested_value() -> Value {
        let created: Timestamp = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let precise: Timestamp = Utc.timestamp_nanos(1_700_000_000_123_456_789);

        let mut stats = Map::new();
        stats.insert("postsCount".into(), Value::from(3));
        stats.insert("ratio".into(), Value::from(0.125));
        stats.insert("seen".into(), Value::from(vec![precise, created]));

        let mut user = Map::new();
        user.insert("id".into(), Value::from("u-1"));
        user.insert("name".into(), Value::from("Ann"));
        user.insert("createdAt".into(), Value::from(created));
        user.insert("active".into(), Value::from(true));
        user.insert("manager".into(), Value::Null);
        user.insert("stats".into(), Value::Object(stats));

        Value::from(vec![Value::Object(user), Value::from("tail")])
    }

    #[test]
    fn test_roundtrip_nested_values() {
        let value = nested_value();
        let text = encode(&value).unwrap();
        assert_eq!(decode(&text).unwrap(), value);
    }

    #[test]
    fn test_roundtrip_top_level_timestamp() {
        let value = Value::from(Utc.with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap());
        let text = encode(&value).unwrap();
        assert_eq!(text, r#"{"__type":"Date","value":"1999-12-31T23:59:59Z"}"#);
        assert_eq!(decode(&text).unwrap(), value);
    }

    #[test]
    fn test_encode_rejects_timestamps_beyond_year_9999() {
        let far = Value::from(Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap());
        assert!(!crate::value::validate_serializable(&far));
        let err = encode(&Value::from(vec![far])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::SerializationError);

        let last = Value::from(Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap());
        assert_eq!(decode(&encode(&last).unwrap()).unwrap(), last);
    }

    #[test]
    fn test_encode_rejects_nan() {
        let err = encode(&Value::from(vec![f64::NAN])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::SerializationError);
        assert_eq!(
            err.context.unwrap().get("originalValue"),
            Some(&Value::from("array"))
        );
    }

    #[test]
    fn test_decode_truncated_text_reports_bounded_prefix() {
        let full = format!(
            r#"{{"id":"abc","result":{{"name":"{}","email":"ann@x.io"}},"timestamp":1}}"#,
            "A".repeat(150)
        );
        let truncated = &full[..full.len() - 20];

        let err = decode(truncated).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DeserializationError);
        assert_eq!(err.status_code, 400);

        let context = err.context.unwrap();
        let expected: String = truncated.chars().take(100).collect();
        assert_eq!(context.get("json"), Some(&Value::String(expected)));
    }

    #[test]
    fn test_decode_short_garbage_keeps_whole_text() {
        let err = decode("{not json").unwrap_err();
        assert_eq!(
            err.context.unwrap().get("json"),
            Some(&Value::from("{not json"))
        );
    }

    #[test]
    fn test_error_prefix_respects_char_boundaries() {
        let text = "é".repeat(150);
        assert_eq!(error_prefix(&text).chars().count(), 100);
    }

    #[test]
    fn test_invalid_date_envelope_stays_an_object() {
        let value = decode(r#"{"__type":"Date","value":"yesterday"}"#).unwrap();
        assert_eq!(value.type_name(), "object");
        assert!(!crate::value::validate_serializable(&value));
    }
}
