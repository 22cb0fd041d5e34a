//! Telemetry value types shared by the historical and live paths.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

use crate::error::YamcsError;

/// Opaque object key supplied by the host framework.
///
/// `key == "parameters"` denotes the provider's root folder; any other key
/// must match a dictionary entry by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TelemetryIdentifier {
    pub namespace: String,
    pub key: String,
}

impl TelemetryIdentifier {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }
}

/// A decoded engineering value.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryValue {
    Uint32(u32),
    Sint64(i64),
    Float(f64),
    Text(String),
}

/// One telemetry sample as delivered to the host.
///
/// `value` is `None` for liveness ticks and for the synthetic "no data yet"
/// point the historical path emits against an empty archive.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryPoint {
    pub id: String,
    pub timestamp: Option<String>,
    pub value: Option<TelemetryValue>,
}

impl TelemetryPoint {
    /// A valueless point signalling liveness with unknown value.
    pub fn tick(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp: None,
            value: None,
        }
    }

    /// The single synthetic point returned when the archive holds no
    /// records, stamped with the current time so the host UI stays
    /// populated.
    pub fn no_data(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            value: None,
        }
    }
}

/// Optional time bounds forwarded to the archive endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryRange {
    pub start: Option<DateTime<Utc>>,
    pub stop: Option<DateTime<Utc>>,
}

/// Wire form of a Yamcs engineering value: a type tag selecting which typed
/// sub-field carries the payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEngValue {
    #[serde(rename = "type")]
    pub tag: Option<String>,
    #[serde(rename = "uint32Value")]
    pub uint32_value: Option<u32>,
    #[serde(rename = "sint64Value")]
    pub sint64_value: Option<i64>,
    #[serde(rename = "floatValue")]
    pub float_value: Option<f64>,
    #[serde(rename = "stringValue")]
    pub string_value: Option<String>,
}

/// Decodes the tagged union. The tag is authoritative: a recognized tag with
/// its typed field missing is a malformed value, and an unrecognized tag is
/// an explicit error rather than a silent default.
pub fn decode_eng_value(raw: &RawEngValue) -> Result<TelemetryValue, YamcsError> {
    let tag = raw.tag.as_deref().unwrap_or("");
    let missing = |field: &str| YamcsError::MalformedFrame(format!("engValue tagged {tag} is missing {field}"));
    match tag {
        "UINT32" => raw
            .uint32_value
            .map(TelemetryValue::Uint32)
            .ok_or_else(|| missing("uint32Value")),
        "SINT64" => raw
            .sint64_value
            .map(TelemetryValue::Sint64)
            .ok_or_else(|| missing("sint64Value")),
        "FLOAT" => raw
            .float_value
            .map(TelemetryValue::Float)
            .ok_or_else(|| missing("floatValue")),
        "STRING" => raw
            .string_value
            .clone()
            .map(TelemetryValue::Text)
            .ok_or_else(|| missing("stringValue")),
        other => Err(YamcsError::UnknownValueTag(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawEngValue {
        serde_json::from_str(json).expect("raw engValue should parse")
    }

    #[test]
    fn decodes_each_tagged_field() {
        assert_eq!(
            decode_eng_value(&raw(r#"{"type":"UINT32","uint32Value":42}"#)),
            Ok(TelemetryValue::Uint32(42))
        );
        assert_eq!(
            decode_eng_value(&raw(r#"{"type":"SINT64","sint64Value":-9}"#)),
            Ok(TelemetryValue::Sint64(-9))
        );
        assert_eq!(
            decode_eng_value(&raw(r#"{"type":"FLOAT","floatValue":1.5}"#)),
            Ok(TelemetryValue::Float(1.5))
        );
        assert_eq!(
            decode_eng_value(&raw(r#"{"type":"STRING","stringValue":"ENABLED"}"#)),
            Ok(TelemetryValue::Text("ENABLED".to_string()))
        );
    }

    #[test]
    fn unknown_tag_is_an_explicit_error() {
        assert_eq!(
            decode_eng_value(&raw(r#"{"type":"BINARY","stringValue":"x"}"#)),
            Err(YamcsError::UnknownValueTag("BINARY".to_string()))
        );
        assert_eq!(
            decode_eng_value(&raw(r#"{"floatValue":1.0}"#)),
            Err(YamcsError::UnknownValueTag(String::new()))
        );
    }

    #[test]
    fn tag_with_missing_typed_field_is_malformed() {
        assert!(matches!(
            decode_eng_value(&raw(r#"{"type":"FLOAT","uint32Value":3}"#)),
            Err(YamcsError::MalformedFrame(_))
        ));
    }

    #[test]
    fn no_data_point_carries_a_timestamp_but_no_value() {
        let point = TelemetryPoint::no_data("BatteryVoltage1");
        assert_eq!(point.id, "BatteryVoltage1");
        assert!(point.timestamp.is_some());
        assert!(point.value.is_none());
    }
}
