//! TR-106 parameter value codec.
//!
//! Converts the nine named TR-106 textual parameter types into typed
//! runtime values. `string`, `base64` and `hexBinary` are kept as raw text;
//! validation of their contents is deferred to the consumer, matching the
//! original's pass-through behavior.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::fmt;

/// The nine TR-106 parameter type names this codec accepts.
pub const PARAMETER_TYPES: &[&str] = &[
    "string",
    "base64",
    "hexBinary",
    "boolean",
    "dateTime",
    "int",
    "long",
    "unsignedInt",
    "unsignedLong",
];

/// Returns true exactly for the nine TR-106 type names above.
pub fn is_valid_parameter_type(parameter_type: &str) -> bool {
    PARAMETER_TYPES.contains(&parameter_type)
}

#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    #[error("invalid parameter type: {0}")]
    InvalidType(String),
    #[error("invalid value {value:?} for parameter type {kind}: {source}")]
    InvalidValue {
        kind: &'static str,
        value: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// A parsed TR-106 parameter value, tagged by its declared kind.
///
/// `Bytes` backs both `base64` and `hexBinary` — the raw text is kept
/// verbatim in either case, so one variant suffices.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    String(String),
    Bytes(String),
    Bool(bool),
    Instant(DateTime<FixedOffset>),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::String(s) | ParameterValue::Bytes(s) => write!(f, "{s}"),
            ParameterValue::Bool(b) => write!(f, "{b}"),
            ParameterValue::Instant(t) => write!(f, "{}", t.to_rfc3339()),
            ParameterValue::I32(v) => write!(f, "{v}"),
            ParameterValue::I64(v) => write!(f, "{v}"),
            ParameterValue::U32(v) => write!(f, "{v}"),
            ParameterValue::U64(v) => write!(f, "{v}"),
        }
    }
}

/// Lexical set accepted for `boolean`, matching Go's `strconv.ParseBool`.
fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "true" | "True" | "TRUE" => Some(true),
        "0" | "f" | "F" | "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

pub fn parse_parameter_value(
    parameter_type: &str,
    text: &str,
) -> Result<ParameterValue, ParameterError> {
    let boxed_err = |e: Box<dyn std::error::Error + Send + Sync>, kind: &'static str| {
        ParameterError::InvalidValue {
            kind,
            value: text.to_string(),
            source: e,
        }
    };

    match parameter_type {
        "string" => Ok(ParameterValue::String(text.to_string())),
        "base64" | "hexBinary" => Ok(ParameterValue::Bytes(text.to_string())),
        "boolean" => parse_bool(text)
            .map(ParameterValue::Bool)
            .ok_or_else(|| ParameterError::InvalidValue {
                kind: "boolean",
                value: text.to_string(),
                source: "not one of the accepted boolean literals".into(),
            }),
        "dateTime" => DateTime::parse_from_rfc3339(text)
            .map(ParameterValue::Instant)
            .map_err(|e| boxed_err(Box::new(e), "dateTime")),
        "int" => text
            .parse::<i32>()
            .map(ParameterValue::I32)
            .map_err(|e| boxed_err(Box::new(e), "int")),
        "long" => text
            .parse::<i64>()
            .map(ParameterValue::I64)
            .map_err(|e| boxed_err(Box::new(e), "long")),
        "unsignedInt" => text
            .parse::<u32>()
            .map(ParameterValue::U32)
            .map_err(|e| boxed_err(Box::new(e), "unsignedInt")),
        "unsignedLong" => text
            .parse::<u64>()
            .map(ParameterValue::U64)
            .map_err(|e| boxed_err(Box::new(e), "unsignedLong")),
        other => Err(ParameterError::InvalidType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_valid_type_name_is_recognized() {
        for t in PARAMETER_TYPES {
            assert!(is_valid_parameter_type(t));
        }
        assert!(!is_valid_parameter_type("ParameterPerColumn"));
    }

    #[test]
    fn round_trip_canonical_values() {
        assert_eq!(
            parse_parameter_value("string", "RT-100").unwrap(),
            ParameterValue::String("RT-100".into())
        );
        assert_eq!(
            parse_parameter_value("unsignedInt", "3600").unwrap(),
            ParameterValue::U32(3600)
        );
        assert_eq!(
            parse_parameter_value("int", "-7").unwrap(),
            ParameterValue::I32(-7)
        );
        assert_eq!(
            parse_parameter_value("long", "9999999999").unwrap(),
            ParameterValue::I64(9_999_999_999)
        );
        assert_eq!(
            parse_parameter_value("unsignedLong", "18446744073709551615").unwrap(),
            ParameterValue::U64(u64::MAX)
        );
        assert_eq!(
            parse_parameter_value("boolean", "1").unwrap(),
            ParameterValue::Bool(true)
        );
        assert_eq!(
            parse_parameter_value("boolean", "FALSE").unwrap(),
            ParameterValue::Bool(false)
        );
        assert!(parse_parameter_value("dateTime", "2023-11-14T22:13:20Z").is_ok());
        assert_eq!(
            parse_parameter_value("base64", "aGVsbG8=").unwrap(),
            ParameterValue::Bytes("aGVsbG8=".into())
        );
    }

    #[test]
    fn malformed_values_fail() {
        assert!(parse_parameter_value("unsignedInt", "-1").is_err());
        assert!(parse_parameter_value("int", "not-a-number").is_err());
        assert!(parse_parameter_value("boolean", "yes").is_err());
        assert!(parse_parameter_value("dateTime", "not-a-date").is_err());
    }

    #[test]
    fn unknown_type_is_invalid_type_error() {
        let err = parse_parameter_value("ParameterPerColumn", "x").unwrap_err();
        assert!(matches!(err, ParameterError::InvalidType(_)));
    }
}
