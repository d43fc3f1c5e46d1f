//! Report normalizer — turns a wire-format bulk-data payload into an
//! ordered sequence of [`Report`]s, one per distinct collection time.
//!
//! Two input variants are accepted, matching TR-069/TR-369's
//! ParameterPerRow CSV and NameValuePair JSON formats. `ParameterPerColumn`
//! and `ObjectHierarchy` are not decoded here — the HTTP layer rejects them
//! before normalization is ever reached.

use crate::parameter::{self, ParameterError};
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid report timestamp {0:?}: {1}")]
    InvalidTimestamp(String, std::num::ParseIntError),
    #[error("report timestamp {0} is out of range")]
    TimestampOutOfRange(i64),
    #[error("invalid parameter type: {0}")]
    InvalidParameterType(String),
    #[error(transparent)]
    InvalidParameterValue(#[from] ParameterError),
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("report missing CollectionTime")]
    MissingCollectionTime,
    #[error("CollectionTime is not an RFC 3339 instant: {0}")]
    InvalidCollectionTime(String),
}

/// A parameter value carried by a normalized [`Report`].
///
/// CSV input is run through the TR-106 codec and carries a [`ParameterValue`](crate::ParameterValue).
/// JSON `NameValuePair` input is passed through verbatim as decoded JSON —
/// this asymmetry is inherited from the source system (see DESIGN.md).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventValue {
    Typed(parameter::ParameterValue),
    Json(serde_json::Value),
}

/// One normalized report: a collection instant and its parameters.
///
/// Parameter names are unique within a report — a `BTreeMap` both enforces
/// that and gives deterministic serialization/iteration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub collection_time: DateTime<FixedOffset>,
    pub parameters: BTreeMap<String, EventValue>,
}

const COL_REPORT_TIMESTAMP: &str = "ReportTimestamp";
const COL_PARAMETER_NAME: &str = "ParameterName";
const COL_PARAMETER_VALUE: &str = "ParameterValue";
const COL_PARAMETER_TYPE: &str = "ParameterType";

/// Decodes a ParameterPerRow CSV bulk-data payload into one [`Report`] per
/// distinct `ReportTimestamp`.
///
/// Rows sharing a timestamp are folded into one report; a later row with
/// the same `ParameterName` overwrites an earlier one (last-write-wins —
/// see DESIGN.md for why this policy was kept rather than changed).
pub fn normalize_csv(body: &[u8]) -> Result<Vec<Report>, NormalizeError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(body);

    let headers = reader.headers()?.clone();
    let column_index = |name: &str| headers.iter().position(|h| h == name);

    let ts_idx = column_index(COL_REPORT_TIMESTAMP);
    let name_idx = column_index(COL_PARAMETER_NAME);
    let value_idx = column_index(COL_PARAMETER_VALUE);
    let type_idx = column_index(COL_PARAMETER_TYPE);

    let mut reports: BTreeMap<i64, BTreeMap<String, EventValue>> = BTreeMap::new();

    for record in reader.records() {
        let record = record?;

        let raw_ts = ts_idx.and_then(|i| record.get(i)).unwrap_or_default();
        let timestamp = raw_ts
            .parse::<i64>()
            .map_err(|e| NormalizeError::InvalidTimestamp(raw_ts.to_string(), e))?;

        let parameter_type = type_idx.and_then(|i| record.get(i)).unwrap_or_default();
        if !parameter::is_valid_parameter_type(parameter_type) {
            return Err(NormalizeError::InvalidParameterType(parameter_type.to_string()));
        }

        let parameter_name = name_idx.and_then(|i| record.get(i)).unwrap_or_default();
        let parameter_value = value_idx.and_then(|i| record.get(i)).unwrap_or_default();

        let parsed = parameter::parse_parameter_value(parameter_type, parameter_value)?;

        reports
            .entry(timestamp)
            .or_default()
            .insert(parameter_name.to_string(), EventValue::Typed(parsed));
    }

    reports
        .into_iter()
        .map(|(timestamp, parameters)| {
            let collection_time = Utc
                .timestamp_opt(timestamp, 0)
                .single()
                .ok_or(NormalizeError::TimestampOutOfRange(timestamp))?
                .fixed_offset();
            Ok(Report {
                collection_time,
                parameters,
            })
        })
        .collect()
}

const RESERVED_COLLECTION_TIME_KEY: &str = "CollectionTime";

/// Decodes a `{"Report": [...]}` NameValuePair JSON payload into one
/// [`Report`] per array element. `CollectionTime` is reserved; every other
/// key becomes a parameter, unvalidated and uncoerced.
pub fn normalize_json(body: &[u8]) -> Result<Vec<Report>, NormalizeError> {
    #[derive(serde::Deserialize)]
    struct NameValuePairPayload {
        #[serde(rename = "Report")]
        report: Vec<serde_json::Map<String, serde_json::Value>>,
    }

    let payload: NameValuePairPayload = serde_json::from_slice(body)?;

    payload
        .report
        .into_iter()
        .map(|mut fields| {
            let collection_time_value = fields
                .remove(RESERVED_COLLECTION_TIME_KEY)
                .ok_or(NormalizeError::MissingCollectionTime)?;

            let collection_time_text = collection_time_value
                .as_str()
                .ok_or_else(|| NormalizeError::InvalidCollectionTime(collection_time_value.to_string()))?;

            let collection_time = DateTime::parse_from_rfc3339(collection_time_text)
                .map_err(|_| NormalizeError::InvalidCollectionTime(collection_time_text.to_string()))?;

            let parameters = fields
                .into_iter()
                .map(|(name, value)| (name, EventValue::Json(value)))
                .collect();

            Ok(Report {
                collection_time,
                parameters,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_distinct_timestamps_yield_one_report_each() {
        let body = b"ReportTimestamp,ParameterName,ParameterValue,ParameterType\n\
                      1700000000,Device.Uptime,3600,unsignedInt\n\
                      1700000000,Device.ModelName,RT-100,string\n\
                      1700000060,Device.Uptime,3660,unsignedInt\n";

        let reports = normalize_csv(body).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].parameters.len(), 2);
        assert_eq!(reports[0].collection_time.to_rfc3339(), "2023-11-14T22:13:20+00:00");
    }

    #[test]
    fn csv_last_write_wins_on_duplicate_name() {
        let body = b"ReportTimestamp,ParameterName,ParameterValue,ParameterType\n\
                      1700000000,Device.Uptime,1,unsignedInt\n\
                      1700000000,Device.Uptime,2,unsignedInt\n";

        let reports = normalize_csv(body).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(
            reports[0].parameters.get("Device.Uptime").unwrap(),
            &EventValue::Typed(parameter::ParameterValue::U32(2))
        );
    }

    #[test]
    fn csv_invalid_type_errors() {
        let body = b"ReportTimestamp,ParameterName,ParameterValue,ParameterType\n\
                      1700000000,Device.Uptime,3600,notAType\n";
        assert!(matches!(
            normalize_csv(body),
            Err(NormalizeError::InvalidParameterType(_))
        ));
    }

    #[test]
    fn csv_non_numeric_timestamp_errors() {
        let body = b"ReportTimestamp,ParameterName,ParameterValue,ParameterType\n\
                      not-a-number,Device.Uptime,3600,unsignedInt\n";
        assert!(matches!(normalize_csv(body), Err(NormalizeError::InvalidTimestamp(_, _))));
    }

    #[test]
    fn json_two_reports_are_normalized_independently() {
        let body = br#"{"Report":[
            {"CollectionTime":"2024-01-01T00:00:00Z","Temp":21.5},
            {"CollectionTime":"2024-01-01T00:01:00Z","Temp":21.6}
        ]}"#;

        let reports = normalize_json(body).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(
            reports[0].parameters.get("Temp").unwrap(),
            &EventValue::Json(serde_json::json!(21.5))
        );
    }

    #[test]
    fn json_missing_collection_time_errors() {
        let body = br#"{"Report":[{"Temp":21.5}]}"#;
        assert!(matches!(normalize_json(body), Err(NormalizeError::MissingCollectionTime)));
    }
}
