//! External record model

use chrono::{DateTime, NaiveDateTime, Utc};
use opsync_core::UtcDateTime;
use serde_json::Value;

use crate::error::{ClientError, ClientResult};

/// One loosely structured document fetched from the tracking service.
///
/// Keeps the raw JSON around; typed accessors pull out the handful of fields
/// the import machinery relies on (`id`, `updatedAt`, `_type`, `_links`).
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalRecord {
    external_id: String,
    value: Value,
}

impl ExternalRecord {
    /// Wrap a raw payload. Fails if the `id` field is absent - every record
    /// the API hands out carries one.
    pub fn from_value(value: Value) -> ClientResult<Self> {
        let external_id = match value.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(ClientError::Decode(
                    "record payload has no usable \"id\" field".to_string(),
                ))
            }
        };
        Ok(Self { external_id, value })
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    /// `updatedAt` parsed as ISO 8601. Offsets are normalized to UTC and a
    /// bare naive timestamp is taken as UTC, so comparisons against local
    /// sync dates ignore the remote timezone.
    pub fn updated_at(&self) -> Option<UtcDateTime> {
        self.value
            .get("updatedAt")
            .and_then(Value::as_str)
            .and_then(parse_remote_timestamp)
    }

    /// `createdAt` parsed the same way as `updatedAt`.
    pub fn created_at(&self) -> Option<UtcDateTime> {
        self.value
            .get("createdAt")
            .and_then(Value::as_str)
            .and_then(parse_remote_timestamp)
    }

    /// The `_type` discriminator, when present.
    pub fn record_type(&self) -> Option<&str> {
        self.value.get("_type").and_then(Value::as_str)
    }

    /// The `_links` relation map, when present.
    pub fn links(&self) -> Option<&Value> {
        self.value.get("_links")
    }

    /// Field accessor on the raw payload.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.value.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.value.get(field).and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Parse an ISO 8601 timestamp from the tracking service.
///
/// Accepts RFC 3339 (`2014-08-29T12:44:41Z`, `...+02:00`) and bare naive
/// timestamps; everything is normalized to UTC.
pub fn parse_remote_timestamp(s: &str) -> Option<UtcDateTime> {
    if let Ok(dt) = s.parse::<DateTime<Utc>>() {
        return Some(dt);
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
    }

    None
}
