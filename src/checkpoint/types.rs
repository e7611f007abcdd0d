//! Checkpoint model
//!
//! The checkpoint is persisted as a JSON object:
//!
//! ```json
//! { "lastReadDate": 1700000000000, "readState": { "error/postgres.log": "12:3456" } }
//! ```
//!
//! Unknown top-level keys are carried through a load/save cycle untouched.

use crate::types::{EpochMillis, MILLIS_PER_DAY};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

/// Marker meaning "from the start of the file"
pub const START_MARKER: &str = "0";

/// Durable ingestion progress for one instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Lower bound for the next "changed since" listing
    #[serde(rename = "lastReadDate")]
    pub last_read_timestamp: EpochMillis,

    /// File name -> opaque read marker
    #[serde(rename = "readState", default)]
    pub read_markers: BTreeMap<String, String>,

    /// Top-level keys this version does not know about
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Checkpoint {
    /// Checkpoint with no markers
    pub fn new(last_read_timestamp: EpochMillis) -> Self {
        Self {
            last_read_timestamp,
            read_markers: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    /// First-run checkpoint looking back `initial_days` from `now`
    pub fn initial(now: EpochMillis, initial_days: f64) -> Self {
        Self::new(initial_window_start(now, initial_days))
    }

    /// Stored marker for a file, or the start-of-file sentinel
    pub fn marker_for(&self, file: &str) -> &str {
        self.read_markers
            .get(file)
            .map_or(START_MARKER, String::as_str)
    }

    /// Record how far a file has been consumed
    pub fn set_marker(&mut self, file: impl Into<String>, marker: impl Into<String>) {
        self.read_markers.insert(file.into(), marker.into());
    }

    /// Add a marker builder-style
    #[must_use]
    pub fn with_marker(mut self, file: impl Into<String>, marker: impl Into<String>) -> Self {
        self.set_marker(file, marker);
        self
    }

    /// Serialize to the stored JSON form
    pub fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a stored blob, defaulting each field independently
    ///
    /// A blob that is not JSON at all, a missing or mistyped
    /// `lastReadDate`, and a missing or mistyped `readState` each fall
    /// back to the first-run default instead of failing the load.
    pub fn from_bytes_lenient(data: &[u8], now: EpochMillis, initial_days: f64) -> Self {
        let default_start = initial_window_start(now, initial_days);

        let mut object = match serde_json::from_slice::<Value>(data) {
            Ok(Value::Object(object)) => object,
            Ok(other) => {
                warn!(kind = json_kind(&other), "Checkpoint is not a JSON object, starting fresh");
                return Self::new(default_start);
            }
            Err(e) => {
                warn!(error = %e, "Checkpoint is not valid JSON, starting fresh");
                return Self::new(default_start);
            }
        };

        let last_read_timestamp = match object.remove("lastReadDate") {
            Some(value) => value
                .as_i64()
                .or_else(|| value.as_f64().map(|f| f as i64))
                .unwrap_or_else(|| {
                    warn!(value = %value, "Ignoring unusable lastReadDate");
                    default_start
                }),
            None => default_start,
        };

        let read_markers = match object.remove("readState") {
            Some(Value::Object(entries)) => entries
                .into_iter()
                .filter_map(|(file, marker)| match marker {
                    Value::String(s) => Some((file, s)),
                    Value::Number(n) => Some((file, n.to_string())),
                    other => {
                        warn!(file = %file, marker = %other, "Dropping unusable read marker");
                        None
                    }
                })
                .collect(),
            Some(other) => {
                warn!(kind = json_kind(&other), "Ignoring unusable readState");
                BTreeMap::new()
            }
            None => BTreeMap::new(),
        };

        Self {
            last_read_timestamp,
            read_markers,
            extra: object,
        }
    }
}

/// `now - initial_days`, in epoch milliseconds
pub fn initial_window_start(now: EpochMillis, initial_days: f64) -> EpochMillis {
    now - (MILLIS_PER_DAY as f64 * initial_days).round() as i64
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
