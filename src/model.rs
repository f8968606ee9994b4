/// Core data types for the telemetry synchronization service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O, only types, the error taxonomy, and the fixed-offset
/// timestamp helpers every layer must agree on.

use chrono::{DateTime, FixedOffset, NaiveDate};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Service timezone
// ---------------------------------------------------------------------------

/// The remote service's fixed UTC offset, in seconds (+03:00).
///
/// The upstream publishes raw epoch-millisecond values that are defined
/// relative to this fixed offset, never UTC and never the local zone of
/// whatever host happens to run the sync. Decoding with any other offset
/// shifts every historical reading by three hours.
pub const SERVICE_OFFSET_SECS: i32 = 3 * 3600;

/// The service's fixed +03:00 offset as a chrono type.
pub fn service_offset() -> FixedOffset {
    FixedOffset::east_opt(SERVICE_OFFSET_SECS).expect("+03:00 is a valid offset")
}

/// Decodes a raw epoch-millisecond value from the remote service into an
/// instant rendered at the fixed +03:00 offset.
pub fn decode_epoch_millis(millis: i64) -> Option<DateTime<FixedOffset>> {
    DateTime::from_timestamp(millis.div_euclid(1000), 0)
        .map(|dt| dt.with_timezone(&service_offset()))
}

/// Midnight at the start of `date`, at the service offset.
///
/// Calendar dates arriving at the store or export boundary are normalized
/// through this before any range comparison.
pub fn day_start(date: NaiveDate) -> DateTime<FixedOffset> {
    date.and_hms_opt(0, 0, 0)
        .expect("midnight is valid on every calendar date")
        .and_local_timezone(service_offset())
        .single()
        .expect("fixed offsets have no DST gaps")
}

// ---------------------------------------------------------------------------
// Catalog types
// ---------------------------------------------------------------------------

/// A measurement station from the remote catalog.
///
/// Corresponds to one entry in the `features[]` array of an overall response.
/// The geospatial properties are opaque to the sync pipeline and travel
/// inside `document`, which is persisted wholesale on every catalog refresh.
#[derive(Debug, Clone)]
pub struct Feature {
    pub id: i64,
    pub name: String,
    /// Mode name → availability flag. `None` preserves a JSON null, which
    /// means the station does not report that mode.
    pub data_availability: HashMap<String, Option<bool>>,
    /// The full raw feature object, including geometry.
    pub document: serde_json::Value,
}

impl Feature {
    /// Builds a `Feature` from its raw JSON document, whether that document
    /// just arrived from the catalog endpoint or was read back from the
    /// store. `properties.id` and `properties.name` are mandatory; the
    /// availability map tolerates nulls and (occasionally) non-bool values.
    pub fn from_document(document: serde_json::Value) -> Result<Self, SyncError> {
        let properties = document
            .get("properties")
            .and_then(|p| p.as_object())
            .ok_or_else(|| SyncError::Parse("feature missing properties object".to_string()))?;

        let id = properties
            .get("id")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| SyncError::Parse("feature missing integer id".to_string()))?;

        let name = properties
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SyncError::Parse(format!("feature {} missing name", id)))?
            .to_string();

        let mut data_availability = HashMap::new();
        if let Some(data) = properties.get("data").and_then(|d| d.as_object()) {
            for (field, flag) in data {
                let available = match flag {
                    serde_json::Value::Null => None,
                    serde_json::Value::Bool(b) => Some(*b),
                    // The upstream occasionally emits numbers here; treat
                    // any non-null value as available.
                    _ => Some(true),
                };
                data_availability.insert(field.clone(), available);
            }
        }

        Ok(Feature { id, name, data_availability, document })
    }
}

// ---------------------------------------------------------------------------
// Observation types
// ---------------------------------------------------------------------------

/// Field name → ordered `(instant, value)` readings, as returned by one
/// mgraph window fetch. Null-valued readings are dropped before this point.
pub type FieldSeries = HashMap<String, Vec<(DateTime<FixedOffset>, f64)>>;

/// One persisted measurement row, keyed by `(station_id, mode, time)`.
///
/// Most modes fill only `value`. The river level mode reports three named
/// fields instead (remote keys `bs`/`d`/`z`), stored in the dedicated
/// columns. All value columns are nullable; upserts merge per column so a
/// partial re-fetch never nulls out a previously stored field.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRow {
    pub station_id: i64,
    pub mode: String,
    pub time: DateTime<FixedOffset>,
    pub value: Option<f64>,
    pub baseline: Option<f64>,
    pub distance: Option<f64>,
    pub zero: Option<f64>,
}

impl ObservationRow {
    pub fn empty(station_id: i64, mode: &str, time: DateTime<FixedOffset>) -> Self {
        Self {
            station_id,
            mode: mode.to_string(),
            time,
            value: None,
            baseline: None,
            distance: None,
            zero: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise while synchronizing telemetry.
///
/// Only catalog-phase failures (`Protocol`, `NoFeatures`, `Parse` during the
/// overall fetch) abort a run. Everything that happens inside the dispatch
/// phase is caught at the `(station, mode, window)` tuple boundary and
/// reported without touching sibling work.
#[derive(Debug)]
pub enum SyncError {
    /// A transport-level failure that survived the bounded retry schedule.
    Transport(String),
    /// Non-success HTTP status from the remote service.
    Protocol { endpoint: String, status: u16 },
    /// The response body could not be decoded.
    Parse(String),
    /// The catalog fetch returned zero features; there is nothing to sync.
    NoFeatures,
    /// No feature's name matched the requested lookup key.
    FeatureNotFound(String),
    /// A storage operation failed after its bounded retries.
    Persistence(String),
    /// An unordered observation batch partially failed. The surviving rows
    /// are committed; the counts are surfaced for operator visibility.
    PartialWrite { written: usize, failed: usize },
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::Transport(msg) => write!(f, "Transport error: {}", msg),
            SyncError::Protocol { endpoint, status } => {
                write!(f, "{} returned status {}", endpoint, status)
            }
            SyncError::Parse(msg) => write!(f, "Parse error: {}", msg),
            SyncError::NoFeatures => write!(f, "No features returned by the catalog"),
            SyncError::FeatureNotFound(name) => write!(f, "Feature not found: {}", name),
            SyncError::Persistence(msg) => write!(f, "Persistence error: {}", msg),
            SyncError::PartialWrite { written, failed } => {
                write!(f, "Partial write: {} rows committed, {} rows failed", written, failed)
            }
        }
    }
}

impl std::error::Error for SyncError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_epoch_zero_decodes_to_three_am_wall_clock() {
        // Epoch 0 is 1970-01-01T00:00:00 UTC, which the service's fixed
        // +03:00 offset renders as 03:00:00: the offset must be applied,
        // not ignored.
        let dt = decode_epoch_millis(0).expect("epoch 0 decodes");
        assert_eq!(dt.hour(), 3);
        assert_eq!(dt.minute(), 0);
        assert_eq!(dt.second(), 0);
        assert_eq!(dt.offset().local_minus_utc(), SERVICE_OFFSET_SECS);
    }

    #[test]
    fn test_decode_truncates_sub_second_millis() {
        let with_millis = decode_epoch_millis(1_577_836_800_750).expect("decodes");
        let without = decode_epoch_millis(1_577_836_800_000).expect("decodes");
        assert_eq!(with_millis, without, "sub-second precision is discarded");
    }

    #[test]
    fn test_day_start_is_midnight_at_service_offset() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let dt = day_start(date);
        assert_eq!(dt.hour(), 0);
        assert_eq!(dt.offset().local_minus_utc(), SERVICE_OFFSET_SECS);
        // Midnight +03:00 is 21:00 UTC the previous day.
        assert_eq!(dt.to_utc().hour(), 21);
    }

    #[test]
    fn test_sync_error_display_includes_context() {
        let err = SyncError::Protocol { endpoint: "overall".to_string(), status: 503 };
        assert!(err.to_string().contains("overall"));
        assert!(err.to_string().contains("503"));

        let err = SyncError::PartialWrite { written: 9, failed: 1 };
        assert!(err.to_string().contains("9"));
        assert!(err.to_string().contains("1"));
    }
}
