/// Remote monitoring service client.
///
/// Handles URL construction and JSON response parsing for the two read
/// endpoints:
///   GET {base}/overall?time=<unixSeconds>          — station catalog
///   GET {base}/mgraph?mode=&id=&a=&b=&nocache=...  — windowed time series
///
/// Transport-level failures (connection errors, 500/502/503/504) are retried
/// with bounded exponential backoff, invisibly to callers. Application-level
/// failures (non-success status, empty catalog, malformed payload) are never
/// retried; the orchestrator decides what those mean at its own level.
///
/// See `fixtures.rs` for annotated examples of both response shapes.

use crate::logging::DataSource;
use crate::model::{decode_epoch_millis, Feature, FieldSeries, SyncError};
use crate::retry::RetryPolicy;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Connection pool size, matched to the orchestrator's worst-case fan-out.
const POOL_MAX_IDLE_PER_HOST: usize = 100;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Server-side statuses worth retrying. Anything else non-2xx is a protocol
/// error the caller must see.
const RETRYABLE_STATUSES: [u16; 4] = [500, 502, 503, 504];

// ---------------------------------------------------------------------------
// Response envelope for the overall endpoint
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct OverallResponse {
    features: Vec<serde_json::Value>,
}

/// Period bounds plus field-oriented readings from one mgraph fetch.
///
/// `period_start`/`period_end` are the service's own bounds for the
/// response; they may differ slightly from the requested window and are
/// informational only.
#[derive(Debug, Clone)]
pub struct WindowData {
    pub series: FieldSeries,
    pub period_start: Option<NaiveDateTime>,
    pub period_end: Option<NaiveDateTime>,
}

// ---------------------------------------------------------------------------
// Transport failure classification (internal to the retry loop)
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum FetchFailure {
    /// Connection-level error from reqwest.
    Transport(String),
    /// A status from RETRYABLE_STATUSES.
    Overloaded(u16),
    /// Any other non-success status.
    Fatal(u16),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::Transport(msg) => write!(f, "transport: {}", msg),
            FetchFailure::Overloaded(status) => write!(f, "status {}", status),
            FetchFailure::Fatal(status) => write!(f, "status {}", status),
        }
    }
}

fn is_transient(failure: &FetchFailure) -> bool {
    matches!(failure, FetchFailure::Transport(_) | FetchFailure::Overloaded(_))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Resilient client for the remote catalog and time-series endpoints.
///
/// Cheap to clone: the underlying reqwest client shares its connection pool
/// across clones, which is exactly what the worker fan-out needs.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    base_url: String,
    http: reqwest::blocking::Client,
    retry: RetryPolicy,
}

impl RemoteClient {
    pub fn new(base_url: &str) -> Result<Self, SyncError> {
        Self::with_retry(base_url, RetryPolicy::transport())
    }

    pub fn with_retry(base_url: &str, retry: RetryPolicy) -> Result<Self, SyncError> {
        let http = reqwest::blocking::Client::builder()
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SyncError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            retry,
        })
    }

    /// Fetches the full station catalog as of the given unix timestamp.
    ///
    /// # Errors
    /// - `SyncError::Protocol` — non-success response status.
    /// - `SyncError::NoFeatures` — the service returned an empty feature
    ///   list. Both are fatal to a synchronization run: without a catalog
    ///   there is nothing to do.
    pub fn list_features(&self, as_of: i64) -> Result<Vec<Feature>, SyncError> {
        let url = build_overall_url(&self.base_url, as_of);
        let body = self.get("overall", &url)?;
        parse_overall_response(&body)
    }

    /// Fetches one `(station, mode)` time-series window.
    ///
    /// Null-valued readings are dropped here; a null carries no information
    /// downstream. Fails with `SyncError::Protocol` on non-success status;
    /// whether to retry the window is the caller's decision.
    pub fn fetch_window(
        &self,
        station_id: i64,
        mode: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
        extra_params: &[(String, String)],
    ) -> Result<WindowData, SyncError> {
        let url = build_mgraph_url(
            &self.base_url,
            mode,
            station_id,
            date_from,
            date_to,
            unix_now(),
            extra_params,
        );
        let body = self.get("mgraph", &url)?;
        parse_mgraph_response(&body)
    }

    /// Looks up a feature by name via an on-demand catalog fetch.
    /// The match is case-insensitive and exact.
    pub fn feature_by_name(&self, name: &str) -> Result<Feature, SyncError> {
        let features = self.list_features(unix_now())?;
        find_feature(&features, name)
            .cloned()
            .ok_or_else(|| SyncError::FeatureNotFound(name.to_string()))
    }

    /// One GET with the transport retry schedule applied.
    fn get(&self, endpoint: &str, url: &str) -> Result<String, SyncError> {
        let result = self.retry.run(endpoint, DataSource::Remote, is_transient, || {
            let response = self
                .http
                .get(url)
                .send()
                .map_err(|e| FetchFailure::Transport(e.to_string()))?;

            let status = response.status().as_u16();
            if RETRYABLE_STATUSES.contains(&status) {
                return Err(FetchFailure::Overloaded(status));
            }
            if !response.status().is_success() {
                return Err(FetchFailure::Fatal(status));
            }

            response
                .text()
                .map_err(|e| FetchFailure::Transport(e.to_string()))
        });

        result.map_err(|failure| match failure {
            FetchFailure::Transport(msg) => SyncError::Transport(msg),
            FetchFailure::Overloaded(status) | FetchFailure::Fatal(status) => {
                SyncError::Protocol { endpoint: endpoint.to_string(), status }
            }
        })
    }
}

/// Current unix time in seconds, used for the `time`/`nocache` parameters.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

/// Builds the catalog URL: `{base}/overall?time=<unixSeconds>`.
pub fn build_overall_url(base_url: &str, as_of: i64) -> String {
    format!("{}/overall?time={}", base_url, as_of)
}

/// Builds a time-series URL:
/// `{base}/mgraph?mode=<m>&id=<id>&a=<YYYY-MM-DD>&b=<YYYY-MM-DD>&nocache=<t>`
/// plus any mode-specific extra parameters, URL-encoded.
pub fn build_mgraph_url(
    base_url: &str,
    mode: &str,
    station_id: i64,
    date_from: NaiveDate,
    date_to: NaiveDate,
    nocache: i64,
    extra_params: &[(String, String)],
) -> String {
    let mut url = format!(
        "{}/mgraph?mode={}&id={}&a={}&b={}&nocache={}",
        base_url,
        urlencoding::encode(mode),
        station_id,
        date_from.format("%Y-%m-%d"),
        date_to.format("%Y-%m-%d"),
        nocache
    );

    for (key, value) in extra_params {
        url.push('&');
        url.push_str(key);
        url.push('=');
        url.push_str(&urlencoding::encode(value));
    }

    url
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parses an overall response into the feature list.
///
/// # Errors
/// - `SyncError::Parse` — malformed JSON, or a feature missing its id/name.
/// - `SyncError::NoFeatures` — structurally valid response with an empty
///   feature list.
pub fn parse_overall_response(json: &str) -> Result<Vec<Feature>, SyncError> {
    let response: OverallResponse = serde_json::from_str(json)
        .map_err(|e| SyncError::Parse(format!("overall deserialization failed: {}", e)))?;

    if response.features.is_empty() {
        return Err(SyncError::NoFeatures);
    }

    response.features.into_iter().map(Feature::from_document).collect()
}

/// Parses an mgraph response: pops the `period_1`/`period_2` bounds, then
/// reads every remaining key as a field with `[epochMillis, value|null]`
/// entries. Null readings are dropped; a field whose whole value is null is
/// skipped.
///
/// Timestamps decode at the service's fixed +03:00 offset.
pub fn parse_mgraph_response(json: &str) -> Result<WindowData, SyncError> {
    let payload: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)
        .map_err(|e| SyncError::Parse(format!("mgraph deserialization failed: {}", e)))?;

    let period_start = payload.get("period_1").and_then(parse_period);
    let period_end = payload.get("period_2").and_then(parse_period);

    let mut series: FieldSeries = HashMap::new();

    for (field, value) in &payload {
        if field == "period_1" || field == "period_2" {
            continue;
        }

        let entries = match value {
            serde_json::Value::Array(entries) => entries,
            // Null fields carry nothing; other scalar keys are metadata.
            _ => continue,
        };

        let mut readings = Vec::new();
        for entry in entries {
            let pair = entry.as_array().ok_or_else(|| {
                SyncError::Parse(format!("field {} entry is not a [millis, value] pair", field))
            })?;

            let millis = pair
                .first()
                .and_then(|v| v.as_i64())
                .ok_or_else(|| SyncError::Parse(format!("field {} has a non-integer timestamp", field)))?;

            let reading = match pair.get(1) {
                None | Some(serde_json::Value::Null) => continue,
                Some(v) => v.as_f64().ok_or_else(|| {
                    SyncError::Parse(format!("field {} has a non-numeric value", field))
                })?,
            };

            let instant = decode_epoch_millis(millis)
                .ok_or_else(|| SyncError::Parse(format!("field {} timestamp {} out of range", field, millis)))?;

            readings.push((instant, reading));
        }

        series.insert(field.clone(), readings);
    }

    Ok(WindowData { series, period_start, period_end })
}

/// Lenient ISO 8601 parse for the informational period bounds. A malformed
/// period must not fail an otherwise good window fetch.
fn parse_period(value: &serde_json::Value) -> Option<NaiveDateTime> {
    let text = value.as_str()?;
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

/// Case-insensitive exact name match over a feature slice.
pub fn find_feature<'a>(features: &'a [Feature], name: &str) -> Option<&'a Feature> {
    let wanted = name.to_lowercase();
    features.iter().find(|f| f.name.to_lowercase() == wanted)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
