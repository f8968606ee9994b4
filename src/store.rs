/// Idempotent time-series persistence.
///
/// Three tables (see sql/001_initial_schema.sql):
///   features     — full catalog documents, keyed by station id
///   measurements — observation rows, keyed by (station_id, mode, time)
///   stations     — read-only reference data, keyed by id
///
/// Every write is an upsert, so re-running a sync over the same or an
/// overlapping date range converges instead of duplicating; that upsert key
/// is the system's entire recovery mechanism. Observation batches are
/// written unordered: one failing row never blocks its siblings.

use crate::db;
use crate::logging::{self, DataSource};
use crate::model::{day_start, service_offset, Feature, FieldSeries, ObservationRow, SyncError};
use crate::retry::RetryPolicy;

use chrono::{DateTime, NaiveDate, Utc};
use postgres::Client;
use std::collections::BTreeMap;

/// Tables the store refuses to start without.
const REQUIRED_TABLES: [&str; 3] = ["features", "measurements", "stations"];

// ---------------------------------------------------------------------------
// Pivot
// ---------------------------------------------------------------------------

/// Pivots field-oriented readings into row-oriented observation rows: all
/// fields sharing a timestamp merge into one row keyed by
/// `(station_id, mode, time)`. Rows come out in ascending time order.
///
/// Field keys map to columns via `mappings::column_for_field`; an unknown
/// field lands in the plain `value` column.
pub fn pivot_rows(station_id: i64, mode: &str, series: &FieldSeries) -> Vec<ObservationRow> {
    let mut by_time: BTreeMap<DateTime<chrono::FixedOffset>, ObservationRow> = BTreeMap::new();

    for (field, readings) in series {
        let column = crate::mappings::column_for_field(field);
        for &(time, reading) in readings {
            let row = by_time
                .entry(time)
                .or_insert_with(|| ObservationRow::empty(station_id, mode, time));
            match column {
                "baseline" => row.baseline = Some(reading),
                "distance" => row.distance = Some(reading),
                "zero" => row.zero = Some(reading),
                _ => row.value = Some(reading),
            }
        }
    }

    by_time.into_values().collect()
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Durable store for station metadata and observation rows.
///
/// Not shareable across threads: each sync worker opens its own store, the
/// same way the daemon's endpoint thread gets its own connection in the
/// monitoring service this grew out of.
pub struct TimeSeriesStore {
    client: Client,
    retry: RetryPolicy,
}

impl TimeSeriesStore {
    /// Connects using DATABASE_URL and verifies the schema is applied.
    pub fn connect() -> Result<Self, SyncError> {
        let client = db::connect_and_verify(&REQUIRED_TABLES).map_err(persistence)?;
        Ok(Self { client, retry: RetryPolicy::storage() })
    }

    /// Wraps an existing connection; used by integration tests.
    pub fn with_client(client: Client) -> Self {
        Self { client, retry: RetryPolicy::storage() }
    }

    /// Upserts each feature by id: full document replace, not a merge.
    /// The catalog is the source of truth; whatever it says now wins.
    pub fn save_features(&mut self, features: &[Feature]) -> Result<(), SyncError> {
        let retry = self.retry;
        let client = &mut self.client;

        retry
            .run("save_features", DataSource::Database, |_| true, || {
                for feature in features {
                    client.execute(
                        "INSERT INTO features (id, name, document) \
                         VALUES ($1, $2, $3) \
                         ON CONFLICT (id) DO UPDATE SET \
                            name = EXCLUDED.name, \
                            document = EXCLUDED.document",
                        &[&feature.id, &feature.name, &feature.document],
                    )?;
                }
                Ok::<_, postgres::Error>(())
            })
            .map_err(persistence)
    }

    /// Pivots one window fetch into rows and upserts them unordered.
    ///
    /// Value columns merge per column (COALESCE), so a partial re-fetch that
    /// carries only some fields never nulls out the others. Returns the
    /// number of rows written; if some rows failed after retries, the
    /// survivors stay committed and the failure counts surface as
    /// `SyncError::PartialWrite`.
    pub fn save_observations(
        &mut self,
        station_id: i64,
        mode: &str,
        series: &FieldSeries,
    ) -> Result<usize, SyncError> {
        let rows = pivot_rows(station_id, mode, series);
        if rows.is_empty() {
            return Ok(0);
        }

        let retry = self.retry;
        let client = &mut self.client;
        let mut written = 0;
        let mut failed = 0;

        for row in &rows {
            let result = retry.run("upsert_observation", DataSource::Database, |_| true, || {
                client.execute(
                    "INSERT INTO measurements \
                     (station_id, mode, time, value, baseline, distance, zero) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7) \
                     ON CONFLICT (station_id, mode, time) DO UPDATE SET \
                        value = COALESCE(EXCLUDED.value, measurements.value), \
                        baseline = COALESCE(EXCLUDED.baseline, measurements.baseline), \
                        distance = COALESCE(EXCLUDED.distance, measurements.distance), \
                        zero = COALESCE(EXCLUDED.zero, measurements.zero)",
                    &[
                        &row.station_id,
                        &row.mode,
                        &row.time.with_timezone(&Utc),
                        &row.value,
                        &row.baseline,
                        &row.distance,
                        &row.zero,
                    ],
                )
            });

            match result {
                Ok(_) => written += 1,
                Err(e) => {
                    failed += 1;
                    logging::warn(
                        DataSource::Database,
                        Some(&station_id.to_string()),
                        &format!("row upsert failed (mode={}, time={}): {}", mode, row.time, e),
                    );
                }
            }
        }

        if failed > 0 {
            return Err(SyncError::PartialWrite { written, failed });
        }
        Ok(written)
    }

    /// Observation rows for one `(station, mode)` over the half-open range
    /// `[period_from, period_to)`, in ascending time order. Date bounds are
    /// normalized to midnight at the service offset. Restartable: every
    /// call issues a fresh query.
    pub fn get_observations(
        &mut self,
        station_id: i64,
        mode: &str,
        period_from: NaiveDate,
        period_to: NaiveDate,
    ) -> Result<Vec<ObservationRow>, SyncError> {
        let from = day_start(period_from).with_timezone(&Utc);
        let to = day_start(period_to).with_timezone(&Utc);

        let retry = self.retry;
        let client = &mut self.client;

        let rows = retry
            .run("get_observations", DataSource::Database, |_| true, || {
                client.query(
                    "SELECT station_id, mode, time, value, baseline, distance, zero \
                     FROM measurements \
                     WHERE station_id = $1 AND mode = $2 AND time >= $3 AND time < $4 \
                     ORDER BY time ASC",
                    &[&station_id, &mode, &from, &to],
                )
            })
            .map_err(persistence)?;

        let offset = service_offset();
        Ok(rows
            .iter()
            .map(|row| ObservationRow {
                station_id: row.get(0),
                mode: row.get(1),
                time: row.get::<_, DateTime<Utc>>(2).with_timezone(&offset),
                value: row.get(3),
                baseline: row.get(4),
                distance: row.get(5),
                zero: row.get(6),
            })
            .collect())
    }

    /// Features whose availability map has `mode_filter` present (non-null),
    /// ordered by name ascending.
    pub fn get_features(&mut self, mode_filter: &str) -> Result<Vec<Feature>, SyncError> {
        let retry = self.retry;
        let client = &mut self.client;

        let rows = retry
            .run("get_features", DataSource::Database, |_| true, || {
                client.query(
                    "SELECT document FROM features \
                     WHERE document->'properties'->'data' ? $1 \
                       AND document->'properties'->'data'->$1 <> 'null'::jsonb \
                     ORDER BY name ASC",
                    &[&mode_filter],
                )
            })
            .map_err(persistence)?;

        rows.iter()
            .map(|row| Feature::from_document(row.get(0)))
            .collect()
    }

    /// Direct lookup in the read-only station reference table.
    pub fn get_station(&mut self, station_id: i64) -> Result<Option<serde_json::Value>, SyncError> {
        let retry = self.retry;
        let client = &mut self.client;

        let row = retry
            .run("get_station", DataSource::Database, |_| true, || {
                client.query_opt("SELECT document FROM stations WHERE id = $1", &[&station_id])
            })
            .map_err(persistence)?;

        Ok(row.map(|r| r.get(0)))
    }
}

fn persistence<E: std::fmt::Display>(e: E) -> SyncError {
    SyncError::Persistence(e.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::decode_epoch_millis;

    fn series_of(fields: &[(&str, &[(i64, f64)])]) -> FieldSeries {
        let mut series = FieldSeries::new();
        for (field, readings) in fields {
            series.insert(
                field.to_string(),
                readings
                    .iter()
                    .map(|&(ms, v)| (decode_epoch_millis(ms).unwrap(), v))
                    .collect(),
            );
        }
        series
    }

    const T1: i64 = 1_577_836_800_000; // 2020-01-01T03:00:00+03:00
    const T2: i64 = 1_577_840_400_000; // one hour later

    #[test]
    fn test_pivot_merges_fields_sharing_a_timestamp() {
        // A → {t1: 1, t2: 2}, B → {t1: 3} must yield exactly two rows:
        // {t1: A=1, B=3} and {t2: A=2}, no row for t2.B.
        let series = series_of(&[("bs", &[(T1, 1.0), (T2, 2.0)]), ("d", &[(T1, 3.0)])]);
        let rows = pivot_rows(42, "distance", &series);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].baseline, Some(1.0));
        assert_eq!(rows[0].distance, Some(3.0));
        assert_eq!(rows[1].baseline, Some(2.0));
        assert_eq!(rows[1].distance, None, "no reading must mean no column, not zero");
    }

    #[test]
    fn test_pivot_rows_come_out_time_ordered() {
        let series = series_of(&[("discharge", &[(T2, 2.0), (T1, 1.0)])]);
        let rows = pivot_rows(7, "discharge", &series);

        assert_eq!(rows.len(), 2);
        assert!(rows[0].time < rows[1].time);
        assert_eq!(rows[0].value, Some(1.0));
    }

    #[test]
    fn test_pivot_scalar_mode_fills_value_column() {
        let series = series_of(&[("temperature", &[(T1, -4.5)])]);
        let rows = pivot_rows(9, "temperature", &series);

        assert_eq!(rows[0].value, Some(-4.5));
        assert_eq!(rows[0].baseline, None);
        assert_eq!(rows[0].distance, None);
        assert_eq!(rows[0].zero, None);
    }

    #[test]
    fn test_pivot_river_level_fills_named_columns() {
        let series = series_of(&[
            ("bs", &[(T1, 92.15)]),
            ("d", &[(T1, 3.42)]),
            ("z", &[(T1, 88.73)]),
        ]);
        let rows = pivot_rows(122, "distance", &series);

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.baseline, Some(92.15));
        assert_eq!(row.distance, Some(3.42));
        assert_eq!(row.zero, Some(88.73));
        assert_eq!(row.value, None);
    }

    #[test]
    fn test_pivot_carries_key_fields() {
        let series = series_of(&[("discharge", &[(T1, 1.0)])]);
        let rows = pivot_rows(55, "discharge", &series);
        assert_eq!(rows[0].station_id, 55);
        assert_eq!(rows[0].mode, "discharge");
    }

    #[test]
    fn test_pivot_empty_series_yields_no_rows() {
        let rows = pivot_rows(1, "discharge", &FieldSeries::new());
        assert!(rows.is_empty());
    }
}
