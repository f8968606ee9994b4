/// Delimited flat-file export for offline analysis.
///
/// A pure consumer of the store's read interface: one file per station per
/// invocation, named `{station}-{from}-{to}-{field}.csv`. The downstream
/// analysis tooling is spreadsheet-locale based, hence the unusual contract:
/// `;` field separator with `,` as the decimal mark (distinct separators,
/// never comma for both), three fractional digits, and timestamps rendered
/// as naive wall clock with the fixed service offset stripped.

use crate::mappings;
use crate::model::ObservationRow;
use crate::store::TimeSeriesStore;

use chrono::{DateTime, FixedOffset, NaiveDate};
use std::error::Error;
use std::fs;
use std::path::Path;

const FIELD_SEPARATOR: char = ';';
const DATETIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Counts from one export invocation.
#[derive(Debug, Default, PartialEq)]
pub struct ExportSummary {
    pub files_written: usize,
    pub stations_skipped: usize,
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Renders a value with three fractional digits and a comma decimal mark.
/// A missing value renders empty.
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.3}", v).replace('.', ","),
        None => String::new(),
    }
}

/// Renders a timestamp as naive wall clock at the service offset. The
/// offset is stripped, not converted away.
pub fn format_timestamp(time: DateTime<FixedOffset>) -> String {
    time.naive_local().format(DATETIME_FORMAT).to_string()
}

/// Column header for an availability field. River level splits into its
/// three named columns; every other mode exports a single value column.
pub fn header_for(field: &str) -> &'static str {
    if field == mappings::FIELD_RIVER_LEVEL {
        "name;datetime;baseline;distance;zero"
    } else {
        "name;datetime;value"
    }
}

/// Renders one station's rows into a complete CSV body, header included.
pub fn render_csv(station_name: &str, field: &str, rows: &[ObservationRow]) -> String {
    let mut body = String::from(header_for(field));
    body.push('\n');

    for row in rows {
        body.push_str(station_name);
        body.push(FIELD_SEPARATOR);
        body.push_str(&format_timestamp(row.time));

        if field == mappings::FIELD_RIVER_LEVEL {
            for value in [row.baseline, row.distance, row.zero] {
                body.push(FIELD_SEPARATOR);
                body.push_str(&format_value(value));
            }
        } else {
            body.push(FIELD_SEPARATOR);
            body.push_str(&format_value(row.value));
        }
        body.push('\n');
    }

    body
}

/// Export file name: `{station}-{from}-{to}-{field}.csv`.
pub fn export_file_name(station_name: &str, from: NaiveDate, to: NaiveDate, field: &str) -> String {
    format!("{}-{}-{}-{}.csv", station_name, from, to, field)
}

// ---------------------------------------------------------------------------
// Export driver
// ---------------------------------------------------------------------------

/// Writes one delimited file per station reporting `field`, covering the
/// half-open `[from, to)` range. Stations with no rows in the range are
/// skipped rather than producing empty files.
pub fn export_mode(
    store: &mut TimeSeriesStore,
    field: &str,
    from: NaiveDate,
    to: NaiveDate,
    directory: &Path,
) -> Result<ExportSummary, Box<dyn Error>> {
    fs::create_dir_all(directory)?;

    let query_mode = mappings::query_for(field).mode;
    let features = store.get_features(field)?;

    let mut summary = ExportSummary::default();

    for feature in &features {
        let rows = store.get_observations(feature.id, &query_mode, from, to)?;
        if rows.is_empty() {
            summary.stations_skipped += 1;
            continue;
        }

        let body = render_csv(&feature.name, field, &rows);
        let path = directory.join(export_file_name(&feature.name, from, to, field));
        fs::write(&path, body)?;
        summary.files_written += 1;
    }

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
