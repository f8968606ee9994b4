//! Delimited export binary.
//!
//! Reads synchronized observations back out of PostgreSQL and writes one
//! delimited file per station for a given availability field and date range.
//! The files use `;` as the field separator and `,` as the decimal mark for
//! downstream spreadsheet tooling.
//!
//! Usage:
//!   cargo run --release --bin export_csv -- --field river_level --from 2019-01-01 --to 2020-02-19
//!   cargo run --release --bin export_csv -- --field discharge --from 2020-01-01 --to 2020-01-31 --out ./export
//!
//! Environment:
//!   DATABASE_URL - PostgreSQL connection string

use chrono::NaiveDate;
use hydrosync_service::config::SyncConfig;
use hydrosync_service::export;
use hydrosync_service::logging::{self, LogLevel};
use hydrosync_service::store::TimeSeriesStore;
use std::env;
use std::path::PathBuf;

fn parse_date(flag: &str, value: &str) -> NaiveDate {
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => date,
        Err(_) => {
            eprintln!("Error: {} expects a YYYY-MM-DD date, got '{}'", flag, value);
            std::process::exit(1);
        }
    }
}

fn main() {
    println!("📤 Telemetry Export");
    println!("===================\n");

    logging::init_logger(LogLevel::Info, None, false);

    let config = SyncConfig::load_or_default();

    let args: Vec<String> = env::args().collect();
    let mut field: Option<String> = None;
    let mut from: Option<NaiveDate> = None;
    let mut to: Option<NaiveDate> = None;
    let mut directory = PathBuf::from(&config.export.directory);

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = match args.get(i + 1) {
            Some(v) => v.as_str(),
            None => {
                eprintln!("Error: {} requires a value", flag);
                std::process::exit(1);
            }
        };

        match flag {
            "--field" => field = Some(value.to_string()),
            "--from" => from = Some(parse_date(flag, value)),
            "--to" => to = Some(parse_date(flag, value)),
            "--out" => directory = PathBuf::from(value),
            _ => {
                eprintln!("Unknown argument: {}", flag);
                eprintln!(
                    "Usage: {} --field FIELD --from YYYY-MM-DD --to YYYY-MM-DD [--out DIR]",
                    args[0]
                );
                std::process::exit(1);
            }
        }
        i += 2;
    }

    let (field, from, to) = match (field, from, to) {
        (Some(field), Some(from), Some(to)) => (field, from, to),
        _ => {
            eprintln!("Error: --field, --from and --to are all required");
            std::process::exit(1);
        }
    };

    let mut store = match TimeSeriesStore::connect() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("\n❌ Failed to connect to database: {}\n", e);
            std::process::exit(1);
        }
    };

    println!("📅 Range: {} .. {} (half-open)", from, to);
    println!("📁 Output: {}\n", directory.display());

    match export::export_mode(&mut store, &field, from, to, &directory) {
        Ok(summary) => {
            println!("✓ Wrote {} file(s)", summary.files_written);
            if summary.stations_skipped > 0 {
                println!("  Skipped {} station(s) with no data in range", summary.stations_skipped);
            }
        }
        Err(e) => {
            eprintln!("\n❌ Export failed: {}\n", e);
            std::process::exit(1);
        }
    }
}
