//! Hydrological Telemetry Sync - Main Binary
//!
//! Runs one synchronization pass over a date range:
//! 1. Fetches the station catalog and persists it
//! 2. Partitions the range into fixed-width windows
//! 3. Dispatches one worker-pool job per window
//! 4. Upserts every observation into PostgreSQL
//! 5. Prints a per-run report (failed tuples never abort the run)
//!
//! Usage:
//!   cargo run --release -- --from 2019-01-01 --to 2020-02-19
//!   cargo run --release -- --from 2020-01-01 --to 2020-01-31 --window-days 1 --workers 16
//!   cargo run --release -- --from 2020-01-01 --to 2020-01-31 --mode river_level
//!
//! Environment:
//!   DATABASE_URL - PostgreSQL connection string
//!
//! Configuration:
//!   sync.toml - remote base URL, window width, worker count, mode allow-list
//!   (command-line flags override the file)

use chrono::NaiveDate;
use hydrosync_service::config::SyncConfig;
use hydrosync_service::logging::{self, LogLevel};
use hydrosync_service::sync::SyncOrchestrator;
use std::env;

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
    println!("🌊 Hydrological Telemetry Sync");
    println!("==============================\n");

    logging::init_logger(LogLevel::Info, None, false);

    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let mut from: Option<NaiveDate> = None;
    let mut to: Option<NaiveDate> = None;
    let mut config = SyncConfig::load_or_default();

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
            "--from" => from = Some(parse_date(flag, value)),
            "--to" => to = Some(parse_date(flag, value)),
            "--window-days" => match value.parse() {
                Ok(days) => config.sync.window_days = days,
                Err(_) => {
                    eprintln!("Error: --window-days expects a number, got '{}'", value);
                    std::process::exit(1);
                }
            },
            "--workers" => match value.parse() {
                Ok(workers) => config.sync.workers = workers,
                Err(_) => {
                    eprintln!("Error: --workers expects a number, got '{}'", value);
                    std::process::exit(1);
                }
            },
            "--mode" => config.sync.modes.push(value.to_string()),
            _ => {
                eprintln!("Unknown argument: {}", flag);
                eprintln!(
                    "Usage: {} --from YYYY-MM-DD --to YYYY-MM-DD \
                     [--window-days N] [--workers N] [--mode FIELD]...",
                    args[0]
                );
                std::process::exit(1);
            }
        }
        i += 2;
    }

    let (from, to) = match (from, to) {
        (Some(from), Some(to)) => (from, to),
        _ => {
            eprintln!("Error: both --from and --to are required");
            std::process::exit(1);
        }
    };

    if to < from {
        eprintln!("Error: --to must not precede --from");
        std::process::exit(1);
    }

    println!("📡 Remote: {}", config.remote.base_url);
    println!("📅 Range:  {} .. {}", from, to);
    println!(
        "⚙️  Windows of {} day(s), {} workers{}\n",
        config.sync.window_days,
        config.sync.workers,
        if config.sync.modes.is_empty() {
            ", all modes".to_string()
        } else {
            format!(", modes: {}", config.sync.modes.join(", "))
        }
    );

    let orchestrator = match SyncOrchestrator::new(config) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("\n❌ Failed to initialize: {}\n", e);
            std::process::exit(1);
        }
    };

    let report = match orchestrator.run(from, to) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("\n❌ Sync failed: {}\n", e);
            std::process::exit(1);
        }
    };

    println!("\n📊 Sync complete");
    println!("   Windows:        {}", report.windows);
    println!("   Tuples synced:  {}", report.tuples_succeeded);
    println!("   Tuples failed:  {}", report.tuples_failed);
    println!("   Rows written:   {}", report.rows_written);

    if !report.is_clean() {
        println!("\n⚠️  Failed tuples (re-run the same range to fill the gaps):");
        for failure in &report.failures {
            println!(
                "   ✗ {} ({}) mode={} window={}: {}",
                failure.station_name, failure.station_id, failure.mode, failure.window, failure.error
            );
        }
        std::process::exit(2);
    }

    println!("\n✓ All tuples synchronized");
}
