/// Synchronization orchestrator.
///
/// One run, four phases:
///   1. Catalog — build the FeatureCatalog snapshot (fatal on failure;
///      without a catalog there is nothing to do).
///   2. Partition — split the requested date range into fixed-width windows.
///   3. Dispatch — one worker-pool task per window; each task walks its
///      feature/mode tuples sequentially, fetching then persisting
///      immediately, and reports back over a channel.
///   4. Completion — join all tasks and aggregate a SyncReport.
///
/// A failed `(station, mode, window)` tuple is caught at the tuple boundary,
/// logged with full identifying context, and never aborts the job or any
/// sibling job: a window with 9 good tuples and 1 bad one still commits
/// the 9. Re-running the same range is the recovery mechanism: the store's
/// upsert key makes it converge.

use crate::catalog::{FeatureCatalog, SyncTarget};
use crate::config::SyncConfig;
use crate::logging::{self, DataSource};
use crate::model::SyncError;
use crate::remote::client::RemoteClient;
use crate::store::TimeSeriesStore;
use crate::windows::{partition, Window};

use chrono::NaiveDate;
use std::sync::mpsc;
use std::sync::Arc;
use threadpool::ThreadPool;

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// One failed `(station, mode, window)` tuple, with enough context for an
/// operator to re-fetch exactly the missing slice.
#[derive(Debug, Clone)]
pub struct TupleFailure {
    pub station_id: i64,
    pub station_name: String,
    pub mode: String,
    pub window: Window,
    pub error: String,
}

/// Result of one window job.
#[derive(Debug)]
pub struct WindowOutcome {
    pub window: Window,
    pub succeeded: usize,
    pub rows_written: usize,
    pub failures: Vec<TupleFailure>,
}

/// Aggregate result of a completed run. Partial failure is an expected,
/// reported outcome, not an abort.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub windows: usize,
    pub tuples_succeeded: usize,
    pub tuples_failed: usize,
    pub rows_written: usize,
    pub failures: Vec<TupleFailure>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.tuples_failed == 0
    }

    fn absorb(&mut self, outcome: WindowOutcome) {
        self.tuples_succeeded += outcome.succeeded;
        self.tuples_failed += outcome.failures.len();
        self.rows_written += outcome.rows_written;
        self.failures.extend(outcome.failures);
    }
}

// ---------------------------------------------------------------------------
// Window job
// ---------------------------------------------------------------------------

/// Walks one window's targets sequentially, invoking `sync_tuple` for each
/// and isolating failures at the tuple boundary. The per-tuple action is a
/// closure so this aggregation logic tests without a network or database.
pub fn run_window_job<F>(window: Window, targets: &[SyncTarget], mut sync_tuple: F) -> WindowOutcome
where
    F: FnMut(&SyncTarget, Window) -> Result<usize, SyncError>,
{
    let mut outcome = WindowOutcome {
        window,
        succeeded: 0,
        rows_written: 0,
        failures: Vec::new(),
    };

    for target in targets {
        match sync_tuple(target, window) {
            Ok(rows) => {
                outcome.succeeded += 1;
                outcome.rows_written += rows;
            }
            Err(e) => outcome.failures.push(TupleFailure {
                station_id: target.station_id,
                station_name: target.station_name.clone(),
                mode: target.mode.clone(),
                window,
                error: e.to_string(),
            }),
        }
    }

    outcome
}

/// Outcome for a window whose worker could not even open its store
/// connection: every tuple in the window counts as failed.
fn window_unavailable(window: Window, targets: &[SyncTarget], error: &SyncError) -> WindowOutcome {
    WindowOutcome {
        window,
        succeeded: 0,
        rows_written: 0,
        failures: targets
            .iter()
            .map(|target| TupleFailure {
                station_id: target.station_id,
                station_name: target.station_name.clone(),
                mode: target.mode.clone(),
                window,
                error: error.to_string(),
            })
            .collect(),
    }
}

/// Fetch one tuple's window from the remote service and persist it
/// immediately. No batching across tuples or windows.
fn fetch_and_store(
    client: &RemoteClient,
    store: &mut TimeSeriesStore,
    target: &SyncTarget,
    window: Window,
) -> Result<usize, SyncError> {
    let data = client.fetch_window(
        target.station_id,
        &target.mode,
        window.date_from,
        window.date_to,
        &target.extra_params,
    )?;
    store.save_observations(target.station_id, &target.mode, &data.series)
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct SyncOrchestrator {
    client: RemoteClient,
    config: SyncConfig,
}

impl SyncOrchestrator {
    pub fn new(config: SyncConfig) -> Result<Self, SyncError> {
        let client = RemoteClient::new(&config.remote.base_url)?;
        Ok(Self { client, config })
    }

    /// Runs one full synchronization over `[from, to]`.
    ///
    /// Fatal errors (catalog fetch failed, catalog empty, no store
    /// connection for the catalog phase) return `Err`; everything after
    /// dispatch begins is isolated per tuple and lands in the report.
    pub fn run(&self, from: NaiveDate, to: NaiveDate) -> Result<SyncReport, SyncError> {
        // Phase 1: catalog snapshot, persisted as a side effect.
        let mut store = TimeSeriesStore::connect()?;
        let catalog = FeatureCatalog::build(&self.client, &mut store, &self.config.sync.modes)?;
        drop(store);

        logging::info(
            DataSource::Sync,
            None,
            &format!(
                "Catalog ready: {} features, {} sync targets",
                catalog.features().len(),
                catalog.targets().len()
            ),
        );

        // Phase 2: partition the date range.
        let windows = partition(from, to, self.config.sync.window_days);
        let targets = Arc::new(catalog.into_targets());

        // Phase 3: dispatch one job per window. Workers share the HTTP
        // client's connection pool and the read-only target snapshot; each
        // opens its own store connection.
        let pool = ThreadPool::new(self.config.sync.workers.max(1));
        let (tx, rx) = mpsc::channel();

        for window in &windows {
            let window = *window;
            let tx = tx.clone();
            let client = self.client.clone();
            let targets = Arc::clone(&targets);

            pool.execute(move || {
                let outcome = match TimeSeriesStore::connect() {
                    Ok(mut store) => run_window_job(window, &targets, |target, w| {
                        fetch_and_store(&client, &mut store, target, w)
                    }),
                    Err(e) => window_unavailable(window, &targets, &e),
                };
                // The receiver only disappears if the orchestrator itself
                // is gone, and then there is nobody left to tell.
                let _ = tx.send(outcome);
            });
        }
        drop(tx);

        // Phase 4: drain outcomes and aggregate.
        let mut report = SyncReport { windows: windows.len(), ..SyncReport::default() };
        for outcome in rx {
            for failure in &outcome.failures {
                logging::log_tuple_failure(
                    failure.station_id,
                    &failure.mode,
                    &failure.window.to_string(),
                    &failure.error,
                );
            }
            report.absorb(outcome);
        }
        pool.join();

        logging::log_sync_summary(
            report.windows,
            report.tuples_succeeded,
            report.tuples_failed,
            report.rows_written,
        );

        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn target(station_id: i64, mode: &str) -> SyncTarget {
        SyncTarget {
            station_id,
            station_name: format!("АГК-{:04}", station_id),
            mode: mode.to_string(),
            extra_params: Vec::new(),
        }
    }

    fn window(from_day: u32, to_day: u32) -> Window {
        Window {
            date_from: NaiveDate::from_ymd_opt(2020, 1, from_day).unwrap(),
            date_to: NaiveDate::from_ymd_opt(2020, 1, to_day).unwrap(),
        }
    }

    #[test]
    fn test_window_job_counts_successes_and_rows() {
        let targets = vec![target(1, "distance"), target(2, "discharge")];
        let outcome = run_window_job(window(1, 1), &targets, |_, _| Ok(10));

        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.rows_written, 20);
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn test_one_failing_tuple_does_not_abort_its_siblings() {
        let targets = vec![
            target(1, "distance"),
            target(2, "discharge"),
            target(3, "temperature"),
        ];

        let outcome = run_window_job(window(1, 1), &targets, |t, _| {
            if t.station_id == 2 {
                Err(SyncError::Protocol { endpoint: "mgraph".to_string(), status: 404 })
            } else {
                Ok(5)
            }
        });

        assert_eq!(outcome.succeeded, 2, "the other tuples still commit");
        assert_eq!(outcome.rows_written, 10);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].station_id, 2);
    }

    #[test]
    fn test_failure_records_carry_full_identifying_context() {
        let targets = vec![target(42, "distance")];
        let w = window(1, 5);

        let outcome = run_window_job(w, &targets, |_, _| {
            Err(SyncError::Transport("connection reset".to_string()))
        });

        let failure = &outcome.failures[0];
        assert_eq!(failure.station_id, 42);
        assert_eq!(failure.mode, "distance");
        assert_eq!(failure.window, w);
        assert!(failure.error.contains("connection reset"));
    }

    #[test]
    fn test_sibling_windows_are_independent() {
        // The same failing station must not contaminate another window's
        // outcome: each job aggregates in isolation.
        let targets = vec![target(1, "distance")];

        let bad = run_window_job(window(1, 1), &targets, |_, _| {
            Err(SyncError::Protocol { endpoint: "mgraph".to_string(), status: 500 })
        });
        let good = run_window_job(window(2, 2), &targets, |_, _| Ok(3));

        assert_eq!(bad.failures.len(), 1);
        assert_eq!(good.succeeded, 1);
        assert!(good.failures.is_empty());
    }

    #[test]
    fn test_report_aggregates_across_outcomes() {
        let targets = vec![target(1, "distance"), target(2, "discharge")];

        let mut report = SyncReport { windows: 2, ..SyncReport::default() };
        report.absorb(run_window_job(window(1, 1), &targets, |_, _| Ok(4)));
        report.absorb(run_window_job(window(2, 2), &targets, |t, _| {
            if t.station_id == 1 {
                Ok(4)
            } else {
                Err(SyncError::Transport("timeout".to_string()))
            }
        }));

        assert_eq!(report.tuples_succeeded, 3);
        assert_eq!(report.tuples_failed, 1);
        assert_eq!(report.rows_written, 12);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_window_with_no_targets_yields_empty_outcome() {
        let outcome = run_window_job(window(1, 1), &[], |_, _| Ok(1));
        assert_eq!(outcome.succeeded, 0);
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn test_store_outage_fails_every_tuple_in_the_window() {
        let targets = vec![target(1, "distance"), target(2, "discharge")];
        let outcome = window_unavailable(
            window(1, 1),
            &targets,
            &SyncError::Persistence("connection refused".to_string()),
        );

        assert_eq!(outcome.failures.len(), 2);
        assert!(outcome.failures.iter().all(|f| f.error.contains("connection refused")));
    }
}
