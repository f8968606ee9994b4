/// hydrosync_service: hydrological telemetry synchronization service.
///
/// Mirrors a remote station network's time-series archive into PostgreSQL:
/// fetches the station catalog, walks a date range in fixed-width windows
/// across a worker pool, and upserts every observation so re-runs converge
/// instead of duplicating.
///
/// # Module structure
///
/// ```text
/// hydrosync_service
/// ├── model    — shared data types (Feature, ObservationRow, SyncError, …)
/// ├── config   — service configuration loader (sync.toml)
/// ├── logging  — structured logging to stdout/stderr
/// ├── retry    — bounded exponential-backoff retry policies
/// ├── db       — PostgreSQL connection + schema validation
/// ├── mappings — availability field ↔ query mode ↔ column translation
/// ├── remote
/// │   ├── client   — telemetry API: URL construction + JSON parsing
/// │   └── fixtures (test only) — representative API response payloads
/// ├── catalog  — per-run feature catalog snapshot and sync-target derivation
/// ├── windows  — date-range partitioning into inclusive windows
/// ├── store    — idempotent time-series persistence (upsert by key)
/// ├── sync     — windowed concurrent orchestrator with per-tuple isolation
/// └── export   — delimited flat-file export for offline analysis
/// ```

/// Public modules
pub mod catalog;
pub mod config;
pub mod db;
pub mod export;
pub mod logging;
pub mod mappings;
pub mod model;
pub mod remote;
pub mod retry;
pub mod store;
pub mod sync;
pub mod windows;
