/// Service configuration loader - parses sync.toml
///
/// Separates operational tuning from code, so window width, worker count,
/// or the remote base URL can change without recompiling the service.
/// The database connection string stays in DATABASE_URL (see db.rs).

use serde::Deserialize;
use std::fs;
use std::path::Path;

const CONFIG_PATH: &str = "sync.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub sync: SyncSection,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the telemetry service, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncSection {
    /// Window width in days. Bounds per-request payload size; production
    /// has run both single-day and 50-day widths.
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// Worker pool size; one task per window in flight at a time.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Availability fields to synchronize. Empty means every mode a
    /// station advertises.
    #[serde(default)]
    pub modes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Directory the export binary writes delimited files into.
    #[serde(default = "default_export_directory")]
    pub directory: String,
}

fn default_base_url() -> String {
    "http://emercit.com/map".to_string()
}

fn default_window_days() -> u32 {
    50
}

fn default_workers() -> usize {
    8
}

fn default_export_directory() -> String {
    "export".to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self { base_url: default_base_url() }
    }
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            workers: default_workers(),
            modes: Vec::new(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { directory: default_export_directory() }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            sync: SyncSection::default(),
            export: ExportConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Loads `sync.toml` from the working directory. A missing file falls
    /// back to defaults (every knob has a sane one).
    ///
    /// # Panics
    /// Panics if the file exists but is malformed. This is intentional:
    /// silently ignoring a typo'd config and syncing with the wrong window
    /// width is worse than refusing to start.
    pub fn load_or_default() -> Self {
        Self::load_from(CONFIG_PATH)
    }

    fn load_from(path: &str) -> Self {
        if !Path::new(path).exists() {
            return Self::default();
        }

        let contents = fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e));

        toml::from_str(&contents).unwrap_or_else(|e| panic!("Failed to parse {}: {}", path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = SyncConfig::default();
        assert_eq!(config.sync.window_days, 50);
        assert!(config.sync.workers >= 1);
        assert!(config.sync.modes.is_empty(), "default syncs every advertised mode");
        assert!(!config.remote.base_url.ends_with('/'));
    }

    #[test]
    fn test_parse_full_config() {
        let config: SyncConfig = toml::from_str(
            r#"
            [remote]
            base_url = "http://telemetry.example.org/map"

            [sync]
            window_days = 1
            workers = 16
            modes = ["river_level", "precipitation"]

            [export]
            directory = "out"
            "#,
        )
        .expect("valid config parses");

        assert_eq!(config.remote.base_url, "http://telemetry.example.org/map");
        assert_eq!(config.sync.window_days, 1);
        assert_eq!(config.sync.workers, 16);
        assert_eq!(config.sync.modes.len(), 2);
        assert_eq!(config.export.directory, "out");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: SyncConfig = toml::from_str(
            r#"
            [sync]
            window_days = 7
            "#,
        )
        .expect("partial config parses");

        assert_eq!(config.sync.window_days, 7);
        assert_eq!(config.sync.workers, 8, "unset workers falls back to default");
        assert_eq!(config.remote.base_url, "http://emercit.com/map");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = SyncConfig::load_from("no-such-config-file.toml");
        assert_eq!(config.sync.window_days, SyncConfig::default().sync.window_days);
    }
}
