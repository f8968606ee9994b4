/// Per-run feature catalog snapshot.
///
/// Built once at the start of a synchronization run and handed to the
/// dispatch phase as an explicit, read-only object; there is no ambient
/// module-level cache to go stale between runs. Building it also refreshes
/// the persisted `features` table (full upsert-by-id replace), so the store
/// always reflects the catalog the run actually saw.

use crate::mappings;
use crate::model::{Feature, SyncError};
use crate::remote::client::{find_feature, unix_now, RemoteClient};
use crate::store::TimeSeriesStore;

/// One unit of the sync plan: fetch this station's mode with these fixed
/// extra query parameters, window by window.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncTarget {
    pub station_id: i64,
    pub station_name: String,
    pub mode: String,
    pub extra_params: Vec<(String, String)>,
}

/// Snapshot of the catalog and the targets derived from it.
#[derive(Debug, Clone)]
pub struct FeatureCatalog {
    features: Vec<Feature>,
    targets: Vec<SyncTarget>,
}

impl FeatureCatalog {
    /// Fetches the catalog, persists it, and derives the sync targets.
    ///
    /// An empty `allowed_modes` slice means every advertised mode. Fails
    /// fatally (for the whole run) on `NoFeatures` or a protocol error:
    /// there is nothing useful to do without a catalog.
    pub fn build(
        client: &RemoteClient,
        store: &mut TimeSeriesStore,
        allowed_modes: &[String],
    ) -> Result<Self, SyncError> {
        let features = client.list_features(unix_now())?;
        store.save_features(&features)?;

        let targets = derive_targets(&features, allowed_modes);
        Ok(Self { features, targets })
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn targets(&self) -> &[SyncTarget] {
        &self.targets
    }

    pub fn into_targets(self) -> Vec<SyncTarget> {
        self.targets
    }

    /// Case-insensitive exact name lookup against the snapshot.
    pub fn feature_by_name(&self, name: &str) -> Option<&Feature> {
        find_feature(&self.features, name)
    }
}

/// Derives `(station, mode, extra_params)` targets from the availability
/// maps. A mode with a null or false flag is excluded; a non-empty
/// allow-list restricts which availability fields participate at all.
///
/// Output order is deterministic: catalog order by station, mode name order
/// within a station.
pub fn derive_targets(features: &[Feature], allowed_modes: &[String]) -> Vec<SyncTarget> {
    let mut targets = Vec::new();

    for feature in features {
        let mut fields: Vec<&String> = feature
            .data_availability
            .iter()
            .filter(|(_, flag)| **flag == Some(true))
            .map(|(field, _)| field)
            .collect();
        fields.sort();

        for field in fields {
            if !allowed_modes.is_empty() && !allowed_modes.iter().any(|m| m == field) {
                continue;
            }

            let query = mappings::query_for(field);
            targets.push(SyncTarget {
                station_id: feature.id,
                station_name: feature.name.clone(),
                mode: query.mode,
                extra_params: query.extra_params,
            });
        }
    }

    targets
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
