use std::io::ErrorKind;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use chrono::Utc;
use opportunity_shared::{RegionCollection, sorted_names};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::config::dataset_refresh_interval;
use crate::state::{AppState, DatasetSnapshot, SubzoneList};

pub const EMPTY_SUBZONES_JSON: &[u8] = br#"{"count":0,"subzones":[]}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Loaded { seq: u64, region_count: usize },
    Unchanged,
    Missing,
}

pub async fn run(state: AppState) {
    let mut interval = tokio::time::interval(dataset_refresh_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // First tick fires immediately, so the initial load happens here too.
    loop {
        interval.tick().await;

        match refresh(&state).await {
            Ok(RefreshOutcome::Loaded { seq, region_count }) => {
                info!(
                    seq,
                    region_count,
                    path = %state.geojson_path.display(),
                    "loaded opportunity dataset"
                );
            }
            Ok(RefreshOutcome::Unchanged) => {}
            Ok(RefreshOutcome::Missing) => {}
            Err(e) => {
                warn!(error = %e, path = %state.geojson_path.display(), "failed to read dataset");
            }
        }
    }
}

/// Re-read the dataset file if its modification time changed since the last
/// load. A file that disappeared clears the snapshot so the data route 404s.
pub async fn refresh(state: &AppState) -> std::io::Result<RefreshOutcome> {
    let metadata = match tokio::fs::metadata(&state.geojson_path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            if state.dataset.write().await.take().is_some() {
                warn!(path = %state.geojson_path.display(), "dataset file removed");
            }
            return Ok(RefreshOutcome::Missing);
        }
        Err(e) => return Err(e),
    };

    let modified = metadata.modified().ok();
    if let Some(current) = state.dataset().await
        && modified.is_some()
        && current.modified == modified
    {
        return Ok(RefreshOutcome::Unchanged);
    }

    let raw = tokio::fs::read(&state.geojson_path).await?;
    let seq = state.next_seq();
    let snapshot = build_snapshot(seq, Bytes::from(raw), modified);
    let region_count = snapshot.region_count;
    *state.dataset.write().await = Some(Arc::new(snapshot));

    Ok(RefreshOutcome::Loaded { seq, region_count })
}

/// Serve the raw file as-is; derived payloads fall back to empty when it does
/// not parse.
pub fn build_snapshot(seq: u64, raw: Bytes, modified: Option<SystemTime>) -> DatasetSnapshot {
    let (region_count, subzones) = match summarize(&raw) {
        Ok(summary) => summary,
        Err(e) => {
            warn!(error = %e, "dataset is not a usable FeatureCollection");
            (0, SubzoneList::default())
        }
    };

    let subzones_json = serde_json::to_vec(&subzones)
        .map(Bytes::from)
        .unwrap_or_else(|_| Bytes::from_static(EMPTY_SUBZONES_JSON));

    let digest = blake3::hash(&raw).to_hex();
    let etag = format!("\"dataset-{seq}-{}\"", &digest.as_str()[..16]);

    DatasetSnapshot {
        seq,
        etag,
        geojson: Arc::new(raw),
        subzones_json: Arc::new(subzones_json),
        region_count,
        modified,
        loaded_at: Utc::now(),
    }
}

fn summarize(raw: &[u8]) -> Result<(usize, SubzoneList), String> {
    let text = std::str::from_utf8(raw).map_err(|e| e.to_string())?;
    let collection = RegionCollection::from_geojson_str(text).map_err(|e| e.to_string())?;
    let named = collection.iter().filter(|region| region.name().is_some()).count();
    let subzones = SubzoneList {
        count: named,
        subzones: sorted_names(collection.regions()),
    };
    Ok((collection.len(), subzones))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    pub const SAMPLE_GEOJSON: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"SUBZONE_N": "Tai Seng", "H_score": 0.8},
                "geometry": {"type": "Polygon", "coordinates": [[[103.88,1.33],[103.89,1.33],[103.89,1.34],[103.88,1.33]]]}
            },
            {
                "type": "Feature",
                "properties": {"subzone": "Bishan East", "h_score": "0.4"},
                "geometry": {"type": "Polygon", "coordinates": [[[103.84,1.35],[103.85,1.35],[103.85,1.36],[103.84,1.35]]]}
            },
            {
                "type": "Feature",
                "properties": {"SUBZONE_N": "Bishan East", "H_score": 0.2},
                "geometry": {"type": "Polygon", "coordinates": [[[103.84,1.36],[103.85,1.36],[103.85,1.37],[103.84,1.36]]]}
            },
            {
                "type": "Feature",
                "properties": {"H_score": 0.1},
                "geometry": {"type": "Polygon", "coordinates": [[[103.80,1.30],[103.81,1.30],[103.81,1.31],[103.80,1.30]]]}
            }
        ]
    }"#;

    pub const EMPTY_COLLECTION: &str = r#"{"type": "FeatureCollection", "features": []}"#;

    /// A per-test path under the system temp dir.
    pub fn temp_dataset_path(test_name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "opportunity-server-{}-{test_name}.geojson",
            std::process::id()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{EMPTY_COLLECTION, SAMPLE_GEOJSON, temp_dataset_path};
    use super::*;

    fn state_for(path: std::path::PathBuf) -> AppState {
        AppState::new(path, std::env::temp_dir())
    }

    #[test]
    fn snapshot_lists_unique_sorted_names() {
        let snapshot = build_snapshot(1, Bytes::from_static(SAMPLE_GEOJSON.as_bytes()), None);
        assert_eq!(snapshot.region_count, 4);

        let list: SubzoneList =
            serde_json::from_slice(&snapshot.subzones_json).expect("subzones json");
        assert_eq!(list.count, 3);
        assert_eq!(list.subzones, vec!["Bishan East".to_string(), "Tai Seng".to_string()]);
    }

    #[test]
    fn unparseable_file_is_still_served_with_empty_listing() {
        let snapshot = build_snapshot(3, Bytes::from_static(b"not geojson"), None);
        assert_eq!(snapshot.region_count, 0);
        assert_eq!(&snapshot.geojson[..], b"not geojson");
        assert_eq!(&snapshot.subzones_json[..], EMPTY_SUBZONES_JSON);
    }

    #[test]
    fn etag_tracks_content_not_just_sequence() {
        let a = build_snapshot(1, Bytes::from_static(SAMPLE_GEOJSON.as_bytes()), None);
        let b = build_snapshot(1, Bytes::from_static(EMPTY_COLLECTION.as_bytes()), None);
        let a_again = build_snapshot(1, Bytes::from_static(SAMPLE_GEOJSON.as_bytes()), None);
        assert_ne!(a.etag, b.etag);
        assert_eq!(a.etag, a_again.etag);
        assert!(a.etag.starts_with("\"dataset-1-"));
    }

    #[tokio::test]
    async fn refresh_loads_once_until_the_file_changes() {
        let path = temp_dataset_path("refresh-loads-once");
        tokio::fs::write(&path, SAMPLE_GEOJSON).await.expect("write dataset");
        let state = state_for(path.clone());

        let first = refresh(&state).await.expect("first refresh");
        assert_eq!(first, RefreshOutcome::Loaded { seq: 1, region_count: 4 });

        let second = refresh(&state).await.expect("second refresh");
        assert_eq!(second, RefreshOutcome::Unchanged);
        assert_eq!(state.dataset().await.map(|s| s.seq), Some(1));

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn refresh_clears_snapshot_when_file_disappears() {
        let path = temp_dataset_path("refresh-clears");
        tokio::fs::write(&path, SAMPLE_GEOJSON).await.expect("write dataset");
        let state = state_for(path.clone());
        refresh(&state).await.expect("initial refresh");
        assert!(state.dataset().await.is_some());

        tokio::fs::remove_file(&path).await.expect("remove dataset");
        let outcome = refresh(&state).await.expect("refresh after removal");
        assert_eq!(outcome, RefreshOutcome::Missing);
        assert!(state.dataset().await.is_none());

        // Sequence keeps counting after the snapshot was cleared
        tokio::fs::write(&path, EMPTY_COLLECTION).await.expect("rewrite dataset");
        let outcome = refresh(&state).await.expect("refresh after rewrite");
        assert_eq!(outcome, RefreshOutcome::Loaded { seq: 2, region_count: 0 });

        let _ = tokio::fs::remove_file(&path).await;
    }
}
