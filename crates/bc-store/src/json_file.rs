//! JSON-file-backed store.

use crate::memory::merge_incremental;
use crate::Result;
use bc_common::{AnalyticsStore, IncrementalProperties, Properties};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    #[serde(default)]
    persistent: Properties,
    #[serde(default)]
    token_updated: bool,
    #[serde(default)]
    update_needed: bool,
}

/// [`AnalyticsStore`] persisted to a JSON file.
///
/// State is loaded once at open and written back after every mutation while
/// the lock is still held, so concurrent mergers cannot interleave their
/// read-modify-write sequences. A missing or corrupt file starts the store
/// empty; a failed write is logged and the in-memory state stays
/// authoritative for the rest of the process.
pub struct JsonFileStore {
    path: PathBuf,
    default_event_properties: Properties,
    default_profile_properties: Properties,
    state: Mutex<PersistedState>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_defaults(path, Properties::new(), Properties::new())
    }

    pub fn open_with_defaults(
        path: impl Into<PathBuf>,
        default_event_properties: Properties,
        default_profile_properties: Properties,
    ) -> Result<Self> {
        let path = path.into();
        let state = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(state) => state,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "store file corrupt, starting empty");
                    PersistedState::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no store file yet, starting empty");
                PersistedState::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            default_event_properties,
            default_profile_properties,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, state: &PersistedState) {
        let json = match serde_json::to_vec_pretty(state) {
            Ok(json) => json,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to serialize store state");
                return;
            }
        };
        if let Err(e) = fs::write(&self.path, json) {
            warn!(path = %self.path.display(), error = %e, "failed to write store file");
        }
    }
}

impl AnalyticsStore for JsonFileStore {
    fn default_event_properties(&self) -> Properties {
        self.default_event_properties.clone()
    }

    fn default_profile_properties(&self) -> Properties {
        self.default_profile_properties.clone()
    }

    fn persistent_properties(&self) -> Properties {
        self.state.lock().persistent.clone()
    }

    fn merge_persistent(&self, properties: &Properties) {
        let mut state = self.state.lock();
        state
            .persistent
            .extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.persist(&state);
    }

    fn merge_one_time_persistent(&self, properties: &Properties) {
        let mut state = self.state.lock();
        for (key, value) in properties {
            state
                .persistent
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        self.persist(&state);
    }

    fn merge_incremental_persistent(&self, properties: &IncrementalProperties) {
        let mut state = self.state.lock();
        merge_incremental(&mut state.persistent, properties);
        self.persist(&state);
    }

    fn remove_persistent(&self, key: &str) {
        let mut state = self.state.lock();
        state.persistent.remove(key);
        self.persist(&state);
    }

    fn is_token_updated(&self) -> bool {
        self.state.lock().token_updated
    }

    fn set_token_updated(&self, value: bool) {
        let mut state = self.state.lock();
        state.token_updated = value;
        self.persist(&state);
    }

    fn is_update_needed(&self) -> bool {
        self.state.lock().update_needed
    }

    fn set_update_needed(&self, value: bool) {
        let mut state = self.state.lock();
        state.update_needed = value;
        self.persist(&state);
    }

    fn clear_all(&self) {
        let mut state = self.state.lock();
        *state = PersistedState::default();
        self.persist(&state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analytics.json");

        {
            let store = JsonFileStore::open(&path).unwrap();
            store.merge_persistent(&Properties::from([("Plan".to_string(), json!("pro"))]));
            store.merge_incremental_persistent(&IncrementalProperties::from([(
                "Sessions".to_string(),
                2.0,
            )]));
            store.set_token_updated(true);
        }

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.persistent_properties()["Plan"], json!("pro"));
        assert_eq!(reopened.persistent_properties()["Sessions"], json!(2.0));
        assert!(reopened.is_token_updated());
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("fresh.json")).unwrap();
        assert!(store.persistent_properties().is_empty());
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analytics.json");
        fs::write(&path, b"not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.persistent_properties().is_empty());
    }

    #[test]
    fn clear_all_truncates_the_file_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analytics.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.merge_persistent(&Properties::from([("Plan".to_string(), json!("pro"))]));
        store.clear_all();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        assert!(reopened.persistent_properties().is_empty());
    }
}
