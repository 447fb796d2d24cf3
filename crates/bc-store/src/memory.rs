//! In-memory store.

use bc_common::{AnalyticsStore, IncrementalProperties, Properties};
use parking_lot::RwLock;
use serde_json::Value;

#[derive(Debug, Default)]
struct State {
    persistent: Properties,
    token_updated: bool,
    update_needed: bool,
}

/// In-process [`AnalyticsStore`]. Default property maps are fixed at
/// construction; persistent state and flags live behind one lock so each
/// merge is atomic with respect to the others.
#[derive(Debug, Default)]
pub struct MemoryStore {
    default_event_properties: Properties,
    default_profile_properties: Properties,
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(
        default_event_properties: Properties,
        default_profile_properties: Properties,
    ) -> Self {
        Self {
            default_event_properties,
            default_profile_properties,
            state: RwLock::new(State::default()),
        }
    }
}

/// Shared merge semantics for the memory and file stores.
pub(crate) fn merge_incremental(target: &mut Properties, deltas: &IncrementalProperties) {
    for (key, delta) in deltas {
        let current = target.get(key).and_then(Value::as_f64).unwrap_or(0.0);
        let updated = current + delta;
        target.insert(
            key.clone(),
            serde_json::Number::from_f64(updated)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        );
    }
}

impl AnalyticsStore for MemoryStore {
    fn default_event_properties(&self) -> Properties {
        self.default_event_properties.clone()
    }

    fn default_profile_properties(&self) -> Properties {
        self.default_profile_properties.clone()
    }

    fn persistent_properties(&self) -> Properties {
        self.state.read().persistent.clone()
    }

    fn merge_persistent(&self, properties: &Properties) {
        let mut state = self.state.write();
        state
            .persistent
            .extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    fn merge_one_time_persistent(&self, properties: &Properties) {
        let mut state = self.state.write();
        for (key, value) in properties {
            state
                .persistent
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    fn merge_incremental_persistent(&self, properties: &IncrementalProperties) {
        let mut state = self.state.write();
        merge_incremental(&mut state.persistent, properties);
    }

    fn remove_persistent(&self, key: &str) {
        self.state.write().persistent.remove(key);
    }

    fn is_token_updated(&self) -> bool {
        self.state.read().token_updated
    }

    fn set_token_updated(&self, value: bool) {
        self.state.write().token_updated = value;
    }

    fn is_update_needed(&self) -> bool {
        self.state.read().update_needed
    }

    fn set_update_needed(&self, value: bool) {
        self.state.write().update_needed = value;
    }

    fn clear_all(&self) {
        let mut state = self.state.write();
        *state = State::default();
    }
}
