//! The persistent-store contract.

use crate::{IncrementalProperties, Properties};

/// Persistent storage for analytics-layer state: persistent properties,
/// default property sets, and the two launch flags.
///
/// Getters return owned snapshots; the backing state may change between
/// calls. Each mutator is an atomic read-modify-write with respect to the
/// other mutators: the merge semantics (overwrite, keep-existing, numeric
/// increment) live inside the store, and implementations must serialize them
/// internally because the router does not.
pub trait AnalyticsStore: Send + Sync {
    /// Properties attached to every event by sinks configured to add them.
    fn default_event_properties(&self) -> Properties;

    /// Properties merged into login/update payloads by sinks configured to
    /// add them.
    fn default_profile_properties(&self) -> Properties;

    /// Current persistent-property snapshot.
    fn persistent_properties(&self) -> Properties;

    /// Overwrite-merges `properties` into the persistent state.
    fn merge_persistent(&self, properties: &Properties);

    /// Merges `properties` into the persistent state, keeping existing
    /// entries: a key already present in the store is left untouched.
    fn merge_one_time_persistent(&self, properties: &Properties);

    /// Adds each delta to the stored numeric value under the same key. An
    /// absent key, or one holding a non-numeric value, starts at `0.0`.
    fn merge_incremental_persistent(&self, properties: &IncrementalProperties);

    /// Removes one key from the persistent state.
    fn remove_persistent(&self, key: &str);

    fn is_token_updated(&self) -> bool;

    fn set_token_updated(&self, value: bool);

    /// Whether the application should push a user update on next launch.
    fn is_update_needed(&self) -> bool;

    fn set_update_needed(&self, value: bool);

    /// Clears every persistent property and flag.
    fn clear_all(&self);
}
